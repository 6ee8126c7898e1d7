use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use int8gemm::callbacks::UnquantizeAndAddBiasAndWrite;
use int8gemm::engine::{parse_threads, AnyEngine, EngineConfig, EngineKind};
use int8gemm::reference::{self, ErrorStats};
use int8gemm::{bias_unquant_mult, check, layout, shift, unquant_mult, AlignedBuffer, Arch, DefaultArch};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Dist {
    Uniform,
    Normal,
}

#[derive(Parser, Debug)]
#[command(name = "int8gemm", version, about = "Benchmark and verify the shifted 8-bit GEMM kernels")]
struct Args {
    /// Rows of A
    #[arg(long, default_value_t = 8)]
    rows: usize,

    /// Inner dimension (columns of A, rows of B)
    #[arg(long, default_value_t = 256)]
    width: usize,

    /// Columns of B
    #[arg(long, default_value_t = 256)]
    cols: usize,

    /// Execution engine: sequential, std-thread or rayon (falls back to INT8GEMM_ENGINE)
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Worker threads for std-thread/rayon (falls back to INT8GEMM_THREADS)
    #[arg(long, value_parser = parse_threads)]
    threads: Option<usize>,

    /// Timed multiply repetitions
    #[arg(long, default_value_t = 100)]
    reps: usize,

    /// RNG seed for operand generation
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Operand distribution (uniform in [-1, 1] or normal with sd 0.5), clipped to [-alpha, alpha]
    #[arg(long, value_enum, default_value_t = Dist::Uniform)]
    dist: Dist,

    /// Quantization range for both operands
    #[arg(long, default_value_t = 2.0)]
    alpha: f32,

    /// Write a JSON report to this path
    #[arg(long)]
    json: Option<String>,
}

fn fill(rng: &mut SmallRng, dist: Dist, alpha: f32, n: usize) -> Result<Vec<f32>> {
    Ok(match dist {
        Dist::Uniform => (0..n).map(|_| rng.gen_range(-1.0f32..1.0).clamp(-alpha, alpha)).collect(),
        Dist::Normal => {
            let normal = Normal::new(0.0f32, 0.5)?;
            (0..n).map(|_| normal.sample(&mut *rng).clamp(-alpha, alpha)).collect()
        }
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.alpha <= 0.0 {
        bail!("--alpha must be positive, got {}", args.alpha);
    }

    let mut cfg = EngineConfig::from_env().context("reading engine config from the environment")?;
    if let Some(kind) = args.engine { cfg.kind = kind; }
    if args.threads.is_some() { cfg.threads = args.threads; }
    let engine = AnyEngine::from_config(&cfg).context("building execution engine")?;

    let (rows, width, cols) = (args.rows, args.width, args.cols);
    check::check_multiply::<DefaultArch>(rows * width, width * cols, rows * cols, rows, width, cols)
        .context("unsupported problem shape")?;
    info!("arch={} engine={} threads={} shape={}x{}x{}", DefaultArch::NAME, engine.kind(), engine.threads(), rows, width, cols);

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let a = fill(&mut rng, args.dist, args.alpha, rows * width)?;
    let b = fill(&mut rng, args.dist, args.alpha, width * cols)?;
    let bias_in: Vec<f32> = (0..cols).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

    let quant_mult = 127.0 / args.alpha;
    let b_peak = b.iter().fold(0f32, |m, x| m.max(x.abs())) * quant_mult;
    if b_peak > 64.5 {
        warn!("B codes reach {:.0}; u8 x i8 pair sums may saturate (keep |B| * 127 / alpha <= 64)", b_peak);
    }
    let t_prep = Instant::now();
    let mut prepared_b = AlignedBuffer::<i8>::zeroed(width * cols);
    layout::prepare_b::<DefaultArch>(&b, &mut prepared_b, quant_mult, width, cols);
    let mut bias = AlignedBuffer::from_slice(&bias_in);
    shift::prepare_bias::<DefaultArch, _>(
        &prepared_b,
        width,
        cols,
        UnquantizeAndAddBiasAndWrite::in_place(bias_unquant_mult(quant_mult, quant_mult), &mut bias),
    );
    let mut prepared_a = AlignedBuffer::<u8>::zeroed(rows * width);
    shift::prepare_a::<DefaultArch>(&a, &mut prepared_a, quant_mult, rows, width);
    let prep_s = t_prep.elapsed().as_secs_f64();
    info!("prepared operands in {:.3} ms", prep_s * 1e3);

    let mut out = AlignedBuffer::<f32>::zeroed(rows * cols);
    let scale = unquant_mult(quant_mult, quant_mult);
    let pb = ProgressBar::new(args.reps as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} reps")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let t_mul = Instant::now();
    for _ in 0..args.reps.max(1) {
        shift::multiply::<DefaultArch, _, _>(
            &prepared_a,
            &prepared_b,
            rows,
            width,
            cols,
            UnquantizeAndAddBiasAndWrite::new(scale, &bias, &mut out),
            &engine,
        );
        pb.inc(1);
    }
    pb.finish_and_clear();
    let mul_s = t_mul.elapsed().as_secs_f64() / args.reps.max(1) as f64;
    let gops = if mul_s > 0.0 { 2.0 * (rows * width * cols) as f64 / mul_s / 1e9 } else { 0.0 };

    let mut expected = reference::multiply_f32(&a, &b, rows, width, cols);
    for (i, e) in expected.iter_mut().enumerate() {
        *e += bias_in[i % cols];
    }
    let stats = ErrorStats::compare(&expected, &out);

    println!(
        "arch={} engine={} threads={} shape={}x{}x{} multiply={:.3}ms gops={:.2} max_abs={:.4} rmse={:.4}",
        DefaultArch::NAME,
        engine.kind(),
        engine.threads(),
        rows,
        width,
        cols,
        mul_s * 1e3,
        gops,
        stats.max_abs,
        stats.rmse
    );

    if let Some(path) = args.json.as_deref() {
        let payload = serde_json::json!({
            "arch": DefaultArch::NAME,
            "engine": cfg,
            "threads": engine.threads(),
            "shape": {"rows": rows, "width": width, "cols": cols},
            "seed": args.seed,
            "alpha": args.alpha,
            "reps": args.reps,
            "prepare_ms": prep_s * 1e3,
            "multiply_ms": mul_s * 1e3,
            "gops": gops,
            "error": stats,
        });
        std::fs::write(path, serde_json::to_string_pretty(&payload)?).with_context(|| format!("writing report to {}", path))?;
        info!("wrote report to {}", path);
    }
    Ok(())
}
