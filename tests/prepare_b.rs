use int8gemm::layout::{prepare_b, prepare_b_quantized};
use int8gemm::quantize::quantize;
use int8gemm::reference::rearrange_b;
use int8gemm::{Arch, DefaultArch, Generic, TILE_COLS};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    // Somewhat out of the quantized range on purpose.
    (0..rows * cols).map(|_| rng.gen_range(-129.0f32..129.0)).collect()
}

fn matches_rearrangement<A: Arch>(rows: usize, cols: usize) {
    let input = random_matrix(rows, cols, 7);
    let mut prepared = vec![0i8; rows * cols];
    prepare_b::<A>(&input, &mut prepared, 1.0, rows, cols);

    let mut quantized = vec![0i8; rows * cols];
    quantize::<A>(&input, &mut quantized, 1.0);
    let mut expected = vec![0i8; rows * cols];
    rearrange_b(&quantized, &mut expected, A::BYTES, TILE_COLS, rows, cols);
    assert_eq!(prepared, expected, "{} {}x{}", A::NAME, rows, cols);

    let mut from_quantized = vec![0i8; rows * cols];
    prepare_b_quantized::<A>(&quantized, &mut from_quantized, cols, rows);
    assert_eq!(from_quantized, expected);
}

#[test]
fn prepare_b_matches_reference_layout() {
    matches_rearrangement::<DefaultArch>(64, 32);
    matches_rearrangement::<DefaultArch>(256, 64);
    matches_rearrangement::<Generic>(64, 32);
    matches_rearrangement::<Generic>(48, 24);
}

#[test]
fn relayout_is_a_permutation() {
    let (rows, cols) = (128, 16);
    let b: Vec<i8> = (0..rows * cols).map(|i| (i % 255) as i8).collect();
    let mut out = vec![0i8; rows * cols];
    prepare_b_quantized::<DefaultArch>(&b, &mut out, cols, rows);
    let mut histogram_in = [0usize; 256];
    let mut histogram_out = [0usize; 256];
    for (&x, &y) in b.iter().zip(&out) {
        histogram_in[x as u8 as usize] += 1;
        histogram_out[y as u8 as usize] += 1;
    }
    assert_eq!(histogram_in.to_vec(), histogram_out.to_vec());
}
