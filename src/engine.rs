// Execution engines driving the multiply kernel's outer loop.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub trait ExecutionEngine {
    fn run<F>(&self, start: usize, end: usize, stride: usize, body: F)
    where
        F: Fn(usize) + Sync + Send;
}

/// Increasing order on the caller's thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl ExecutionEngine for Sequential {
    fn run<F>(&self, start: usize, end: usize, stride: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        for i in (start..end).step_by(stride) {
            body(i);
        }
    }
}

/// Contiguous chunks over scoped threads spawned for the call and joined before it returns.
/// `pool_size - 1` workers take equal chunks; the calling thread runs whatever remains.
#[cfg(feature = "std-thread")]
#[derive(Clone, Copy, Debug)]
pub struct StdThread {
    pub pool_size: usize,
}

#[cfg(feature = "std-thread")]
impl StdThread {
    pub fn new(pool_size: usize) -> Self { Self { pool_size: pool_size.max(1) } }

    /// One thread per available core.
    pub fn available() -> Self {
        Self::new(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

#[cfg(feature = "std-thread")]
impl Default for StdThread {
    fn default() -> Self { Self::available() }
}

#[cfg(feature = "std-thread")]
impl ExecutionEngine for StdThread {
    fn run<F>(&self, start: usize, end: usize, stride: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        let nb_iter = end.saturating_sub(start) / stride;
        if nb_iter == 0 {
            // Fewer elements than one stride: only `start` itself, if any.
            if start < end { body(start); }
            return;
        }
        let nb_thread = nb_iter.min(self.pool_size.max(1));
        let chunk = (nb_iter / nb_thread) * stride;
        let body = &body;
        std::thread::scope(|s| {
            let mut next = start;
            for _ in 1..nb_thread {
                let lo = next;
                s.spawn(move || {
                    for i in (lo..lo + chunk).step_by(stride) {
                        body(i);
                    }
                });
                next += chunk;
            }
            for i in (next..end).step_by(stride) {
                body(i);
            }
        });
    }
}

/// Work-sharing parallel-for over rayon, on the global pool or a dedicated one.
#[cfg(feature = "rayon")]
#[derive(Debug, Default)]
pub struct Rayon {
    pool: Option<rayon::ThreadPool>,
}

#[cfg(feature = "rayon")]
impl Rayon {
    pub fn global() -> Self { Self { pool: None } }

    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
    }
}

#[cfg(feature = "rayon")]
impl ExecutionEngine for Rayon {
    fn run<F>(&self, start: usize, end: usize, stride: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        use rayon::prelude::*;
        let n = end.saturating_sub(start).div_ceil(stride);
        let work = || (0..n).into_par_iter().for_each(|k| body(start + k * stride));
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    #[default]
    Sequential,
    StdThread,
    Rayon,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(EngineKind::Sequential),
            "std-thread" | "thread" | "threads" => Ok(EngineKind::StdThread),
            "rayon" | "parallel-for" => Ok(EngineKind::Rayon),
            other => Err(Error::UnknownEngine(other.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Sequential => "sequential",
            EngineKind::StdThread => "std-thread",
            EngineKind::Rayon => "rayon",
        })
    }
}

/// Engine selection. `threads: None` means one per available core (std-thread) or rayon's
/// global pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub threads: Option<usize>,
}

impl EngineConfig {
    pub const ENV_ENGINE: &'static str = "INT8GEMM_ENGINE";
    pub const ENV_THREADS: &'static str = "INT8GEMM_THREADS";

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: EngineConfig = serde_json::from_str(s)?;
        debug!("engine config from json: {:?}", cfg);
        Ok(cfg)
    }

    /// Reads `INT8GEMM_ENGINE` and `INT8GEMM_THREADS`; unset variables keep the defaults.
    pub fn from_env() -> Result<Self> {
        let mut cfg = EngineConfig::default();
        if let Ok(kind) = std::env::var(Self::ENV_ENGINE) {
            cfg.kind = kind.parse()?;
        }
        if let Ok(threads) = std::env::var(Self::ENV_THREADS) {
            cfg.threads = Some(parse_threads(&threads)?);
        }
        debug!("engine config from env: {:?}", cfg);
        Ok(cfg)
    }
}

/// Positive thread count, as accepted by `INT8GEMM_THREADS`.
pub fn parse_threads(s: &str) -> Result<usize> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidThreads(s.to_string())),
    }
}

/// Runtime-selected engine, for drivers that pick the strategy from configuration.
#[derive(Debug)]
pub enum AnyEngine {
    Sequential(Sequential),
    #[cfg(feature = "std-thread")]
    StdThread(StdThread),
    #[cfg(feature = "rayon")]
    Rayon(Rayon),
}

impl Default for AnyEngine {
    fn default() -> Self { AnyEngine::Sequential(Sequential) }
}

impl AnyEngine {
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let engine = match cfg.kind {
            EngineKind::Sequential => AnyEngine::Sequential(Sequential),
            #[cfg(feature = "std-thread")]
            EngineKind::StdThread => AnyEngine::StdThread(cfg.threads.map_or_else(StdThread::available, StdThread::new)),
            #[cfg(feature = "rayon")]
            EngineKind::Rayon => AnyEngine::Rayon(match cfg.threads {
                Some(n) => Rayon::with_threads(n)?,
                None => Rayon::global(),
            }),
            #[allow(unreachable_patterns)]
            other => return Err(Error::UnknownEngine(format!("{} (disabled at build time)", other))),
        };
        debug!("execution engine: {} ({} threads)", engine.kind(), engine.threads());
        Ok(engine)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            AnyEngine::Sequential(_) => EngineKind::Sequential,
            #[cfg(feature = "std-thread")]
            AnyEngine::StdThread(_) => EngineKind::StdThread,
            #[cfg(feature = "rayon")]
            AnyEngine::Rayon(_) => EngineKind::Rayon,
        }
    }

    pub fn threads(&self) -> usize {
        match self {
            AnyEngine::Sequential(_) => 1,
            #[cfg(feature = "std-thread")]
            AnyEngine::StdThread(e) => e.pool_size,
            #[cfg(feature = "rayon")]
            AnyEngine::Rayon(e) => e.threads(),
        }
    }
}

impl ExecutionEngine for AnyEngine {
    fn run<F>(&self, start: usize, end: usize, stride: usize, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            AnyEngine::Sequential(e) => e.run(start, end, stride, body),
            #[cfg(feature = "std-thread")]
            AnyEngine::StdThread(e) => e.run(start, end, stride, body),
            #[cfg(feature = "rayon")]
            AnyEngine::Rayon(e) => e.run(start, end, stride, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn visited<E: ExecutionEngine>(engine: &E, start: usize, end: usize, stride: usize) -> Vec<usize> {
        let seen = Mutex::new(Vec::new());
        engine.run(start, end, stride, |i| seen.lock().unwrap().push(i));
        let mut v = seen.into_inner().unwrap();
        v.sort_unstable();
        v
    }

    #[test]
    fn sequential_is_in_order() {
        let seen = Mutex::new(Vec::new());
        Sequential.run(3, 20, 4, |i| seen.lock().unwrap().push(i));
        assert_eq!(seen.into_inner().unwrap(), vec![3, 7, 11, 15, 19]);
    }

    #[cfg(feature = "std-thread")]
    #[test]
    fn std_thread_covers_range_once() {
        for pool in [1, 2, 3, 7, 64] {
            for (start, end, stride) in [(0, 100, 1), (5, 50, 3), (0, 7, 2), (4, 5, 8), (9, 9, 1)] {
                let want: Vec<usize> = (start..end).step_by(stride).collect();
                assert_eq!(visited(&StdThread::new(pool), start, end, stride), want, "pool {} range {}..{} by {}", pool, start, end, stride);
            }
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn rayon_covers_range_once() {
        let engine = Rayon::with_threads(3).unwrap();
        assert_eq!(engine.threads(), 3);
        let want: Vec<usize> = (5..50).step_by(3).collect();
        assert_eq!(visited(&engine, 5, 50, 3), want);
        assert!(visited(&Rayon::global(), 10, 10, 1).is_empty());
    }

    #[test]
    fn empty_range_is_a_noop() {
        let calls = AtomicUsize::new(0);
        Sequential.run(8, 2, 1, |_| { calls.fetch_add(1, Ordering::Relaxed); });
        #[cfg(feature = "std-thread")]
        StdThread::new(4).run(8, 2, 1, |_| { calls.fetch_add(1, Ordering::Relaxed); });
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("SEQ".parse::<EngineKind>().unwrap(), EngineKind::Sequential);
        assert_eq!("threads".parse::<EngineKind>().unwrap(), EngineKind::StdThread);
        assert_eq!("parallel-for".parse::<EngineKind>().unwrap(), EngineKind::Rayon);
        assert!("openmp".parse::<EngineKind>().is_err());
    }
}
