use thiserror::Error;

/// Failures at the fallible edges of the crate: call-site shape checks, engine configuration and
/// thread-pool construction. The kernels themselves never return errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} = {value} is not a multiple of {granularity}")]
    NotTileMultiple { what: &'static str, value: usize, granularity: usize },

    #[error("{what} holds {actual} elements, {expected} required")]
    BufferTooSmall { what: &'static str, actual: usize, expected: usize },

    #[error("column index {index} out of range for {cols} columns")]
    ColumnOutOfRange { index: usize, cols: usize },

    #[error("unknown execution engine '{0}' (expected sequential, std-thread or rayon)")]
    UnknownEngine(String),

    #[error("invalid thread count '{0}'")]
    InvalidThreads(String),

    #[cfg(feature = "rayon")]
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
