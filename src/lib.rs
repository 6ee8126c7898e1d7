// 8-bit integer GEMM kernels: quantize, relayout, shifted multiply, fused post-processing
pub mod arch;
pub mod buffer;
pub mod callbacks;
pub mod check;
pub mod engine;
pub mod error;
pub mod layout;
pub mod quantize;
pub mod reference;
pub mod shift;

// Re-exports for the common call path
pub use arch::{Arch, DefaultArch, F32Batch, Generic, I32Batch, TILE_COLS};
pub use buffer::AlignedBuffer;
pub use callbacks::{unquant_mult, Callback, SplitRows, UnquantizeAndAddBiasAndWrite, UnquantizeAndWrite};
pub use engine::{AnyEngine, EngineConfig, EngineKind, ExecutionEngine, Sequential};
pub use error::{Error, Result};
pub use shift::bias_unquant_mult;
