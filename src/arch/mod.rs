// Instruction-set parameter shared by every kernel.

pub mod generic;
#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub mod avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;

pub use generic::Generic;
#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub use avx2::Avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub use neon::Neon;

/// Output columns covered by one multiply tile (the kernel's unroll factor).
pub const TILE_COLS: usize = 8;

/// Widest register any arch uses, in bytes. Sizes the stack staging used by the relayout.
pub const MAX_REGISTER_BYTES: usize = 64;

/// Best instruction set compiled into this build.
#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub type DefaultArch = Avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub type DefaultArch = Neon;
#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2"),
    all(target_arch = "aarch64", target_feature = "neon")
)))]
pub type DefaultArch = Generic;

/// Instruction-set capability consumed by the quantizer, the relayout and the multiply kernel.
///
/// All slice arguments must hold at least one register worth of elements; shorter slices panic.
/// Lane order follows memory order (lane 0 is the lowest address).
pub trait Arch: Copy + Default + Send + Sync + 'static {
    const NAME: &'static str;
    /// Register width in bytes. Also the row granularity of prepared B.
    const BYTES: usize;
    /// Lanes of a 32-bit register.
    const I32_LANES: usize = Self::BYTES / 4;

    type I8: Copy;
    type I16: Copy;
    type I32: Copy + Send;
    type F32: Copy + Send;
    /// 32-bit sums of one [`TILE_COLS`]-wide output tile: a single batch on 256-bit registers,
    /// a batch pair (`col..col+4`, `col+4..col+8`) on 128-bit registers.
    type Tile: Copy + Send;

    fn load_i8(src: &[i8]) -> Self::I8;
    fn store_i8(v: Self::I8, dst: &mut [i8]);
    fn load_u8(src: &[u8]) -> Self::I8;
    fn store_u8(v: Self::I8, dst: &mut [u8]);
    fn load_i16(src: &[i16]) -> Self::I16;
    fn store_i16(v: Self::I16, dst: &mut [i16]);
    fn load_f32(src: &[f32]) -> Self::F32;
    fn store_f32(v: Self::F32, dst: &mut [f32]);
    fn store_i32(v: Self::I32, dst: &mut [i32]);

    fn splat_u8(x: u8) -> Self::I8;
    fn i8_as_i16(v: Self::I8) -> Self::I16;
    fn i16_as_i8(v: Self::I16) -> Self::I8;

    /// Quantizes `BYTES` floats: `clamp(round_half_even(x * quant_mult), -127, 127)`.
    fn quantize(src: &[f32], quant_mult: f32) -> Self::I8;
    /// Adds 127 to every signed code, yielding the unsigned (shifted) encoding.
    fn shift_unsigned(v: Self::I8) -> Self::I8;

    /// 8x8 transpose of 16-bit lanes, independently inside every 128-bit lane.
    fn transpose16_in_lane(regs: &mut [Self::I16; 8]);

    fn zero_i32() -> Self::I32;
    /// `acc += a (unsigned) . b (signed)`: adjacent products are summed in pairs saturating to
    /// i16, then widened into the 32-bit lanes.
    fn dot_u8i8(acc: Self::I32, a: Self::I8, b: Self::I8) -> Self::I32;
    /// Horizontal sum of each accumulator; column `i` of the tile is the sum of `acc[i]`.
    fn reduce_tile(acc: &[Self::I32; TILE_COLS]) -> Self::Tile;

    fn i32_to_f32(v: Self::I32) -> Self::F32;
    fn mul_f32(v: Self::F32, scale: f32) -> Self::F32;
    fn add_f32(a: Self::F32, b: Self::F32) -> Self::F32;
}

/// Native-width batch of 32-bit integer accumulators.
pub struct I32Batch<A: Arch>(pub A::I32);

/// Native-width batch of floats.
pub struct F32Batch<A: Arch>(pub A::F32);

impl<A: Arch> Clone for I32Batch<A> {
    fn clone(&self) -> Self { *self }
}
impl<A: Arch> Copy for I32Batch<A> {}

impl<A: Arch> Clone for F32Batch<A> {
    fn clone(&self) -> Self { *self }
}
impl<A: Arch> Copy for F32Batch<A> {}

impl<A: Arch> I32Batch<A> {
    #[inline]
    pub fn to_f32(self) -> F32Batch<A> { F32Batch(A::i32_to_f32(self.0)) }

    #[inline]
    pub fn store(self, dst: &mut [i32]) { A::store_i32(self.0, dst) }

    /// Copies the lanes out, mostly useful to tests and reference checks.
    pub fn to_vec(self) -> Vec<i32> {
        let mut out = vec![0i32; A::I32_LANES];
        A::store_i32(self.0, &mut out);
        out
    }
}

impl<A: Arch> F32Batch<A> {
    #[inline]
    pub fn load(src: &[f32]) -> Self { F32Batch(A::load_f32(src)) }

    #[inline]
    pub fn scale(self, s: f32) -> Self { F32Batch(A::mul_f32(self.0, s)) }

    #[inline]
    pub fn add(self, other: Self) -> Self { F32Batch(A::add_f32(self.0, other.0)) }

    #[inline]
    pub fn store(self, dst: &mut [f32]) { A::store_f32(self.0, dst) }

    pub fn to_vec(self) -> Vec<f32> {
        let mut out = vec![0f32; A::I32_LANES];
        A::store_f32(self.0, &mut out);
        out
    }
}

/// Scalar twin of [`Arch::quantize`], used for tails shorter than a register.
#[inline]
pub fn quantize_scalar(x: f32, quant_mult: f32) -> i8 {
    (x * quant_mult).clamp(-127.0, 127.0).round_ties_even() as i8
}

/// Scalar twin of the `maddubs` pair step: `a0*b0 + a1*b1` saturated to i16.
#[inline]
pub(crate) fn madd_pair_sat(a0: u8, b0: i8, a1: u8, b1: i8) -> i32 {
    let s = a0 as i32 * b0 as i32 + a1 as i32 * b1 as i32;
    s.clamp(i16::MIN as i32, i16::MAX as i32)
}
