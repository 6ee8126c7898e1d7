// Relayout of quantized operands into the tiled order the multiply kernel streams.

use crate::arch::{Arch, MAX_REGISTER_BYTES, TILE_COLS};
use crate::quantize::quantize;

/// 8x8 transpose of 16-bit lanes inside each 128-bit lane of eight registers, in place.
#[inline]
pub fn transpose16_in_lane<A: Arch>(regs: &mut [A::I16; 8]) {
    A::transpose16_in_lane(regs)
}

/// Quantizes operand A row-major; the signed direct encoding.
pub fn prepare_a<A: Arch>(input: &[f32], output: &mut [i8], quant_mult: f32, rows: usize, cols: usize) {
    let n = rows * cols;
    quantize::<A>(&input[..n], &mut output[..n], quant_mult);
}

/// Quantizes and relayouts a row-major float B (`rows` = inner dimension). For each group of
/// eight columns and each `A::BYTES`-row block, register `i` holds column `c + i`.
pub fn prepare_b<A: Arch>(input: &[f32], output: &mut [i8], quant_mult: f32, rows: usize, cols: usize) {
    relayout_row_major::<A, f32>(input, output, rows, cols, |stage| A::quantize(stage, quant_mult));
}

/// Relayouts an already quantized row-major B.
pub fn prepare_b_quantized<A: Arch>(input: &[i8], output: &mut [i8], cols: usize, rows: usize) {
    relayout_row_major::<A, i8>(input, output, rows, cols, A::load_i8);
}

/// Quantizes and relayouts Bᵀ: `rows` rows (one per B column) of `cols` (inner dimension) floats.
pub fn prepare_b_transposed<A: Arch>(input: &[f32], output: &mut [i8], quant_mult: f32, cols: usize, rows: usize) {
    relayout_transposed::<A, f32>(input, output, cols, rows, |src| A::quantize(src, quant_mult));
}

/// Relayouts an already quantized Bᵀ.
pub fn prepare_b_quantized_transposed<A: Arch>(input: &[i8], output: &mut [i8], cols: usize, rows: usize) {
    relayout_transposed::<A, i8>(input, output, cols, rows, A::load_i8);
}

/// Copies the listed columns of a prepared B (`rows` = inner dimension) into a new prepared
/// buffer of `rows * cols.len()` bytes. Indices may repeat and come in any order; `cols.len()`
/// must be a multiple of [`TILE_COLS`].
pub fn select_columns_b<A: Arch>(input: &[i8], output: &mut [i8], rows: usize, cols: &[usize]) {
    debug_assert!(rows % A::BYTES == 0);
    debug_assert!(cols.len() % TILE_COLS == 0);
    let w = A::BYTES;
    let group_stride = rows * TILE_COLS;
    let block_stride = TILE_COLS * w;
    let mut out = 0;
    for group in cols.chunks_exact(TILE_COLS) {
        for k in (0..rows).step_by(w) {
            let block = (k / w) * block_stride;
            for &col in group {
                let src = (col / TILE_COLS) * group_stride + block + (col % TILE_COLS) * w;
                A::store_i8(A::load_i8(&input[src..src + w]), &mut output[out..out + w]);
                out += w;
            }
        }
    }
}

/// Transposed input is already column-contiguous along the inner dimension, so every output
/// register is a straight load of `A::BYTES` consecutive elements.
fn relayout_transposed<A, T>(input: &[T], output: &mut [i8], cols: usize, rows: usize, load: impl Fn(&[T]) -> A::I8)
where
    A: Arch,
{
    debug_assert!(cols % A::BYTES == 0);
    debug_assert!(rows % TILE_COLS == 0);
    let w = A::BYTES;
    let mut out = 0;
    for r in (0..rows).step_by(TILE_COLS) {
        for c in (0..cols).step_by(w) {
            for ri in 0..TILE_COLS {
                let src = (r + ri) * cols + c;
                A::store_i8(load(&input[src..src + w]), &mut output[out..out + w]);
                out += w;
            }
        }
    }
}

/// Row-major input needs a real transpose. Each 128-bit half of register `p` is staged as the
/// byte interleave of rows `2p` and `2p + 1` over the 8 columns of the group, so lane `i` of
/// its 16-bit view holds column `i` for that row pair. After [`Arch::transpose16_in_lane`],
/// register `i` holds column `i` for 16 consecutive rows per half.
fn relayout_row_major<A, T>(input: &[T], output: &mut [i8], rows: usize, cols: usize, load: impl Fn(&[T]) -> A::I8)
where
    A: Arch,
    T: Copy + Default,
{
    debug_assert!(rows % A::BYTES == 0);
    debug_assert!(cols % TILE_COLS == 0);
    let w = A::BYTES;
    let mut stage = [T::default(); MAX_REGISTER_BYTES];
    let stage = &mut stage[..w];
    let mut out = 0;
    for c in (0..cols).step_by(TILE_COLS) {
        for r in (0..rows).step_by(w) {
            let mut regs = [A::i8_as_i16(A::splat_u8(0)); 8];
            for (p, reg) in regs.iter_mut().enumerate() {
                for half in 0..w / 16 {
                    let row = r + half * 16 + 2 * p;
                    for i in 0..TILE_COLS {
                        stage[half * 16 + 2 * i] = input[row * cols + c + i];
                        stage[half * 16 + 2 * i + 1] = input[(row + 1) * cols + c + i];
                    }
                }
                *reg = A::i8_as_i16(load(&stage[..]));
            }
            A::transpose16_in_lane(&mut regs);
            for reg in regs {
                A::store_i8(A::i16_as_i8(reg), &mut output[out..out + w]);
                out += w;
            }
        }
    }
}
