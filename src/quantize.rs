// Float to 8-bit conversion with saturation.

use crate::arch::{quantize_scalar, Arch};

/// Quantizes `input` into `output[..input.len()]`:
/// `clamp(round_half_even(x * quant_mult), -127, 127)`.
///
/// Full registers go through [`Arch::quantize`]; the tail shorter than one register falls back to
/// [`quantize_scalar`], which rounds the same way. NaN quantizes to 0 on every path.
pub fn quantize<A: Arch>(input: &[f32], output: &mut [i8], quant_mult: f32) {
    debug_assert!(output.len() >= input.len());
    let n = input.len();
    let body = n - n % A::BYTES;
    let (head, tail) = input.split_at(body);
    let (out_head, out_tail) = output[..n].split_at_mut(body);
    for (src, dst) in head.chunks_exact(A::BYTES).zip(out_head.chunks_exact_mut(A::BYTES)) {
        A::store_i8(A::quantize(src, quant_mult), dst);
    }
    for (&x, d) in tail.iter().zip(out_tail) {
        *d = quantize_scalar(x, quant_mult);
    }
}

/// Same as [`quantize`] with every code shifted by +127 into `[0, 254]`.
pub fn quantize_u<A: Arch>(input: &[f32], output: &mut [u8], quant_mult: f32) {
    debug_assert!(output.len() >= input.len());
    let n = input.len();
    let body = n - n % A::BYTES;
    let (head, tail) = input.split_at(body);
    let (out_head, out_tail) = output[..n].split_at_mut(body);
    for (src, dst) in head.chunks_exact(A::BYTES).zip(out_head.chunks_exact_mut(A::BYTES)) {
        A::store_u8(A::shift_unsigned(A::quantize(src, quant_mult)), dst);
    }
    for (&x, d) in tail.iter().zip(out_tail) {
        *d = (quantize_scalar(x, quant_mult) as i16 + 127) as u8;
    }
}
