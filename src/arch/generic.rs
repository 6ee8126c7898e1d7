// Portable 128-bit arch built from lane arrays, bit-exact with the x86 kernels.

use super::{madd_pair_sat, quantize_scalar, Arch, I32Batch, TILE_COLS};

#[derive(Clone, Copy, Debug, Default)]
pub struct Generic;

const BYTES: usize = 16;

impl Arch for Generic {
    const NAME: &'static str = "generic";
    const BYTES: usize = BYTES;

    type I8 = [i8; 16];
    type I16 = [i16; 8];
    type I32 = [i32; 4];
    type F32 = [f32; 4];
    type Tile = (I32Batch<Generic>, I32Batch<Generic>);

    #[inline]
    fn load_i8(src: &[i8]) -> [i8; 16] {
        let mut v = [0i8; 16];
        v.copy_from_slice(&src[..BYTES]);
        v
    }

    #[inline]
    fn store_i8(v: [i8; 16], dst: &mut [i8]) { dst[..BYTES].copy_from_slice(&v); }

    #[inline]
    fn load_u8(src: &[u8]) -> [i8; 16] {
        let mut v = [0i8; 16];
        for (d, &s) in v.iter_mut().zip(&src[..BYTES]) { *d = s as i8; }
        v
    }

    #[inline]
    fn store_u8(v: [i8; 16], dst: &mut [u8]) {
        for (d, s) in dst[..BYTES].iter_mut().zip(v) { *d = s as u8; }
    }

    #[inline]
    fn load_i16(src: &[i16]) -> [i16; 8] {
        let mut v = [0i16; 8];
        v.copy_from_slice(&src[..8]);
        v
    }

    #[inline]
    fn store_i16(v: [i16; 8], dst: &mut [i16]) { dst[..8].copy_from_slice(&v); }

    #[inline]
    fn load_f32(src: &[f32]) -> [f32; 4] {
        let mut v = [0f32; 4];
        v.copy_from_slice(&src[..4]);
        v
    }

    #[inline]
    fn store_f32(v: [f32; 4], dst: &mut [f32]) { dst[..4].copy_from_slice(&v); }

    #[inline]
    fn store_i32(v: [i32; 4], dst: &mut [i32]) { dst[..4].copy_from_slice(&v); }

    #[inline]
    fn splat_u8(x: u8) -> [i8; 16] { [x as i8; 16] }

    #[inline]
    fn i8_as_i16(v: [i8; 16]) -> [i16; 8] {
        let mut out = [0i16; 8];
        for (i, o) in out.iter_mut().enumerate() {
            *o = i16::from_le_bytes([v[2 * i] as u8, v[2 * i + 1] as u8]);
        }
        out
    }

    #[inline]
    fn i16_as_i8(v: [i16; 8]) -> [i8; 16] {
        let mut out = [0i8; 16];
        for (i, x) in v.iter().enumerate() {
            let [lo, hi] = x.to_le_bytes();
            out[2 * i] = lo as i8;
            out[2 * i + 1] = hi as i8;
        }
        out
    }

    #[inline]
    fn quantize(src: &[f32], quant_mult: f32) -> [i8; 16] {
        let mut v = [0i8; 16];
        for (d, &x) in v.iter_mut().zip(&src[..BYTES]) { *d = quantize_scalar(x, quant_mult); }
        v
    }

    #[inline]
    fn shift_unsigned(v: [i8; 16]) -> [i8; 16] { v.map(|x| x.wrapping_add(127)) }

    fn transpose16_in_lane(regs: &mut [[i16; 8]; 8]) {
        let src = *regs;
        for (i, row) in regs.iter_mut().enumerate() {
            for (j, lane) in row.iter_mut().enumerate() {
                *lane = src[j][i];
            }
        }
    }

    #[inline]
    fn zero_i32() -> [i32; 4] { [0; 4] }

    #[inline]
    fn dot_u8i8(acc: [i32; 4], a: [i8; 16], b: [i8; 16]) -> [i32; 4] {
        let mut out = acc;
        for (j, o) in out.iter_mut().enumerate() {
            let k = 4 * j;
            let lo = madd_pair_sat(a[k] as u8, b[k], a[k + 1] as u8, b[k + 1]);
            let hi = madd_pair_sat(a[k + 2] as u8, b[k + 2], a[k + 3] as u8, b[k + 3]);
            *o = o.wrapping_add(lo + hi);
        }
        out
    }

    #[inline]
    fn reduce_tile(acc: &[[i32; 4]; TILE_COLS]) -> Self::Tile {
        let sum = |v: &[i32; 4]| v.iter().fold(0i32, |s, &x| s.wrapping_add(x));
        let lo = [sum(&acc[0]), sum(&acc[1]), sum(&acc[2]), sum(&acc[3])];
        let hi = [sum(&acc[4]), sum(&acc[5]), sum(&acc[6]), sum(&acc[7])];
        (I32Batch(lo), I32Batch(hi))
    }

    #[inline]
    fn i32_to_f32(v: [i32; 4]) -> [f32; 4] { v.map(|x| x as f32) }

    #[inline]
    fn mul_f32(v: [f32; 4], scale: f32) -> [f32; 4] { v.map(|x| x * scale) }

    #[inline]
    fn add_f32(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
    }
}
