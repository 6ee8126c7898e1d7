// 128-bit aarch64 arch. Pair sums widen exactly, so they never saturate here.

use std::arch::aarch64::*;

use super::{Arch, I32Batch, TILE_COLS};

#[derive(Clone, Copy, Debug, Default)]
pub struct Neon;

const BYTES: usize = 16;

impl Arch for Neon {
    const NAME: &'static str = "neon";
    const BYTES: usize = BYTES;

    type I8 = int8x16_t;
    type I16 = int16x8_t;
    type I32 = int32x4_t;
    type F32 = float32x4_t;
    type Tile = (I32Batch<Neon>, I32Batch<Neon>);

    #[inline]
    fn load_i8(src: &[i8]) -> int8x16_t {
        let src = &src[..BYTES];
        unsafe { vld1q_s8(src.as_ptr()) }
    }

    #[inline]
    fn store_i8(v: int8x16_t, dst: &mut [i8]) {
        let dst = &mut dst[..BYTES];
        unsafe { vst1q_s8(dst.as_mut_ptr(), v) }
    }

    #[inline]
    fn load_u8(src: &[u8]) -> int8x16_t {
        let src = &src[..BYTES];
        unsafe { vreinterpretq_s8_u8(vld1q_u8(src.as_ptr())) }
    }

    #[inline]
    fn store_u8(v: int8x16_t, dst: &mut [u8]) {
        let dst = &mut dst[..BYTES];
        unsafe { vst1q_u8(dst.as_mut_ptr(), vreinterpretq_u8_s8(v)) }
    }

    #[inline]
    fn load_i16(src: &[i16]) -> int16x8_t {
        let src = &src[..8];
        unsafe { vld1q_s16(src.as_ptr()) }
    }

    #[inline]
    fn store_i16(v: int16x8_t, dst: &mut [i16]) {
        let dst = &mut dst[..8];
        unsafe { vst1q_s16(dst.as_mut_ptr(), v) }
    }

    #[inline]
    fn load_f32(src: &[f32]) -> float32x4_t {
        let src = &src[..4];
        unsafe { vld1q_f32(src.as_ptr()) }
    }

    #[inline]
    fn store_f32(v: float32x4_t, dst: &mut [f32]) {
        let dst = &mut dst[..4];
        unsafe { vst1q_f32(dst.as_mut_ptr(), v) }
    }

    #[inline]
    fn store_i32(v: int32x4_t, dst: &mut [i32]) {
        let dst = &mut dst[..4];
        unsafe { vst1q_s32(dst.as_mut_ptr(), v) }
    }

    #[inline]
    fn splat_u8(x: u8) -> int8x16_t { unsafe { vreinterpretq_s8_u8(vdupq_n_u8(x)) } }

    #[inline]
    fn i8_as_i16(v: int8x16_t) -> int16x8_t { unsafe { vreinterpretq_s16_s8(v) } }

    #[inline]
    fn i16_as_i8(v: int16x8_t) -> int8x16_t { unsafe { vreinterpretq_s8_s16(v) } }

    #[inline]
    fn quantize(src: &[f32], quant_mult: f32) -> int8x16_t {
        let src = &src[..BYTES];
        unsafe {
            let lo = vdupq_n_f32(-127.0);
            let hi = vdupq_n_f32(127.0);
            let tile = |off: usize| {
                let v = vmulq_n_f32(vld1q_f32(src.as_ptr().add(off)), quant_mult);
                vcvtnq_s32_f32(vminq_f32(vmaxq_f32(v, lo), hi))
            };
            let ab = vcombine_s16(vqmovn_s32(tile(0)), vqmovn_s32(tile(4)));
            let cd = vcombine_s16(vqmovn_s32(tile(8)), vqmovn_s32(tile(12)));
            vcombine_s8(vqmovn_s16(ab), vqmovn_s16(cd))
        }
    }

    #[inline]
    fn shift_unsigned(v: int8x16_t) -> int8x16_t { unsafe { vaddq_s8(v, vdupq_n_s8(127)) } }

    #[inline]
    fn transpose16_in_lane(r: &mut [int16x8_t; 8]) {
        unsafe {
            let t0 = vzip1q_s16(r[0], r[1]);
            let t1 = vzip2q_s16(r[0], r[1]);
            let t2 = vzip1q_s16(r[2], r[3]);
            let t3 = vzip2q_s16(r[2], r[3]);
            let t4 = vzip1q_s16(r[4], r[5]);
            let t5 = vzip2q_s16(r[4], r[5]);
            let t6 = vzip1q_s16(r[6], r[7]);
            let t7 = vzip2q_s16(r[6], r[7]);

            let w = |a: int16x8_t| vreinterpretq_s32_s16(a);
            let u0 = vzip1q_s32(w(t0), w(t2));
            let u1 = vzip2q_s32(w(t0), w(t2));
            let u2 = vzip1q_s32(w(t1), w(t3));
            let u3 = vzip2q_s32(w(t1), w(t3));
            let u4 = vzip1q_s32(w(t4), w(t6));
            let u5 = vzip2q_s32(w(t4), w(t6));
            let u6 = vzip1q_s32(w(t5), w(t7));
            let u7 = vzip2q_s32(w(t5), w(t7));

            let d = |a: int32x4_t| vreinterpretq_s64_s32(a);
            let n = |a: int64x2_t| vreinterpretq_s16_s64(a);
            r[0] = n(vzip1q_s64(d(u0), d(u4)));
            r[1] = n(vzip2q_s64(d(u0), d(u4)));
            r[2] = n(vzip1q_s64(d(u1), d(u5)));
            r[3] = n(vzip2q_s64(d(u1), d(u5)));
            r[4] = n(vzip1q_s64(d(u2), d(u6)));
            r[5] = n(vzip2q_s64(d(u2), d(u6)));
            r[6] = n(vzip1q_s64(d(u3), d(u7)));
            r[7] = n(vzip2q_s64(d(u3), d(u7)));
        }
    }

    #[inline]
    fn zero_i32() -> int32x4_t { unsafe { vdupq_n_s32(0) } }

    #[inline]
    fn dot_u8i8(acc: int32x4_t, a: int8x16_t, b: int8x16_t) -> int32x4_t {
        unsafe {
            let a = vreinterpretq_u8_s8(a);
            let a_lo = vreinterpretq_s16_u16(vmovl_u8(vget_low_u8(a)));
            let a_hi = vreinterpretq_s16_u16(vmovl_high_u8(a));
            let b_lo = vmovl_s8(vget_low_s8(b));
            let b_hi = vmovl_high_s8(b);
            let acc = vpadalq_s16(acc, vmulq_s16(a_lo, b_lo));
            vpadalq_s16(acc, vmulq_s16(a_hi, b_hi))
        }
    }

    #[inline]
    fn reduce_tile(acc: &[int32x4_t; TILE_COLS]) -> Self::Tile {
        unsafe {
            let lo = vpaddq_s32(vpaddq_s32(acc[0], acc[1]), vpaddq_s32(acc[2], acc[3]));
            let hi = vpaddq_s32(vpaddq_s32(acc[4], acc[5]), vpaddq_s32(acc[6], acc[7]));
            (I32Batch(lo), I32Batch(hi))
        }
    }

    #[inline]
    fn i32_to_f32(v: int32x4_t) -> float32x4_t { unsafe { vcvtq_f32_s32(v) } }

    #[inline]
    fn mul_f32(v: float32x4_t, scale: f32) -> float32x4_t { unsafe { vmulq_n_f32(v, scale) } }

    #[inline]
    fn add_f32(a: float32x4_t, b: float32x4_t) -> float32x4_t { unsafe { vaddq_f32(a, b) } }
}
