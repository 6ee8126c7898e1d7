// 256-bit x86 arch, compiled only when the build enables `avx2`.

use std::arch::x86_64::*;

use super::{Arch, I32Batch, TILE_COLS};

#[derive(Clone, Copy, Debug, Default)]
pub struct Avx2;

const BYTES: usize = 32;

impl Arch for Avx2 {
    const NAME: &'static str = "avx2";
    const BYTES: usize = BYTES;

    type I8 = __m256i;
    type I16 = __m256i;
    type I32 = __m256i;
    type F32 = __m256;
    type Tile = I32Batch<Avx2>;

    #[inline]
    fn load_i8(src: &[i8]) -> __m256i {
        let src = &src[..BYTES];
        unsafe { _mm256_loadu_si256(src.as_ptr() as *const __m256i) }
    }

    #[inline]
    fn store_i8(v: __m256i, dst: &mut [i8]) {
        let dst = &mut dst[..BYTES];
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, v) }
    }

    #[inline]
    fn load_u8(src: &[u8]) -> __m256i {
        let src = &src[..BYTES];
        unsafe { _mm256_loadu_si256(src.as_ptr() as *const __m256i) }
    }

    #[inline]
    fn store_u8(v: __m256i, dst: &mut [u8]) {
        let dst = &mut dst[..BYTES];
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, v) }
    }

    #[inline]
    fn load_i16(src: &[i16]) -> __m256i {
        let src = &src[..BYTES / 2];
        unsafe { _mm256_loadu_si256(src.as_ptr() as *const __m256i) }
    }

    #[inline]
    fn store_i16(v: __m256i, dst: &mut [i16]) {
        let dst = &mut dst[..BYTES / 2];
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, v) }
    }

    #[inline]
    fn load_f32(src: &[f32]) -> __m256 {
        let src = &src[..8];
        unsafe { _mm256_loadu_ps(src.as_ptr()) }
    }

    #[inline]
    fn store_f32(v: __m256, dst: &mut [f32]) {
        let dst = &mut dst[..8];
        unsafe { _mm256_storeu_ps(dst.as_mut_ptr(), v) }
    }

    #[inline]
    fn store_i32(v: __m256i, dst: &mut [i32]) {
        let dst = &mut dst[..8];
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, v) }
    }

    #[inline]
    fn splat_u8(x: u8) -> __m256i { unsafe { _mm256_set1_epi8(x as i8) } }

    #[inline]
    fn i8_as_i16(v: __m256i) -> __m256i { v }

    #[inline]
    fn i16_as_i8(v: __m256i) -> __m256i { v }

    #[inline]
    fn quantize(src: &[f32], quant_mult: f32) -> __m256i {
        let src = &src[..BYTES];
        unsafe {
            let q = _mm256_set1_ps(quant_mult);
            let lo = _mm256_set1_ps(-127.0);
            let hi = _mm256_set1_ps(127.0);
            // Clamp before converting so huge inputs cannot wrap to i32::MIN. NaN lanes are
            // zeroed first, as the scalar path does.
            let tile = |off: usize| {
                let v = _mm256_mul_ps(_mm256_loadu_ps(src.as_ptr().add(off)), q);
                let v = _mm256_and_ps(v, _mm256_cmp_ps(v, v, _CMP_ORD_Q));
                _mm256_cvtps_epi32(_mm256_min_ps(_mm256_max_ps(v, lo), hi))
            };
            let (a, b, c, d) = (tile(0), tile(8), tile(16), tile(24));
            let ab = _mm256_packs_epi32(a, b);
            let cd = _mm256_packs_epi32(c, d);
            let packed = _mm256_packs_epi16(ab, cd);
            // packs works per 128-bit lane; restore a0-7 b0-7 c0-7 d0-7 dword order.
            _mm256_permutevar8x32_epi32(packed, _mm256_setr_epi32(0, 4, 1, 5, 2, 6, 3, 7))
        }
    }

    #[inline]
    fn shift_unsigned(v: __m256i) -> __m256i {
        unsafe { _mm256_add_epi8(v, _mm256_set1_epi8(127)) }
    }

    #[inline]
    fn transpose16_in_lane(r: &mut [__m256i; 8]) {
        unsafe {
            let t0 = _mm256_unpacklo_epi16(r[0], r[1]);
            let t1 = _mm256_unpackhi_epi16(r[0], r[1]);
            let t2 = _mm256_unpacklo_epi16(r[2], r[3]);
            let t3 = _mm256_unpackhi_epi16(r[2], r[3]);
            let t4 = _mm256_unpacklo_epi16(r[4], r[5]);
            let t5 = _mm256_unpackhi_epi16(r[4], r[5]);
            let t6 = _mm256_unpacklo_epi16(r[6], r[7]);
            let t7 = _mm256_unpackhi_epi16(r[6], r[7]);

            let u0 = _mm256_unpacklo_epi32(t0, t2);
            let u1 = _mm256_unpackhi_epi32(t0, t2);
            let u2 = _mm256_unpacklo_epi32(t1, t3);
            let u3 = _mm256_unpackhi_epi32(t1, t3);
            let u4 = _mm256_unpacklo_epi32(t4, t6);
            let u5 = _mm256_unpackhi_epi32(t4, t6);
            let u6 = _mm256_unpacklo_epi32(t5, t7);
            let u7 = _mm256_unpackhi_epi32(t5, t7);

            r[0] = _mm256_unpacklo_epi64(u0, u4);
            r[1] = _mm256_unpackhi_epi64(u0, u4);
            r[2] = _mm256_unpacklo_epi64(u1, u5);
            r[3] = _mm256_unpackhi_epi64(u1, u5);
            r[4] = _mm256_unpacklo_epi64(u2, u6);
            r[5] = _mm256_unpackhi_epi64(u2, u6);
            r[6] = _mm256_unpacklo_epi64(u3, u7);
            r[7] = _mm256_unpackhi_epi64(u3, u7);
        }
    }

    #[inline]
    fn zero_i32() -> __m256i { unsafe { _mm256_setzero_si256() } }

    #[inline]
    fn dot_u8i8(acc: __m256i, a: __m256i, b: __m256i) -> __m256i {
        unsafe {
            let ones = _mm256_set1_epi16(1);
            _mm256_add_epi32(acc, _mm256_madd_epi16(_mm256_maddubs_epi16(a, b), ones))
        }
    }

    #[inline]
    fn reduce_tile(acc: &[__m256i; TILE_COLS]) -> I32Batch<Avx2> {
        unsafe {
            let h01 = _mm256_hadd_epi32(acc[0], acc[1]);
            let h23 = _mm256_hadd_epi32(acc[2], acc[3]);
            let h0123 = _mm256_hadd_epi32(h01, h23);
            let dots_0123 = _mm_add_epi32(_mm256_castsi256_si128(h0123), _mm256_extracti128_si256(h0123, 1));

            let h45 = _mm256_hadd_epi32(acc[4], acc[5]);
            let h67 = _mm256_hadd_epi32(acc[6], acc[7]);
            let h4567 = _mm256_hadd_epi32(h45, h67);
            let dots_4567 = _mm_add_epi32(_mm256_castsi256_si128(h4567), _mm256_extracti128_si256(h4567, 1));

            I32Batch(_mm256_set_m128i(dots_4567, dots_0123))
        }
    }

    #[inline]
    fn i32_to_f32(v: __m256i) -> __m256 { unsafe { _mm256_cvtepi32_ps(v) } }

    #[inline]
    fn mul_f32(v: __m256, scale: f32) -> __m256 { unsafe { _mm256_mul_ps(v, _mm256_set1_ps(scale)) } }

    #[inline]
    fn add_f32(a: __m256, b: __m256) -> __m256 { unsafe { _mm256_add_ps(a, b) } }
}
