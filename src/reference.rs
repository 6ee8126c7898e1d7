// Scalar reference routines the SIMD paths are checked against.

use serde::Serialize;

/// Row-major `a (a_rows x width) * b (width x b_cols)` accumulated in f64.
pub fn multiply_f32(a: &[f32], b: &[f32], a_rows: usize, width: usize, b_cols: usize) -> Vec<f32> {
    let mut c = vec![0f32; a_rows * b_cols];
    for r in 0..a_rows {
        for col in 0..b_cols {
            let sum: f64 = (0..width).map(|k| a[r * width + k] as f64 * b[k * b_cols + col] as f64).sum();
            c[r * b_cols + col] = sum as f32;
        }
    }
    c
}

/// Row-major integer product with exact i32 accumulation. Works for signed and shifted A alike.
pub fn multiply_i32<TA, TB>(a: &[TA], b: &[TB], a_rows: usize, width: usize, b_cols: usize) -> Vec<i32>
where
    TA: Copy + Into<i32>,
    TB: Copy + Into<i32>,
{
    let mut c = vec![0i32; a_rows * b_cols];
    for r in 0..a_rows {
        for col in 0..b_cols {
            c[r * b_cols + col] = (0..width).map(|k| a[r * width + k].into() * b[k * b_cols + col].into()).sum();
        }
    }
    c
}

/// Quantizes with round-half-away-from-zero. Differs from the kernels only on exact ties.
pub fn quantize(input: &[f32], quant_mult: f32) -> Vec<i8> {
    input.iter().map(|&x| (x * quant_mult).round().clamp(-127.0, 127.0) as i8).collect()
}

/// True when `test` is an acceptable quantization of `from` given the reference code `reference`:
/// equal, or both exactly half a step away from `from`.
pub fn quantization_off(from: f32, reference: i8, test: i8) -> bool {
    if reference == test {
        return false;
    }
    let off_test = (test as f32 - from).abs();
    let off_ref = (reference as f32 - from).abs();
    let tie = |d: f32| d > 0.49 && d < 0.51;
    !(tie(off_test) && tie(off_ref))
}

/// Prepared-B layout built element by element from a row-major quantized B: for every `unroll`
/// columns and every `simd` rows, `unroll` runs of `simd` elements, run `i` being column `c + i`.
pub fn rearrange_b<T: Copy>(input: &[T], output: &mut [T], simd: usize, unroll: usize, rows: usize, cols: usize) {
    let mut out = 0;
    for c in (0..cols).step_by(unroll) {
        for r in (0..rows).step_by(simd) {
            for i in 0..unroll {
                for j in 0..simd {
                    output[out + simd * i + j] = input[cols * (r + j) + c + i];
                }
            }
            out += unroll * simd;
        }
    }
}

/// Element-wise error of a result against a reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub max_abs: f32,
    pub rmse: f32,
}

impl ErrorStats {
    pub fn compare(reference: &[f32], actual: &[f32]) -> Self {
        debug_assert_eq!(reference.len(), actual.len());
        if reference.is_empty() {
            return Self::default();
        }
        let mut max_abs = 0f32;
        let mut sq = 0f64;
        for (&r, &a) in reference.iter().zip(actual) {
            let d = (r - a).abs();
            max_abs = max_abs.max(d);
            sq += (d as f64) * (d as f64);
        }
        Self { max_abs, rmse: (sq / reference.len() as f64).sqrt() as f32 }
    }

    pub fn within(&self, max_abs: f32, rmse: f32) -> bool { self.max_abs <= max_abs && self.rmse <= rmse }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_products() {
        let a = [1f32, 2., 3., 4.];
        let b = [5f32, 6., 7., 8.];
        assert_eq!(multiply_f32(&a, &b, 2, 2, 2), vec![19., 22., 43., 50.]);
        let ai = [1u8, 2, 3, 4];
        let bi = [-5i8, 6, 7, -8];
        assert_eq!(multiply_i32(&ai, &bi, 2, 2, 2), vec![9, -10, 13, -14]);
    }

    #[test]
    fn ties_may_round_either_way() {
        assert!(!quantization_off(0.5, 1, 0));
        assert!(!quantization_off(-2.5, -3, -2));
        assert!(quantization_off(0.7, 1, 0));
        assert!(quantization_off(3.0, 3, 1));
    }

    #[test]
    fn stats_track_worst_element() {
        let s = ErrorStats::compare(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 5.0]);
        assert_eq!(s.max_abs, 2.0);
        assert_eq!(s.rmse, 1.0);
        assert!(s.within(2.0, 1.0));
        assert!(!s.within(1.9, 1.0));
    }
}
