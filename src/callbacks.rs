// Post-processing of 32-bit accumulator tiles: unquantize, add bias, write.

use std::borrow::Cow;

use crate::arch::{Arch, F32Batch, I32Batch};

/// One stage of the pipeline. `row_idx`/`col_idx` locate the tile, `col_size` is the row stride
/// of the output. Stages accept a single batch (256-bit archs) or a batch pair (128-bit archs)
/// and preserve that shape.
pub trait Callback<In> {
    type Output;
    fn call(&mut self, input: In, row_idx: usize, col_idx: usize, col_size: usize) -> Self::Output;
}

/// Callbacks whose output can be cut into one independent callback per output row, so rows can
/// be processed on different threads.
pub trait SplitRows: Sized {
    fn split_rows(self, col_size: usize) -> Vec<Self>;
}

/// Combined dequantization scale for operands quantized with `quant_mult_a` and `quant_mult_b`.
#[inline]
pub fn unquant_mult(quant_mult_a: f32, quant_mult_b: f32) -> f32 { 1.0 / (quant_mult_a * quant_mult_b) }

#[derive(Clone, Copy, Debug)]
pub struct Unquantize {
    pub unquant_mult: f32,
}

impl<A: Arch> Callback<I32Batch<A>> for Unquantize {
    type Output = F32Batch<A>;

    #[inline]
    fn call(&mut self, total: I32Batch<A>, _: usize, _: usize, _: usize) -> F32Batch<A> {
        total.to_f32().scale(self.unquant_mult)
    }
}

impl<A: Arch> Callback<(I32Batch<A>, I32Batch<A>)> for Unquantize {
    type Output = (F32Batch<A>, F32Batch<A>);

    #[inline]
    fn call(&mut self, total: (I32Batch<A>, I32Batch<A>), _: usize, _: usize, _: usize) -> Self::Output {
        (total.0.to_f32().scale(self.unquant_mult), total.1.to_f32().scale(self.unquant_mult))
    }
}

/// Adds the per-column bias starting at `col_idx`.
#[derive(Clone, Debug)]
pub struct AddBias<'a> {
    bias: Cow<'a, [f32]>,
}

impl<'a> AddBias<'a> {
    pub fn new(bias: &'a [f32]) -> Self { Self { bias: Cow::Borrowed(bias) } }

    #[inline]
    fn at<A: Arch>(&self, col_idx: usize) -> F32Batch<A> {
        F32Batch::load(&self.bias[col_idx..col_idx + A::I32_LANES])
    }
}

impl<A: Arch> Callback<F32Batch<A>> for AddBias<'_> {
    type Output = F32Batch<A>;

    #[inline]
    fn call(&mut self, total: F32Batch<A>, _: usize, col_idx: usize, _: usize) -> F32Batch<A> {
        total.add(self.at::<A>(col_idx))
    }
}

impl<A: Arch> Callback<(F32Batch<A>, F32Batch<A>)> for AddBias<'_> {
    type Output = (F32Batch<A>, F32Batch<A>);

    #[inline]
    fn call(&mut self, total: (F32Batch<A>, F32Batch<A>), _: usize, col_idx: usize, _: usize) -> Self::Output {
        (total.0.add(self.at::<A>(col_idx)), total.1.add(self.at::<A>(col_idx + A::I32_LANES)))
    }
}

/// Stores batches at `row_idx * col_size + col_idx`. `Write<f32>` takes unquantized batches,
/// `Write<i32>` takes raw accumulators.
#[derive(Debug)]
pub struct Write<'a, T> {
    output: &'a mut [T],
    first_row: usize,
}

impl<'a, T> Write<'a, T> {
    pub fn new(output: &'a mut [T]) -> Self { Self { output, first_row: 0 } }

    #[inline]
    fn slot(&mut self, row_idx: usize, col_idx: usize, col_size: usize, n: usize) -> &mut [T] {
        let offset = (row_idx - self.first_row) * col_size + col_idx;
        &mut self.output[offset..offset + n]
    }
}

impl<T> SplitRows for Write<'_, T> {
    fn split_rows(self, col_size: usize) -> Vec<Self> {
        let Write { output, first_row } = self;
        output
            .chunks_mut(col_size)
            .enumerate()
            .map(|(r, output)| Write { output, first_row: first_row + r })
            .collect()
    }
}

impl<A: Arch> Callback<F32Batch<A>> for Write<'_, f32> {
    type Output = ();

    #[inline]
    fn call(&mut self, result: F32Batch<A>, row_idx: usize, col_idx: usize, col_size: usize) {
        result.store(self.slot(row_idx, col_idx, col_size, A::I32_LANES));
    }
}

impl<A: Arch> Callback<(F32Batch<A>, F32Batch<A>)> for Write<'_, f32> {
    type Output = ();

    #[inline]
    fn call(&mut self, result: (F32Batch<A>, F32Batch<A>), row_idx: usize, col_idx: usize, col_size: usize) {
        let n = A::I32_LANES;
        let slot = self.slot(row_idx, col_idx, col_size, 2 * n);
        result.0.store(&mut slot[..n]);
        result.1.store(&mut slot[n..]);
    }
}

impl<A: Arch> Callback<I32Batch<A>> for Write<'_, i32> {
    type Output = ();

    #[inline]
    fn call(&mut self, result: I32Batch<A>, row_idx: usize, col_idx: usize, col_size: usize) {
        result.store(self.slot(row_idx, col_idx, col_size, A::I32_LANES));
    }
}

impl<A: Arch> Callback<(I32Batch<A>, I32Batch<A>)> for Write<'_, i32> {
    type Output = ();

    #[inline]
    fn call(&mut self, result: (I32Batch<A>, I32Batch<A>), row_idx: usize, col_idx: usize, col_size: usize) {
        let n = A::I32_LANES;
        let slot = self.slot(row_idx, col_idx, col_size, 2 * n);
        result.0.store(&mut slot[..n]);
        result.1.store(&mut slot[n..]);
    }
}

/// unquantize -> write.
#[derive(Debug)]
pub struct UnquantizeAndWrite<'a> {
    pub unquantize: Unquantize,
    pub write: Write<'a, f32>,
}

impl<'a> UnquantizeAndWrite<'a> {
    pub fn new(unquant_mult: f32, output: &'a mut [f32]) -> Self {
        Self { unquantize: Unquantize { unquant_mult }, write: Write::new(output) }
    }
}

impl SplitRows for UnquantizeAndWrite<'_> {
    fn split_rows(self, col_size: usize) -> Vec<Self> {
        let UnquantizeAndWrite { unquantize, write } = self;
        write.split_rows(col_size).into_iter().map(|write| UnquantizeAndWrite { unquantize, write }).collect()
    }
}

impl<'a, T> Callback<T> for UnquantizeAndWrite<'a>
where
    Unquantize: Callback<T>,
    Write<'a, f32>: Callback<<Unquantize as Callback<T>>::Output, Output = ()>,
{
    type Output = ();

    #[inline]
    fn call(&mut self, total: T, row_idx: usize, col_idx: usize, col_size: usize) {
        let result = self.unquantize.call(total, row_idx, col_idx, col_size);
        self.write.call(result, row_idx, col_idx, col_size)
    }
}

/// unquantize -> add bias -> write.
#[derive(Debug)]
pub struct UnquantizeAndAddBiasAndWrite<'a> {
    pub unquantize: Unquantize,
    pub add_bias: AddBias<'a>,
    pub write: Write<'a, f32>,
}

impl<'a> UnquantizeAndAddBiasAndWrite<'a> {
    pub fn new(unquant_mult: f32, bias: &'a [f32], output: &'a mut [f32]) -> Self {
        Self { unquantize: Unquantize { unquant_mult }, add_bias: AddBias::new(bias), write: Write::new(output) }
    }

    /// Adds `bias` and writes the result back over it. The bias is read from a snapshot taken
    /// here, so every tile sees the values as passed in. This is how a user bias gets folded
    /// with the shift correction in `shift::prepare_bias`.
    pub fn in_place(unquant_mult: f32, bias: &'a mut [f32]) -> Self {
        let add_bias = AddBias { bias: Cow::Owned(bias.to_vec()) };
        Self { unquantize: Unquantize { unquant_mult }, add_bias, write: Write::new(bias) }
    }
}

impl SplitRows for UnquantizeAndAddBiasAndWrite<'_> {
    fn split_rows(self, col_size: usize) -> Vec<Self> {
        let UnquantizeAndAddBiasAndWrite { unquantize, add_bias, write } = self;
        write
            .split_rows(col_size)
            .into_iter()
            .map(|write| UnquantizeAndAddBiasAndWrite { unquantize, add_bias: add_bias.clone(), write })
            .collect()
    }
}

impl<'a, T> Callback<T> for UnquantizeAndAddBiasAndWrite<'a>
where
    Unquantize: Callback<T>,
    AddBias<'a>: Callback<<Unquantize as Callback<T>>::Output>,
    Write<'a, f32>: Callback<<AddBias<'a> as Callback<<Unquantize as Callback<T>>::Output>>::Output, Output = ()>,
{
    type Output = ();

    #[inline]
    fn call(&mut self, total: T, row_idx: usize, col_idx: usize, col_size: usize) {
        let unquantized = self.unquantize.call(total, row_idx, col_idx, col_size);
        let biased = self.add_bias.call(unquantized, row_idx, col_idx, col_size);
        self.write.call(biased, row_idx, col_idx, col_size)
    }
}
