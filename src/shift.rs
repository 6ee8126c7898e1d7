// Shifted multiply: A encoded as `code + 127` for the u8 x i8 multiply-add, the excess removed
// by a bias computed once per B.

use std::sync::{Mutex, PoisonError};

use crate::arch::{Arch, TILE_COLS};
use crate::callbacks::{Callback, SplitRows};
use crate::engine::ExecutionEngine;
use crate::quantize::quantize_u;

/// Quantizes A row-major into the unsigned encoding, `quantize(x) + 127`.
pub fn prepare_a<A: Arch>(input: &[f32], output: &mut [u8], quant_mult: f32, rows: usize, cols: usize) {
    let n = rows * cols;
    quantize_u::<A>(&input[..n], &mut output[..n], quant_mult);
}

/// Scale feeding [`prepare_bias`]: undoes the +127 of every A code, `-127 / (qa * qb)`.
#[inline]
pub fn bias_unquant_mult(quant_mult_a: f32, quant_mult_b: f32) -> f32 { -127.0 / (quant_mult_a * quant_mult_b) }

/// Computes per-column sums of the prepared B (a virtual all-ones A row) and hands each tile to
/// `callback` as row 0. With [`bias_unquant_mult`] as scale this is the correction the shifted
/// multiply needs, folded into whatever bias the callback adds.
pub fn prepare_bias<A, C>(b: &[i8], width: usize, b_cols: usize, mut callback: C)
where
    A: Arch,
    C: Callback<A::Tile, Output = ()>,
{
    debug_assert!(width % A::BYTES == 0);
    debug_assert!(b_cols % TILE_COLS == 0);
    let ones = A::splat_u8(1);
    for group in 0..b_cols / TILE_COLS {
        let acc = dot_tile::<A>(b_group(b, width, group), width, |_| ones);
        callback.call(A::reduce_tile(&acc), 0, group * TILE_COLS, b_cols);
    }
}

/// `C = A * B` for a shifted A (`a_rows x width`, row-major u8) and a prepared B
/// (`width x b_cols`). The callback is split into one callback per output row and each row is
/// one unit of work for `engine`; within a row the callback is invoked exactly once per
/// [`TILE_COLS`]-wide tile with the raw i32 sums (all zero when `width == 0`).
///
/// Panics if the callback's output holds fewer than `a_rows` rows of `b_cols`.
pub fn multiply<A, C, E>(a: &[u8], b: &[i8], a_rows: usize, width: usize, b_cols: usize, callback: C, engine: &E)
where
    A: Arch,
    C: Callback<A::Tile, Output = ()> + SplitRows + Send,
    E: ExecutionEngine,
{
    debug_assert!(width % A::BYTES == 0);
    debug_assert!(b_cols % TILE_COLS == 0);
    debug_assert!(a.len() >= a_rows * width);
    debug_assert!(b.len() >= width * b_cols);
    if b_cols == 0 {
        return;
    }
    let rows: Vec<Mutex<C>> = callback.split_rows(b_cols).into_iter().take(a_rows).map(Mutex::new).collect();
    assert!(rows.len() == a_rows, "output holds {} rows of {} columns, multiply writes {}", rows.len(), b_cols, a_rows);
    engine.run(0, a_rows, 1, |row| {
        // Each row index is visited once, so the lock is never contended.
        let mut callback = rows[row].lock().unwrap_or_else(PoisonError::into_inner);
        let a_row = &a[row * width..(row + 1) * width];
        for group in 0..b_cols / TILE_COLS {
            let acc = dot_tile::<A>(b_group(b, width, group), width, |k| A::load_u8(&a_row[k..]));
            callback.call(A::reduce_tile(&acc), row, group * TILE_COLS, b_cols);
        }
    });
}

#[inline]
fn b_group(b: &[i8], width: usize, group: usize) -> &[i8] {
    let len = width * TILE_COLS;
    &b[group * len..(group + 1) * len]
}

#[inline(always)]
fn dot_tile<A: Arch>(b_group: &[i8], width: usize, a_at: impl Fn(usize) -> A::I8) -> [A::I32; TILE_COLS] {
    let w = A::BYTES;
    let mut acc = [A::zero_i32(); TILE_COLS];
    for (k, block) in (0..width).step_by(w).zip(b_group.chunks_exact(TILE_COLS * w)) {
        let av = a_at(k);
        for (i, sum) in acc.iter_mut().enumerate() {
            *sum = A::dot_u8i8(*sum, av, A::load_i8(&block[i * w..]));
        }
    }
    acc
}
