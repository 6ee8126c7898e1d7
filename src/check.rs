// Call-site validation of shapes and buffer sizes.

use crate::arch::{Arch, TILE_COLS};
use crate::error::{Error, Result};

fn multiple(what: &'static str, value: usize, granularity: usize) -> Result<()> {
    if value % granularity == 0 {
        Ok(())
    } else {
        Err(Error::NotTileMultiple { what, value, granularity })
    }
}

fn at_least(what: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual >= expected {
        Ok(())
    } else {
        Err(Error::BufferTooSmall { what, actual, expected })
    }
}

/// `prepare_a` / `shift::prepare_a`: any shape, buffers must cover `rows * cols`.
pub fn check_prepare_a(input_len: usize, output_len: usize, rows: usize, cols: usize) -> Result<()> {
    at_least("input", input_len, rows * cols)?;
    at_least("output", output_len, rows * cols)
}

/// Any `prepare_b*` variant, with `rows` the inner dimension and `cols` the B columns.
pub fn check_prepare_b<A: Arch>(input_len: usize, output_len: usize, rows: usize, cols: usize) -> Result<()> {
    multiple("rows", rows, A::BYTES)?;
    multiple("cols", cols, TILE_COLS)?;
    at_least("input", input_len, rows * cols)?;
    at_least("output", output_len, rows * cols)
}

/// `select_columns_b` out of a prepared B with `total_cols` columns.
pub fn check_select_columns<A: Arch>(
    input_len: usize,
    output_len: usize,
    rows: usize,
    total_cols: usize,
    cols: &[usize],
) -> Result<()> {
    multiple("rows", rows, A::BYTES)?;
    multiple("selected columns", cols.len(), TILE_COLS)?;
    if let Some(&index) = cols.iter().find(|&&c| c >= total_cols) {
        return Err(Error::ColumnOutOfRange { index, cols: total_cols });
    }
    at_least("input", input_len, rows * total_cols)?;
    at_least("output", output_len, rows * cols.len())
}

/// `shift::multiply` writing an `a_rows x b_cols` output.
pub fn check_multiply<A: Arch>(
    a_len: usize,
    b_len: usize,
    output_len: usize,
    a_rows: usize,
    width: usize,
    b_cols: usize,
) -> Result<()> {
    multiple("width", width, A::BYTES)?;
    multiple("B cols", b_cols, TILE_COLS)?;
    at_least("A", a_len, a_rows * width)?;
    at_least("B", b_len, width * b_cols)?;
    at_least("output", output_len, a_rows * b_cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Generic;

    #[test]
    fn rejects_ragged_width() {
        let err = check_multiply::<Generic>(8 * 24, 24 * 8, 64, 8, 24, 8).unwrap_err();
        assert!(matches!(err, Error::NotTileMultiple { what: "width", value: 24, granularity: 16 }));
    }

    #[test]
    fn rejects_short_output() {
        let err = check_multiply::<Generic>(8 * 32, 32 * 8, 63, 8, 32, 8).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { what: "output", actual: 63, expected: 64 }));
        assert!(check_multiply::<Generic>(8 * 32, 32 * 8, 64, 8, 32, 8).is_ok());
    }

    #[test]
    fn rejects_out_of_range_column() {
        let cols = [0, 1, 2, 3, 4, 5, 6, 16];
        let err = check_select_columns::<Generic>(16 * 16, 16 * 8, 16, 16, &cols).unwrap_err();
        assert_eq!(err.to_string(), "column index 16 out of range for 16 columns");
    }
}
