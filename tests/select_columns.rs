use int8gemm::layout::{prepare_b, select_columns_b};
use int8gemm::{Arch, DefaultArch, Generic};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn selection_matches_reprepare<A: Arch>(rows: usize, cols: usize, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let input: Vec<f32> = (0..rows * cols).map(|_| rng.gen_range(-129.0f32..129.0)).collect();
    let mut prepared = vec![0i8; rows * cols];
    prepare_b::<A>(&input, &mut prepared, 1.0, rows, cols);

    // Random order, repeats allowed.
    let select: Vec<usize> = (0..24).map(|_| rng.gen_range(0..cols)).collect();
    let mut selected = vec![0i8; rows * select.len()];
    select_columns_b::<A>(&prepared, &mut selected, rows, &select);

    let mut narrowed = vec![0f32; rows * select.len()];
    for r in 0..rows {
        for (c, &src) in select.iter().enumerate() {
            narrowed[r * select.len() + c] = input[r * cols + src];
        }
    }
    let mut expected = vec![0i8; rows * select.len()];
    prepare_b::<A>(&narrowed, &mut expected, 1.0, rows, select.len());
    assert_eq!(selected, expected);
}

#[test]
fn select_256() {
    selection_matches_reprepare::<DefaultArch>(256, 256, 1);
    selection_matches_reprepare::<Generic>(256, 256, 2);
}

#[test]
fn select_512() {
    selection_matches_reprepare::<DefaultArch>(512, 512, 3);
}

#[test]
fn selecting_every_column_in_order_is_identity() {
    let (rows, cols) = (64, 32);
    let input: Vec<f32> = (0..rows * cols).map(|i| (i % 200) as f32 - 100.0).collect();
    let mut prepared = vec![0i8; rows * cols];
    prepare_b::<DefaultArch>(&input, &mut prepared, 1.0, rows, cols);
    let all: Vec<usize> = (0..cols).collect();
    let mut selected = vec![0i8; rows * cols];
    select_columns_b::<DefaultArch>(&prepared, &mut selected, rows, &all);
    assert_eq!(selected, prepared);
}
