use int8gemm::buffer::{AlignedBuffer, ALIGNMENT};
use int8gemm::callbacks::UnquantizeAndWrite;
use int8gemm::engine::Sequential;
use int8gemm::{layout, shift, DefaultArch};

#[test]
fn kernels_run_on_aligned_buffers() {
    let (rows, width, cols) = (4, 64, 16);
    let a = AlignedBuffer::from_slice(&vec![0.5f32; rows * width]);
    let b = AlignedBuffer::from_slice(&vec![0.25f32; width * cols]);
    let mut a_prep = AlignedBuffer::<u8>::zeroed(rows * width);
    let mut b_prep = AlignedBuffer::<i8>::zeroed(width * cols);
    let mut c = AlignedBuffer::<f32>::zeroed(rows * cols);
    for ptr in [a_prep.as_ptr() as usize, b_prep.as_ptr() as usize, c.as_ptr() as usize] {
        assert_eq!(ptr % ALIGNMENT, 0);
    }

    shift::prepare_a::<DefaultArch>(&a, &mut a_prep, 64.0, rows, width);
    layout::prepare_b::<DefaultArch>(&b, &mut b_prep, 64.0, width, cols);
    assert!(a_prep.iter().all(|&x| x == 32 + 127));
    assert!(b_prep.iter().all(|&x| x == 16));

    shift::multiply::<DefaultArch, _, _>(&a_prep, &b_prep, rows, width, cols, UnquantizeAndWrite::new(1.0, &mut c), &Sequential);
    assert!(c.iter().all(|&x| x == ((32 + 127) * 16 * width) as f32));
}
