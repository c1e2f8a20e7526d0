use cudarc::driver::{CudaFunction, CudaSlice, CudaStream, PushKernelArg};

use crate::{BIN_COUNT, WORKGROUP_SIZE};

/// Sums every `BLOCK_SIZE` chunk of each bin row of `counts` (`cols_in`
/// entries per bin) into `reduced` (`cols_out` entries per bin).
pub fn reduce_counts(
    stream: &std::sync::Arc<CudaStream>,
    func: &CudaFunction,
    counts: &CudaSlice<u32>,
    reduced: &mut CudaSlice<u32>,
    cols_in: u32,
    cols_out: u32,
) -> Result<(), cudarc::driver::DriverError> {
    assert_eq!(counts.len(), (BIN_COUNT * cols_in) as usize);
    assert_eq!(reduced.len(), (BIN_COUNT * cols_out) as usize);
    let cfg = cudarc::driver::LaunchConfig {
        grid_dim: (BIN_COUNT * cols_out, 1, 1),
        block_dim: (WORKGROUP_SIZE, 1, 1),
        shared_mem_bytes: 0,
    };
    let mut builder = stream.launch_builder(func);
    builder.arg(counts);
    builder.arg(reduced);
    builder.arg(&cols_in);
    builder.arg(&cols_out);
    unsafe { builder.launch(cfg) }?;
    Ok(())
}

#[test]
fn test_reduce_counts() -> Result<(), cudarc::driver::DriverError> {
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    for cols_in in [1u32, 13, 1024, 1025, 65536] {
        let cols_out = cols_in.div_ceil(crate::BLOCK_SIZE);
        let counts: Vec<u32> = (0..BIN_COUNT * cols_in).map(|i| i % 1031).collect();
        let counts_dev = stream.memcpy_stod(&counts)?;
        let mut reduced_dev = stream.alloc_zeros::<u32>((BIN_COUNT * cols_out) as usize)?;
        reduce_counts(
            stream,
            &sorter.kernels().reduce,
            &counts_dev,
            &mut reduced_dev,
            cols_in,
            cols_out,
        )?;
        let reduced = stream.memcpy_dtov(&reduced_dev)?;
        assert_eq!(
            reduced,
            crate::reference::reduce(&counts, cols_in as usize, cols_out as usize),
            "cols_in={cols_in}"
        );
    }
    Ok(())
}
