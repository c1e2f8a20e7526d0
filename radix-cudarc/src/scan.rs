use cudarc::driver::{CudaFunction, CudaSlice, CudaStream, PushKernelArg};

use crate::{BLOCK_SIZE, WORKGROUP_SIZE};

/// In-place exclusive scan of `reduced` by a single block.
/// `reduced` must not exceed `BLOCK_SIZE` entries.
pub fn scan_reduced(
    stream: &std::sync::Arc<CudaStream>,
    func: &CudaFunction,
    reduced: &mut CudaSlice<u32>,
) -> Result<(), cudarc::driver::DriverError> {
    let count = reduced.len() as u32;
    assert!(count <= BLOCK_SIZE, "{count} entries do not fit one scan block");
    let cfg = cudarc::driver::LaunchConfig {
        grid_dim: (1, 1, 1),
        block_dim: (WORKGROUP_SIZE, 1, 1),
        shared_mem_bytes: 0,
    };
    let mut builder = stream.launch_builder(func);
    builder.arg(reduced);
    builder.arg(&count);
    unsafe { builder.launch(cfg) }?;
    Ok(())
}

#[test]
fn test_scan_reduced() -> Result<(), cudarc::driver::DriverError> {
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    for (n, v) in [(16usize, 1u32), (17, 3), (1000, 1024), (1023, 1), (1024, 65536)] {
        let vin = vec![v; n];
        let mut vio_dev = stream.memcpy_stod(&vin)?;
        scan_reduced(stream, &sorter.kernels().scan, &mut vio_dev)?;
        let vout = stream.memcpy_dtov(&vio_dev)?;
        assert_eq!(vout[0], 0);
        for i in 1..n {
            assert_eq!(vout[i] - vout[i - 1], vin[i - 1], "n={n} i={i}");
        }
    }
    Ok(())
}
