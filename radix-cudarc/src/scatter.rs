use cudarc::driver::{CudaFunction, CudaSlice, CudaStream, PushKernelArg};

use crate::{BIN_COUNT, BLOCK_SIZE, WORKGROUP_SIZE};

/// Stable scatter of one pass: every key/value pair moves to the global
/// offset of its digit in its group plus its rank among the group's keys of
/// that digit. Positions at or past `num_keys` are never written.
#[allow(clippy::too_many_arguments)]
pub fn scatter_pairs(
    stream: &std::sync::Arc<CudaStream>,
    func: &CudaFunction,
    src_keys: &CudaSlice<u32>,
    src_values: &CudaSlice<u32>,
    offsets: &CudaSlice<u32>,
    dst_keys: &mut CudaSlice<u32>,
    dst_values: &mut CudaSlice<u32>,
    shift: u32,
    num_keys: u32,
) -> Result<(), cudarc::driver::DriverError> {
    let num_groups = num_keys.div_ceil(BLOCK_SIZE);
    assert_eq!(offsets.len(), (BIN_COUNT * num_groups) as usize);
    for len in [src_keys.len(), src_values.len(), dst_keys.len(), dst_values.len()] {
        assert!(len >= num_keys as usize);
    }
    let cfg = cudarc::driver::LaunchConfig {
        grid_dim: (num_groups, 1, 1),
        block_dim: (WORKGROUP_SIZE, 1, 1),
        shared_mem_bytes: 0,
    };
    let mut builder = stream.launch_builder(func);
    builder.arg(src_keys);
    builder.arg(src_values);
    builder.arg(offsets);
    builder.arg(dst_keys);
    builder.arg(dst_values);
    builder.arg(&shift);
    builder.arg(&num_keys);
    unsafe { builder.launch(cfg) }?;
    Ok(())
}

#[test]
fn test_scatter_pairs() -> Result<(), cudarc::driver::DriverError> {
    use rand::Rng;
    use rand_chacha::rand_core::SeedableRng;
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    for n in [1usize, 255, 1023, 1025, 100_000] {
        let mut rng = rand_chacha::ChaChaRng::from_seed([1; 32]);
        let keys: Vec<u32> = (0..n).map(|_| rng.gen()).collect();
        let values: Vec<u32> = (0..n as u32).collect();
        let plan = crate::LaunchPlan::new(n, 1).unwrap();
        let shift = 8;
        let offsets = crate::reference::global_offsets(&keys, shift, &plan);
        let mut expected_keys = vec![0u32; n];
        let mut expected_values = vec![0u32; n];
        crate::reference::scatter(
            &keys,
            &values,
            &offsets,
            &mut expected_keys,
            &mut expected_values,
            shift,
        );
        let keys_dev = stream.memcpy_stod(&keys)?;
        let values_dev = stream.memcpy_stod(&values)?;
        let offsets_dev = stream.memcpy_stod(&offsets)?;
        let mut dst_keys_dev = stream.alloc_zeros::<u32>(n)?;
        let mut dst_values_dev = stream.alloc_zeros::<u32>(n)?;
        scatter_pairs(
            stream,
            &sorter.kernels().scatter,
            &keys_dev,
            &values_dev,
            &offsets_dev,
            &mut dst_keys_dev,
            &mut dst_values_dev,
            shift,
            n as u32,
        )?;
        assert_eq!(stream.memcpy_dtov(&dst_keys_dev)?, expected_keys, "n={n}");
        assert_eq!(stream.memcpy_dtov(&dst_values_dev)?, expected_values, "n={n}");
    }
    Ok(())
}
