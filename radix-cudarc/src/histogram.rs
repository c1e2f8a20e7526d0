use cudarc::driver::{CudaFunction, CudaSlice, CudaStream, PushKernelArg};

use crate::{BIN_COUNT, BLOCK_SIZE, WORKGROUP_SIZE};

/// Counts the digit `(key >> shift) & 0xF` of every key per group into the
/// bin-major table `counts` (`BIN_COUNT * num_groups` entries).
pub fn count_digits(
    stream: &std::sync::Arc<CudaStream>,
    func: &CudaFunction,
    src_keys: &CudaSlice<u32>,
    counts: &mut CudaSlice<u32>,
    shift: u32,
    num_keys: u32,
) -> Result<(), cudarc::driver::DriverError> {
    let num_groups = num_keys.div_ceil(BLOCK_SIZE);
    assert!(src_keys.len() >= num_keys as usize);
    assert_eq!(counts.len(), (BIN_COUNT * num_groups) as usize);
    let cfg = cudarc::driver::LaunchConfig {
        grid_dim: (num_groups, 1, 1),
        block_dim: (WORKGROUP_SIZE, 1, 1),
        shared_mem_bytes: 0,
    };
    let mut builder = stream.launch_builder(func);
    builder.arg(src_keys);
    builder.arg(counts);
    builder.arg(&shift);
    builder.arg(&num_keys);
    unsafe { builder.launch(cfg) }?;
    Ok(())
}

#[test]
fn test_count_digits() -> Result<(), cudarc::driver::DriverError> {
    use rand::Rng;
    use rand_chacha::rand_core::SeedableRng;
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    for n in [1usize, 13, 1023, 1024, 1025, 1024 * 1024 + 1] {
        let mut rng = rand_chacha::ChaChaRng::from_seed([0; 32]);
        let keys: Vec<u32> = (0..n).map(|_| rng.gen()).collect();
        let keys_dev = stream.memcpy_stod(&keys)?;
        let num_groups = n.div_ceil(BLOCK_SIZE as usize);
        let mut counts_dev = stream.alloc_zeros::<u32>(BIN_COUNT as usize * num_groups)?;
        for shift in [0u32, 12, 28] {
            count_digits(
                stream,
                &sorter.kernels().histogram,
                &keys_dev,
                &mut counts_dev,
                shift,
                n as u32,
            )?;
            let counts = stream.memcpy_dtov(&counts_dev)?;
            assert_eq!(counts, crate::reference::histogram(&keys, shift), "n={n}");
            assert_eq!(counts.iter().map(|&c| c as usize).sum::<usize>(), n);
        }
    }
    Ok(())
}
