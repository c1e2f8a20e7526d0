use cudarc::driver::{CudaFunction, CudaSlice, CudaStream, PushKernelArg};

use crate::{BIN_COUNT, WORKGROUP_SIZE};

/// Turns the bin-major `counts` table into global offsets: each `BLOCK_SIZE`
/// chunk of a bin row is scanned locally and offset by its scanned chunk sum
/// from `reduced`.
pub fn add_chunk_bases(
    stream: &std::sync::Arc<CudaStream>,
    func: &CudaFunction,
    counts: &mut CudaSlice<u32>,
    reduced: &CudaSlice<u32>,
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
fn test_add_chunk_bases() -> Result<(), cudarc::driver::DriverError> {
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    for cols_in in [1u32, 1000, 1024, 2049] {
        let cols_out = cols_in.div_ceil(crate::BLOCK_SIZE);
        let counts: Vec<u32> = (0..BIN_COUNT * cols_in).map(|i| (i * 7) % 13).collect();
        let mut reduced = crate::reference::reduce(&counts, cols_in as usize, cols_out as usize);
        crate::reference::exclusive_scan(&mut reduced);
        let mut counts_dev = stream.memcpy_stod(&counts)?;
        let reduced_dev = stream.memcpy_stod(&reduced)?;
        add_chunk_bases(
            stream,
            &sorter.kernels().scan_add,
            &mut counts_dev,
            &reduced_dev,
            cols_in,
            cols_out,
        )?;
        let offsets = stream.memcpy_dtov(&counts_dev)?;
        let mut expected = counts.clone();
        crate::reference::exclusive_scan(&mut expected);
        assert_eq!(offsets, expected, "cols_in={cols_in}");
    }
    Ok(())
}

#[test]
fn test_two_level_hierarchy() -> Result<(), cudarc::driver::DriverError> {
    let Some(sorter) = crate::sorter::test_sorter() else {
        return Ok(());
    };
    let stream = sorter.stream();
    let kernels = sorter.kernels();
    let hierarchy = crate::ScanHierarchy::new(70_000, crate::BLOCK_SIZE, crate::BLOCK_SIZE);
    let cols = hierarchy.cols();
    assert_eq!(cols, &[70_000, 69, 1]);
    let levels = hierarchy.reduce_levels();
    let counts: Vec<u32> = (0..BIN_COUNT * cols[0]).map(|i| (i * 7) % 13).collect();
    let mut tables = vec![stream.memcpy_stod(&counts)?];
    for level in 1..=levels {
        tables.push(stream.alloc_zeros::<u32>(hierarchy.table_len(level))?);
    }
    for level in 0..levels {
        let (lo, hi) = tables.split_at_mut(level + 1);
        crate::reduce::reduce_counts(
            stream,
            &kernels.reduce,
            &lo[level],
            &mut hi[0],
            cols[level],
            cols[level + 1],
        )?;
    }
    crate::scan::scan_reduced(stream, &kernels.scan, &mut tables[levels])?;
    for level in (0..levels).rev() {
        let (lo, hi) = tables.split_at_mut(level + 1);
        add_chunk_bases(
            stream,
            &kernels.scan_add,
            &mut lo[level],
            &hi[0],
            cols[level],
            cols[level + 1],
        )?;
    }
    let offsets = stream.memcpy_dtov(&tables[0])?;
    let mut expected = counts;
    crate::reference::exclusive_scan(&mut expected);
    assert_eq!(offsets, expected);
    Ok(())
}
