use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaSlice, CudaStream};

use crate::cuda::RadixKernels;
use crate::plan::{passes, LaunchPlan, Pass, PingPong};
use crate::{SortConfig, SortError};

/// Sorted keys and the values that travelled with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedPairs {
    pub keys: Vec<u32>,
    pub values: Vec<u32>,
}

/// Device tables of a single pass, bin-major (`[bin * num_groups + group]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassTables {
    /// digit counts per group
    pub histogram: Vec<u32>,
    /// first destination index of every (bin, group)
    pub offsets: Vec<u32>,
}

pub struct RadixSorter {
    config: SortConfig,
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    kernels: RadixKernels,
}

impl RadixSorter {
    pub fn new(config: SortConfig) -> Result<Self, SortError> {
        config.validate()?;
        let ctx = crate::cuda::open_context(config.device_ordinal)?;
        let stream = ctx.default_stream();
        let kernels = RadixKernels::load(&ctx)?;
        let name = ctx.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!(
            device = %name,
            ordinal = config.device_ordinal,
            "radix sorter ready"
        );
        Ok(RadixSorter {
            config,
            ctx,
            stream,
            kernels,
        })
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    /// stream every launch of this sorter is enqueued on
    pub fn stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }

    pub fn kernels(&self) -> &RadixKernels {
        &self.kernels
    }

    /// Sorts `keys` ascending and permutes `values` alongside. Equal keys keep
    /// their input order.
    pub fn sort(&self, keys: &[u32], values: &[u32]) -> Result<SortedPairs, SortError> {
        check_lengths(keys, values)?;
        if keys.is_empty() {
            return Ok(SortedPairs::default());
        }
        LaunchPlan::new(keys.len(), self.config.max_reduce_levels)?;
        let keys_dev = self.stream.memcpy_stod(keys).map_err(SortError::Allocation)?;
        let values_dev = self.stream.memcpy_stod(values).map_err(SortError::Allocation)?;
        let (keys_dev, values_dev) = self.sort_device(keys_dev, values_dev)?;
        Ok(SortedPairs {
            keys: self.stream.memcpy_dtov(&keys_dev).map_err(SortError::Submission)?,
            values: self.stream.memcpy_dtov(&values_dev).map_err(SortError::Submission)?,
        })
    }

    /// Sorts device-resident pairs in place. The returned slices are the input
    /// allocations; the scratch buffers are released on return.
    pub fn sort_device(
        &self,
        keys: CudaSlice<u32>,
        values: CudaSlice<u32>,
    ) -> Result<(CudaSlice<u32>, CudaSlice<u32>), SortError> {
        if keys.len() != values.len() {
            return Err(SortError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        if keys.is_empty() {
            return Ok((keys, values));
        }
        let plan = LaunchPlan::new(keys.len(), self.config.max_reduce_levels)?;
        tracing::debug!(
            num_keys = plan.num_keys,
            num_groups = plan.num_groups,
            reduce_levels = plan.hierarchy.reduce_levels(),
            "sort"
        );
        let n = keys.len();
        let aux_keys = self.stream.alloc_zeros::<u32>(n).map_err(SortError::Allocation)?;
        let aux_values = self.stream.alloc_zeros::<u32>(n).map_err(SortError::Allocation)?;
        let mut tables = self.alloc_tables(&plan)?;
        let mut key_slots = PingPong::new(keys, aux_keys);
        let mut value_slots = PingPong::new(values, aux_values);

        let time0 = std::time::Instant::now();
        for pass in passes() {
            tracing::trace!(
                pass = pass.index(),
                shift = pass.shift(),
                src = pass.source_slot(),
                dst = pass.destination_slot(),
                "enqueue pass"
            );
            let (src_keys, dst_keys) = key_slots.split(pass);
            let (src_values, dst_values) = value_slots.split(pass);
            self.count(&plan, src_keys, &mut tables, pass)
                .map_err(SortError::Submission)?;
            self.prefix(&plan, &mut tables).map_err(SortError::Submission)?;
            crate::scatter::scatter_pairs(
                &self.stream,
                &self.kernels.scatter,
                src_keys,
                src_values,
                &tables[0],
                dst_keys,
                dst_values,
                pass.shift(),
                plan.num_keys,
            )
            .map_err(SortError::Submission)?;
        }
        self.stream.synchronize().map_err(SortError::Submission)?;
        tracing::debug!(elapsed = ?time0.elapsed(), "sort complete");
        Ok((key_slots.into_final(), value_slots.into_final()))
    }

    /// Runs the histogram and offset kernels of `pass` on `keys` and reads
    /// both tables back.
    pub fn inspect_pass(&self, keys: &[u32], pass: Pass) -> Result<PassTables, SortError> {
        if keys.is_empty() {
            return Ok(PassTables::default());
        }
        let plan = LaunchPlan::new(keys.len(), self.config.max_reduce_levels)?;
        let keys_dev = self.stream.memcpy_stod(keys).map_err(SortError::Allocation)?;
        let mut tables = self.alloc_tables(&plan)?;
        self.count(&plan, &keys_dev, &mut tables, pass)
            .map_err(SortError::Submission)?;
        let histogram = self.stream.memcpy_dtov(&tables[0]).map_err(SortError::Submission)?;
        self.prefix(&plan, &mut tables).map_err(SortError::Submission)?;
        let offsets = self.stream.memcpy_dtov(&tables[0]).map_err(SortError::Submission)?;
        Ok(PassTables { histogram, offsets })
    }

    /// one bin-major table per hierarchy level, the histogram table first
    fn alloc_tables(&self, plan: &LaunchPlan) -> Result<Vec<CudaSlice<u32>>, SortError> {
        (0..=plan.hierarchy.reduce_levels())
            .map(|level| {
                self.stream
                    .alloc_zeros::<u32>(plan.hierarchy.table_len(level))
                    .map_err(SortError::Allocation)
            })
            .collect()
    }

    /// clears every level and counts the digits of `pass`
    fn count(
        &self,
        plan: &LaunchPlan,
        src_keys: &CudaSlice<u32>,
        tables: &mut [CudaSlice<u32>],
        pass: Pass,
    ) -> Result<(), cudarc::driver::DriverError> {
        for table in tables.iter_mut() {
            self.stream.memset_zeros(table)?;
        }
        crate::histogram::count_digits(
            &self.stream,
            &self.kernels.histogram,
            src_keys,
            &mut tables[0],
            pass.shift(),
            plan.num_keys,
        )
    }

    /// Reduce bottom-up, scan the top level, then scan-add top-down so that
    /// `tables[0]` ends up holding the global offsets.
    fn prefix(
        &self,
        plan: &LaunchPlan,
        tables: &mut [CudaSlice<u32>],
    ) -> Result<(), cudarc::driver::DriverError> {
        let cols = plan.hierarchy.cols();
        let levels = plan.hierarchy.reduce_levels();
        for level in 0..levels {
            let (lo, hi) = tables.split_at_mut(level + 1);
            crate::reduce::reduce_counts(
                &self.stream,
                &self.kernels.reduce,
                &lo[level],
                &mut hi[0],
                cols[level],
                cols[level + 1],
            )?;
        }
        crate::scan::scan_reduced(&self.stream, &self.kernels.scan, &mut tables[levels])?;
        for level in (0..levels).rev() {
            let (lo, hi) = tables.split_at_mut(level + 1);
            crate::scan_add::add_chunk_bases(
                &self.stream,
                &self.kernels.scan_add,
                &mut lo[level],
                &hi[0],
                cols[level],
                cols[level + 1],
            )?;
        }
        Ok(())
    }
}

fn check_lengths(keys: &[u32], values: &[u32]) -> Result<(), SortError> {
    if keys.len() != values.len() {
        return Err(SortError::LengthMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }
    Ok(())
}

/// Sorter for device tests, or `None` when no CUDA device is reachable and
/// `RADIX_CUDARC_REQUIRE_DEVICE` is unset.
#[cfg(test)]
pub(crate) fn test_sorter() -> Option<RadixSorter> {
    match RadixSorter::new(SortConfig::from_env()) {
        Ok(sorter) => Some(sorter),
        Err(e) if e.is_unavailable() => {
            use crate::config::{device_required, ENV_REQUIRE_DEVICE};
            if device_required() {
                panic!("{ENV_REQUIRE_DEVICE} is set but no device is usable: {e}");
            }
            eprintln!("SKIPPED (no CUDA device, set {ENV_REQUIRE_DEVICE}=1 to fail instead): {e}");
            None
        }
        Err(e) => panic!("{e}"),
    }
}

#[test]
fn test_sort() -> Result<(), SortError> {
    let Some(sorter) = test_sorter() else {
        return Ok(());
    };
    for n in [1usize, 13, 1023, 1024, 1025, 1024 * 1024 - 1, 1024 * 1024 + 1] {
        let keys: Vec<u32> = (0..n as u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        let values: Vec<u32> = (0..n as u32).collect();
        let sorted = sorter.sort(&keys, &values)?;
        let (keys_ref, values_ref) = crate::reference::sort_pairs(&keys, &values);
        assert_eq!(sorted.keys, keys_ref, "n={n}");
        assert_eq!(sorted.values, values_ref, "n={n}");
    }
    Ok(())
}

#[test]
fn test_inspect_pass() -> Result<(), SortError> {
    let Some(sorter) = test_sorter() else {
        return Ok(());
    };
    let keys: Vec<u32> = (0..5000u32).map(|i| i.wrapping_mul(40_503) ^ 0x5a5a).collect();
    for pass in passes() {
        let tables = sorter.inspect_pass(&keys, pass)?;
        let plan = LaunchPlan::new(keys.len(), 1)?;
        assert_eq!(tables.histogram, crate::reference::histogram(&keys, pass.shift()));
        assert_eq!(
            tables.offsets,
            crate::reference::global_offsets(&keys, pass.shift(), &plan)
        );
    }
    Ok(())
}

#[test]
fn test_length_mismatch() -> Result<(), SortError> {
    let Some(sorter) = test_sorter() else {
        return Ok(());
    };
    match sorter.sort(&[1, 2, 3], &[1, 2]) {
        Err(SortError::LengthMismatch { keys: 3, values: 2 }) => {}
        other => panic!("unexpected {other:?}"),
    }
    let empty = sorter.sort(&[], &[])?;
    assert!(empty.keys.is_empty() && empty.values.is_empty());
    Ok(())
}
