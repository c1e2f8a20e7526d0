//! Device acquisition and runtime compilation of the radix kernels.

use std::sync::Arc;

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::{CudaContext, CudaFunction};
use cudarc::nvrtc::{CompileOptions, Ptx};

use crate::{BITS_PER_PASS, ELEMENTS_PER_THREAD, SortError, WORKGROUP_SIZE};

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Opens device `ordinal`.
///
/// cudarc loads the driver library lazily and panics when it is missing, so
/// the first driver call runs under `catch_unwind`.
pub fn open_context(ordinal: usize) -> Result<Arc<CudaContext>, SortError> {
    let count = std::panic::catch_unwind(CudaContext::device_count)
        .map_err(|payload| SortError::EnvironmentUnavailable(panic_message(payload)))?
        .map_err(|e| SortError::EnvironmentUnavailable(e.to_string()))?;
    if count <= 0 {
        return Err(SortError::EnvironmentUnavailable(
            "no CUDA device found".to_string(),
        ));
    }
    if ordinal >= count as usize {
        return Err(SortError::DeviceRequest {
            ordinal,
            reason: format!("only {count} device(s) present"),
        });
    }
    CudaContext::new(ordinal).map_err(|e| SortError::DeviceRequest {
        ordinal,
        reason: e.to_string(),
    })
}

/// nvrtc defines carrying the launch geometry into the kernel sources
pub fn kernel_defines() -> Vec<String> {
    [
        ("WORKGROUP_SIZE", WORKGROUP_SIZE),
        ("ELEMENTS_PER_THREAD", ELEMENTS_PER_THREAD),
        ("BITS_PER_PASS", BITS_PER_PASS),
    ]
    .iter()
    .map(|(name, value)| format!("-D{name}={value}"))
    .collect()
}

pub fn compile_kernels() -> Result<Ptx, SortError> {
    let opts = CompileOptions {
        options: kernel_defines(),
        ..Default::default()
    };
    let src = kernel_radix::translation_unit();
    std::panic::catch_unwind(move || cudarc::nvrtc::compile_ptx_with_opts(src, opts))
        .map_err(|payload| SortError::Compile(panic_message(payload)))?
        .map_err(|e| SortError::Compile(format!("{e:?}")))
}

/// Compiled entry points of the five kernels.
pub struct RadixKernels {
    pub histogram: CudaFunction,
    pub reduce: CudaFunction,
    pub scan: CudaFunction,
    pub scan_add: CudaFunction,
    pub scatter: CudaFunction,
}

impl RadixKernels {
    /// Compiles and loads the kernels on `ctx` after checking that the device
    /// accepts `WORKGROUP_SIZE` threads per block.
    pub fn load(ctx: &Arc<CudaContext>) -> Result<Self, SortError> {
        let max_threads = ctx
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK)
            .map_err(|e| SortError::Compile(e.to_string()))?;
        if (max_threads as u32) < WORKGROUP_SIZE {
            return Err(SortError::Compile(format!(
                "block size {WORKGROUP_SIZE} exceeds the device maximum of {max_threads}"
            )));
        }
        let ptx = compile_kernels()?;
        let module = ctx
            .load_module(ptx)
            .map_err(|e| SortError::Compile(e.to_string()))?;
        let load = |name: &str| {
            module
                .load_function(name)
                .map_err(|e| SortError::Compile(format!("{name}: {e}")))
        };
        let [histogram, reduce, scan, scan_add, scatter] = kernel_radix::ENTRY_POINTS;
        Ok(RadixKernels {
            histogram: load(histogram)?,
            reduce: load(reduce)?,
            scan: load(scan)?,
            scan_add: load(scan_add)?,
            scatter: load(scatter)?,
        })
    }
}

#[test]
fn test_kernel_defines() {
    assert_eq!(
        kernel_defines(),
        [
            "-DWORKGROUP_SIZE=256",
            "-DELEMENTS_PER_THREAD=4",
            "-DBITS_PER_PASS=4"
        ]
    );
}
