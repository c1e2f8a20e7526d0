//! CUDA C sources of the radix sort pipeline.
//!
//! The sources are compiled at runtime with nvrtc. They expect
//! `WORKGROUP_SIZE`, `ELEMENTS_PER_THREAD` and `BITS_PER_PASS` to be defined
//! on the compiler command line, so the host owns every launch geometry
//! constant. `COMMON` must precede the kernels in the translation unit.

pub const COMMON: &str = include_str!("common.cuh");
pub const HISTOGRAM: &str = include_str!("histogram.cu");
pub const REDUCE: &str = include_str!("reduce.cu");
pub const SCAN: &str = include_str!("scan.cu");
pub const SCAN_ADD: &str = include_str!("scan_add.cu");
pub const SCATTER: &str = include_str!("scatter.cu");

/// Kernel entry points, in pipeline order.
pub const ENTRY_POINTS: [&str; 5] = [
    "radix_histogram",
    "radix_reduce",
    "radix_scan",
    "radix_scan_add",
    "radix_scatter",
];

/// Concatenates the sources into one translation unit.
pub fn translation_unit() -> String {
    [COMMON, HISTOGRAM, REDUCE, SCAN, SCAN_ADD, SCATTER].join("\n")
}

#[test]
fn test_entry_points_are_defined() {
    let src = translation_unit();
    for name in ENTRY_POINTS {
        let decl = format!("__global__ void {name}(");
        assert!(src.contains(&decl), "missing kernel {name}");
    }
    assert!(src.starts_with(COMMON));
}
