//! Least-significant-digit radix sort of u32 key/value pairs on a CUDA device.
//!
//! Every pass sorts by one 4-bit digit and is split into five kernels
//! (histogram, reduce, scan, scan-add, scatter) because blocks of one launch
//! cannot synchronize with each other; the launch boundary on a single stream
//! is the only cross-block barrier.
//!
//! ```no_run
//! let sorter = radix_cudarc::RadixSorter::new(radix_cudarc::SortConfig::default())?;
//! let sorted = sorter.sort(&[3, 1, 2], &[30, 10, 20])?;
//! assert_eq!(sorted.keys, [1, 2, 3]);
//! assert_eq!(sorted.values, [10, 20, 30]);
//! # Ok::<(), radix_cudarc::SortError>(())
//! ```

pub use cudarc;

pub mod config;
pub mod cuda;
pub mod error;
pub mod histogram;
pub mod plan;
pub mod reduce;
pub mod reference;
pub mod scan;
pub mod scan_add;
pub mod scatter;
pub mod sorter;

pub use config::SortConfig;
pub use error::SortError;
pub use plan::{LaunchPlan, Pass, PingPong, ScanHierarchy};
pub use sorter::{PassTables, RadixSorter, SortedPairs};

/// bits of the key examined per pass
pub const BITS_PER_PASS: u32 = 4;
/// number of distinct digit values
pub const BIN_COUNT: u32 = 1 << BITS_PER_PASS;
pub const NUM_PASSES: u32 = u32::BITS / BITS_PER_PASS;
/// lanes per block, passed to nvrtc as `WORKGROUP_SIZE`
pub const WORKGROUP_SIZE: u32 = 256;
pub const ELEMENTS_PER_THREAD: u32 = 4;
/// elements handled by one histogram/scatter block
pub const BLOCK_SIZE: u32 = WORKGROUP_SIZE * ELEMENTS_PER_THREAD;

// the scatter kernel ranks a chunk with byte-packed counters, one byte per sub-bin
const _: () = assert!(WORKGROUP_SIZE <= 256);
const _: () = assert!(WORKGROUP_SIZE.is_power_of_two());
const _: () = assert!(WORKGROUP_SIZE >= BIN_COUNT);
const _: () = assert!(BITS_PER_PASS % 2 == 0);
const _: () = assert!(u32::BITS % BITS_PER_PASS == 0);
