//! Launch geometry of one sort call: group counts, the reduce hierarchy
//! feeding the single-block scan, and the ping-pong slot of every pass.

use crate::{BIN_COUNT, BITS_PER_PASS, BLOCK_SIZE, NUM_PASSES, SortError};

/// largest key count whose in-kernel indices and padded offsets fit in u32
pub const MAX_KEYS: usize = (u32::MAX - BLOCK_SIZE) as usize;

/// slot that holds the sorted data after all passes
pub const FINAL_SLOT: usize = (NUM_PASSES % 2) as usize;

/// Levels of a hierarchical scan over `BIN_COUNT` bin-major rows.
///
/// `cols[0]` is the number of entries per bin of the bottom table; every
/// further level holds the per-`fan_out` chunk sums of the level below. The
/// top level fits in one scan block (`BIN_COUNT * cols.last() <= capacity`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHierarchy {
    cols: Vec<u32>,
}

impl ScanHierarchy {
    /// At least one reduce level is always built so that the pipeline shape
    /// does not depend on the input size.
    pub fn new(entries_per_bin: u32, fan_out: u32, capacity: u32) -> Self {
        assert!(fan_out > 1);
        assert!(capacity >= BIN_COUNT);
        let mut cols = vec![entries_per_bin];
        loop {
            let top = cols[cols.len() - 1].div_ceil(fan_out);
            cols.push(top);
            if u64::from(BIN_COUNT) * u64::from(top) <= u64::from(capacity) {
                break;
            }
        }
        ScanHierarchy { cols }
    }

    /// number of reduce (and scan-add) launches per pass
    pub fn reduce_levels(&self) -> usize {
        self.cols.len() - 1
    }

    /// entries per bin at each level, bottom first
    pub fn cols(&self) -> &[u32] {
        &self.cols
    }

    /// total entries of the table at `level`
    pub fn table_len(&self, level: usize) -> usize {
        (BIN_COUNT * self.cols[level]) as usize
    }

    /// entries scanned by the single-block scan
    pub fn top_len(&self) -> usize {
        self.table_len(self.reduce_levels())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub num_keys: u32,
    /// histogram/scatter grid size
    pub num_groups: u32,
    pub hierarchy: ScanHierarchy,
}

impl LaunchPlan {
    pub fn new(len: usize, max_reduce_levels: usize) -> Result<Self, SortError> {
        if len > MAX_KEYS {
            return Err(SortError::CapacityExceeded { len, max: MAX_KEYS });
        }
        let num_keys = len as u32;
        let num_groups = num_keys.div_ceil(BLOCK_SIZE);
        let hierarchy = ScanHierarchy::new(num_groups, BLOCK_SIZE, BLOCK_SIZE);
        if hierarchy.reduce_levels() > max_reduce_levels {
            return Err(SortError::CapacityExceeded {
                len,
                max: max_keys(max_reduce_levels),
            });
        }
        Ok(LaunchPlan {
            num_keys,
            num_groups,
            hierarchy,
        })
    }
}

/// Largest key count a hierarchy of `levels` reduce levels can sort. Every
/// hierarchy has at least one level, so zero levels sort nothing.
pub fn max_keys(levels: usize) -> usize {
    if levels == 0 {
        return 0;
    }
    let mut groups = u64::from(BLOCK_SIZE / BIN_COUNT);
    for _ in 0..levels {
        groups = groups.saturating_mul(u64::from(BLOCK_SIZE));
    }
    let keys = groups.saturating_mul(u64::from(BLOCK_SIZE));
    keys.min(MAX_KEYS as u64) as usize
}

/// One of the `NUM_PASSES` digit passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pass {
    index: u32,
}

impl Pass {
    pub fn new(index: u32) -> Self {
        assert!(index < NUM_PASSES);
        Pass { index }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn shift(&self) -> u32 {
        self.index * BITS_PER_PASS
    }

    pub fn source_slot(&self) -> usize {
        (self.index % 2) as usize
    }

    pub fn destination_slot(&self) -> usize {
        1 - self.source_slot()
    }
}

/// all passes, least significant digit first
pub fn passes() -> impl Iterator<Item = Pass> {
    (0..NUM_PASSES).map(Pass::new)
}

/// Two buffer slots whose source/destination roles alternate with the pass
/// parity. Slot 0 holds the input.
pub struct PingPong<T> {
    slots: [T; 2],
}

impl<T> PingPong<T> {
    pub fn new(input: T, scratch: T) -> Self {
        PingPong {
            slots: [input, scratch],
        }
    }

    /// (source, destination) of `pass`
    pub fn split(&mut self, pass: Pass) -> (&T, &mut T) {
        let (lo, hi) = self.slots.split_at_mut(1);
        match pass.source_slot() {
            0 => (&lo[0], &mut hi[0]),
            _ => (&hi[0], &mut lo[0]),
        }
    }

    pub fn slot(&self, index: usize) -> &T {
        &self.slots[index]
    }

    /// the slot holding the sorted data after all passes
    pub fn into_final(self) -> T {
        let [first, second] = self.slots;
        if FINAL_SLOT == 0 { first } else { second }
    }
}

#[test]
fn test_hierarchy() {
    // tiny input still gets one reduce level
    let h = ScanHierarchy::new(1, 1024, 1024);
    assert_eq!(h.cols(), &[1, 1]);
    assert_eq!(h.reduce_levels(), 1);
    assert_eq!(h.top_len(), 16);
    let h = ScanHierarchy::new(65536, 1024, 1024);
    assert_eq!(h.cols(), &[65536, 64]);
    assert_eq!(h.table_len(0), 16 * 65536);
    assert_eq!(h.top_len(), 1024);
    let h = ScanHierarchy::new(65537, 1024, 1024);
    assert_eq!(h.cols(), &[65537, 65, 1]);
    assert_eq!(h.reduce_levels(), 2);
}

#[test]
fn test_launch_plan_capacity() {
    let plan = LaunchPlan::new(0, 1).unwrap();
    assert_eq!(plan.num_groups, 0);
    let plan = LaunchPlan::new(1025, 1).unwrap();
    assert_eq!(plan.num_groups, 2);
    assert_eq!(plan.hierarchy.cols(), &[2, 1]);
    let plan = LaunchPlan::new(2_000_000, 1).unwrap();
    assert_eq!(plan.num_groups, 1954);
    assert_eq!(plan.hierarchy.cols(), &[1954, 2]);

    let limit = 67_108_864usize;
    assert_eq!(max_keys(1), limit);
    let plan = LaunchPlan::new(limit, 1).unwrap();
    assert_eq!(plan.hierarchy.top_len(), 1024);
    match LaunchPlan::new(limit + 1, 1) {
        Err(SortError::CapacityExceeded { len, max }) => {
            assert_eq!(len, limit + 1);
            assert_eq!(max, limit);
        }
        other => panic!("unexpected {other:?}"),
    }
    let plan = LaunchPlan::new(limit + 1, 2).unwrap();
    assert_eq!(plan.hierarchy.reduce_levels(), 2);
    assert_eq!(max_keys(2), MAX_KEYS);
    assert!(matches!(
        LaunchPlan::new(MAX_KEYS + 1, 8),
        Err(SortError::CapacityExceeded { .. })
    ));

    assert_eq!(max_keys(0), 0);
    match LaunchPlan::new(10, 0) {
        Err(SortError::CapacityExceeded { len, max }) => {
            assert_eq!(len, 10);
            assert_eq!(max, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_ping_pong() {
    assert_eq!(FINAL_SLOT, 0);
    let shifts: Vec<u32> = passes().map(|p| p.shift()).collect();
    assert_eq!(shifts, [0, 4, 8, 12, 16, 20, 24, 28]);
    let mut slots = PingPong::new(vec![1u32], vec![0u32]);
    for pass in passes() {
        let (src, dst) = slots.split(pass);
        dst.copy_from_slice(src);
        dst[0] += 1;
        assert_eq!(slots.slot(pass.destination_slot())[0], pass.index() + 2);
    }
    assert_eq!(slots.into_final(), vec![9]);
}
