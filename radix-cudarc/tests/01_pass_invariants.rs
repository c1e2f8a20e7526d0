mod common;

use radix_cudarc::plan::passes;
use radix_cudarc::BIN_COUNT;

#[test]
fn test_pass_tables() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    for n in [1usize, 1025, 300_000] {
        let (keys, _) = common::random_pairs(n, 5);
        let num_groups = n.div_ceil(radix_cudarc::BLOCK_SIZE as usize);
        for pass in passes() {
            let tables = sorter.inspect_pass(&keys, pass)?;
            assert_eq!(tables.histogram.len(), BIN_COUNT as usize * num_groups);
            // per bin the group counts add up to the digit total
            for bin in 0..BIN_COUNT as usize {
                let total = keys
                    .iter()
                    .filter(|&&k| radix_cudarc::reference::digit(k, pass.shift()) == bin)
                    .count();
                let row = &tables.histogram[bin * num_groups..(bin + 1) * num_groups];
                assert_eq!(row.iter().map(|&c| c as usize).sum::<usize>(), total);
            }
            // (bin, group) ranges tile [0, n) exactly once
            let mut cursor = 0u32;
            for (offset, count) in tables.offsets.iter().zip(&tables.histogram) {
                assert_eq!(*offset, cursor);
                cursor += count;
            }
            assert_eq!(cursor as usize, n);
        }
    }
    Ok(())
}
