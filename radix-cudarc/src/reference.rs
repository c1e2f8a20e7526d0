//! Host model of the five kernels.
//!
//! Each function reproduces the block/lane decomposition of its kernel
//! (bin-major tables, 1024-entry chunks, the byte-packed 2-bit split of the
//! scatter kernel) so that device results can be compared table by table.

use crate::plan::{passes, LaunchPlan, PingPong};
use crate::{BIN_COUNT, BITS_PER_PASS, BLOCK_SIZE, WORKGROUP_SIZE};

const BINS: usize = BIN_COUNT as usize;
const BLOCK: usize = BLOCK_SIZE as usize;
const LANES: usize = WORKGROUP_SIZE as usize;

pub fn digit(key: u32, shift: u32) -> usize {
    ((key >> shift) & (BIN_COUNT - 1)) as usize
}

fn num_groups(num_keys: usize) -> usize {
    num_keys.div_ceil(BLOCK)
}

/// bin-major digit counts, `counts[bin * num_groups + group]`
pub fn histogram(keys: &[u32], shift: u32) -> Vec<u32> {
    let num_groups = num_groups(keys.len());
    let mut counts = vec![0u32; BINS * num_groups];
    for (group, chunk) in keys.chunks(BLOCK).enumerate() {
        for &key in chunk {
            counts[digit(key, shift) * num_groups + group] += 1;
        }
    }
    counts
}

/// chunk sums of a bin-major table with `cols_in` entries per bin
pub fn reduce(counts: &[u32], cols_in: usize, cols_out: usize) -> Vec<u32> {
    assert_eq!(counts.len(), BINS * cols_in);
    (0..BINS * cols_out)
        .map(|group| {
            let row = &counts[(group / cols_out) * cols_in..][..cols_in];
            row.iter().skip((group % cols_out) * BLOCK).take(BLOCK).sum()
        })
        .collect()
}

pub fn exclusive_scan(table: &mut [u32]) {
    let mut sum = 0u32;
    for v in table.iter_mut() {
        let tmp = *v;
        *v = sum;
        sum += tmp;
    }
}

/// local exclusive scan of every chunk plus the chunk base from `reduced`
pub fn scan_add(counts: &mut [u32], reduced: &[u32], cols_in: usize, cols_out: usize) {
    assert_eq!(counts.len(), BINS * cols_in);
    assert_eq!(reduced.len(), BINS * cols_out);
    for (bin, row) in counts.chunks_mut(cols_in.max(1)).enumerate() {
        for (chunk_index, chunk) in row.chunks_mut(BLOCK).enumerate() {
            let mut sum = reduced[bin * cols_out + chunk_index];
            for v in chunk.iter_mut() {
                let tmp = *v;
                *v = sum;
                sum += tmp;
            }
        }
    }
}

/// Offsets table of one pass: histogram turned into global offsets through
/// the same hierarchy as the device.
pub fn global_offsets(keys: &[u32], shift: u32, plan: &LaunchPlan) -> Vec<u32> {
    let cols = plan.hierarchy.cols();
    let mut tables = vec![histogram(keys, shift)];
    for level in 0..plan.hierarchy.reduce_levels() {
        let next = reduce(&tables[level], cols[level] as usize, cols[level + 1] as usize);
        tables.push(next);
    }
    if let Some(top) = tables.last_mut() {
        exclusive_scan(top);
    }
    for level in (0..plan.hierarchy.reduce_levels()).rev() {
        let (lower, upper) = tables.split_at_mut(level + 1);
        scan_add(
            &mut lower[level],
            &upper[0],
            cols[level] as usize,
            cols[level + 1] as usize,
        );
    }
    tables.swap_remove(0)
}

/// One stable 4-way split of a chunk by the 2-bit sub-digit at `bit_shift`.
fn split_two_bits(keys: &mut [u32; LANES], values: &mut [u32; LANES], shift: u32, bit_shift: u32) {
    let bit_key = |key: u32| (digit(key, shift) as u32 >> bit_shift) & 3;
    let mut scratch = [0u32; LANES];
    let mut sum = 0u32;
    for (lane, &key) in keys.iter().enumerate() {
        sum = sum.wrapping_add(1u32 << (bit_key(key) * 8));
        scratch[lane] = sum;
    }
    let total = scratch[LANES - 1];
    let lower = (total << 8).wrapping_add(total << 16).wrapping_add(total << 24);
    let mut sorted_keys = [0u32; LANES];
    let mut sorted_values = [0u32; LANES];
    for lane in 0..LANES {
        let mut local_sum = lower;
        if lane > 0 {
            local_sum = local_sum.wrapping_add(scratch[lane - 1]);
        }
        let key_offset = ((local_sum >> (bit_key(keys[lane]) * 8)) & 0xff) as usize;
        sorted_keys[key_offset] = keys[lane];
        sorted_values[key_offset] = values[lane];
    }
    *keys = sorted_keys;
    *values = sorted_values;
}

/// Writes every element to `offsets[digit]` plus its rank within the group.
pub fn scatter(
    src_keys: &[u32],
    src_values: &[u32],
    offsets: &[u32],
    dst_keys: &mut [u32],
    dst_values: &mut [u32],
    shift: u32,
) {
    let num_keys = src_keys.len();
    let num_groups = num_groups(num_keys);
    assert_eq!(offsets.len(), BINS * num_groups);
    for group in 0..num_groups {
        let mut bin_offset_cache = [0u32; BINS];
        for (bin, cache) in bin_offset_cache.iter_mut().enumerate() {
            *cache = offsets[bin * num_groups + group];
        }
        for i in 0..BLOCK / LANES {
            let base = group * BLOCK + i * LANES;
            let mut keys = [u32::MAX; LANES];
            let mut values = [0u32; LANES];
            for lane in 0..LANES {
                if base + lane < num_keys {
                    keys[lane] = src_keys[base + lane];
                    values[lane] = src_values[base + lane];
                }
            }
            for bit_shift in (0..BITS_PER_PASS).step_by(2) {
                split_two_bits(&mut keys, &mut values, shift, bit_shift);
            }
            let mut local_histogram = [0u32; BINS];
            for &key in &keys {
                local_histogram[digit(key, shift)] += 1;
            }
            let mut inclusive = local_histogram;
            for bin in 1..BINS {
                inclusive[bin] += inclusive[bin - 1];
            }
            for lane in 0..LANES {
                let d = digit(keys[lane], shift);
                let mut local_offset = lane as u32;
                if d > 0 {
                    local_offset -= inclusive[d - 1];
                }
                let total_offset = (bin_offset_cache[d] + local_offset) as usize;
                if total_offset < num_keys {
                    dst_keys[total_offset] = keys[lane];
                    dst_values[total_offset] = values[lane];
                }
            }
            for (cache, count) in bin_offset_cache.iter_mut().zip(local_histogram) {
                *cache += count;
            }
        }
    }
}

/// Full eight-pass sort through the host model.
///
/// Panics when the lengths differ or exceed [`crate::plan::MAX_KEYS`].
pub fn sort_pairs(keys: &[u32], values: &[u32]) -> (Vec<u32>, Vec<u32>) {
    assert_eq!(keys.len(), values.len());
    let n = keys.len();
    if n == 0 {
        return (vec![], vec![]);
    }
    let plan = LaunchPlan::new(n, usize::MAX).expect("key count within u32 range");
    let mut key_slots = PingPong::new(keys.to_vec(), vec![0u32; n]);
    let mut value_slots = PingPong::new(values.to_vec(), vec![0u32; n]);
    for pass in passes() {
        let (src_keys, dst_keys) = key_slots.split(pass);
        let (src_values, dst_values) = value_slots.split(pass);
        let offsets = global_offsets(src_keys, pass.shift(), &plan);
        scatter(src_keys, src_values, &offsets, dst_keys, dst_values, pass.shift());
    }
    (key_slots.into_final(), value_slots.into_final())
}

#[cfg(test)]
fn random_pairs(n: usize, key_mask: u32, seed: u8) -> (Vec<u32>, Vec<u32>) {
    use rand::Rng;
    use rand_chacha::rand_core::SeedableRng;
    let mut rng = rand_chacha::ChaChaRng::from_seed([seed; 32]);
    let keys: Vec<u32> = (0..n).map(|_| rng.gen::<u32>() & key_mask).collect();
    let values: Vec<u32> = (0..n as u32).collect();
    (keys, values)
}

#[test]
fn test_histogram_sums() {
    for n in [1usize, 13, 1023, 1024, 1025, 5000] {
        let (keys, _) = random_pairs(n, u32::MAX, 1);
        for pass in passes() {
            let counts = histogram(&keys, pass.shift());
            let num_groups = num_groups(n);
            assert_eq!(counts.len(), BINS * num_groups);
            for bin in 0..BINS {
                let expected = keys.iter().filter(|&&k| digit(k, pass.shift()) == bin).count();
                let row: u32 = counts[bin * num_groups..][..num_groups].iter().sum();
                assert_eq!(row as usize, expected);
            }
            assert_eq!(counts.iter().sum::<u32>() as usize, n);
        }
    }
}

#[test]
fn test_reduce_and_scan_add() {
    let cols_in = 2500usize;
    let cols_out = cols_in.div_ceil(BLOCK);
    let counts: Vec<u32> = (0..BINS * cols_in).map(|i| (i % 7) as u32).collect();
    let mut reduced = reduce(&counts, cols_in, cols_out);
    assert_eq!(reduced.len(), BINS * cols_out);
    assert_eq!(reduced.iter().sum::<u32>(), counts.iter().sum::<u32>());
    exclusive_scan(&mut reduced);
    let mut offsets = counts.clone();
    scan_add(&mut offsets, &reduced, cols_in, cols_out);
    let mut expected = counts.clone();
    exclusive_scan(&mut expected);
    assert_eq!(offsets, expected);
}

#[test]
fn test_global_offsets_bijection() {
    for n in [1usize, 1000, 1025, 70_000] {
        let (keys, _) = random_pairs(n, 0xff, 2);
        let plan = LaunchPlan::new(n, 1).unwrap();
        let shift = 4;
        let counts = histogram(&keys, shift);
        let offsets = global_offsets(&keys, shift, &plan);
        let groups = plan.num_groups as usize;
        let mut covered = vec![false; n];
        for bin in 0..BINS {
            for group in 0..groups {
                let start = offsets[bin * groups + group] as usize;
                for rank in 0..counts[bin * groups + group] as usize {
                    assert!(!covered[start + rank]);
                    covered[start + rank] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }
}

#[test]
fn test_split_two_bits_all_same_sub_bin() {
    // 256 equal sub-digits overflow their byte of the packed counter
    let mut keys = [0u32; LANES];
    let mut values: [u32; LANES] = std::array::from_fn(|i| i as u32);
    split_two_bits(&mut keys, &mut values, 0, 0);
    assert!(values.iter().enumerate().all(|(i, &v)| v == i as u32));
    let mut keys: [u32; LANES] = std::array::from_fn(|i| if i < 255 { 3 } else { 0 });
    let mut values: [u32; LANES] = std::array::from_fn(|i| i as u32);
    split_two_bits(&mut keys, &mut values, 0, 0);
    assert_eq!(keys[0], 0);
    assert_eq!(values[0], 255);
    assert!(keys[1..].iter().all(|&k| k == 3));
    assert!(values[1..].iter().enumerate().all(|(i, &v)| v == i as u32));
}

#[test]
fn test_sort_pairs() {
    for n in [0usize, 1, 13, 1023, 1024, 1025, 3000, 1024 * 70 + 5] {
        for key_mask in [u32::MAX, 0xf, 0xf0f0] {
            let (keys, values) = random_pairs(n, key_mask, 3);
            let (sorted_keys, sorted_values) = sort_pairs(&keys, &values);
            let mut idx: Vec<u32> = values.clone();
            idx.sort_by_key(|&i| keys[i as usize]); // stable
            let expected_keys: Vec<u32> = idx.iter().map(|&i| keys[i as usize]).collect();
            assert_eq!(sorted_keys, expected_keys, "n={n} mask={key_mask:x}");
            assert_eq!(sorted_values, idx, "n={n} mask={key_mask:x}");
        }
    }
}

#[test]
fn test_sort_pairs_scenarios() {
    let keys: Vec<u32> = (1..=1000).rev().collect();
    let values: Vec<u32> = keys.iter().map(|k| k * 2).collect();
    let (k, v) = sort_pairs(&keys, &values);
    assert_eq!(k, (1..=1000).collect::<Vec<u32>>());
    assert_eq!(v, (1..=1000).map(|k| k * 2).collect::<Vec<u32>>());

    let keys = vec![42u32; 1000];
    let values: Vec<u32> = (0..1000).collect();
    let (k, v) = sort_pairs(&keys, &values);
    assert_eq!(k, keys);
    assert_eq!(v, values);

    // already sorted input stays put
    let (k2, v2) = sort_pairs(&k, &v);
    assert_eq!((k2, v2), (k, v));

    // maximal keys are real data, not padding
    let keys = vec![u32::MAX, 0, u32::MAX, 1, u32::MAX];
    let values = vec![0u32, 1, 2, 3, 4];
    let (k, v) = sort_pairs(&keys, &values);
    assert_eq!(k, [0, 1, u32::MAX, u32::MAX, u32::MAX]);
    assert_eq!(v, [1, 3, 0, 2, 4]);
}

#[test]
fn test_two_level_offsets() {
    let hierarchy = crate::ScanHierarchy::new(70_000, BLOCK_SIZE, BLOCK_SIZE);
    assert_eq!(hierarchy.cols(), &[70_000, 69, 1]);
    let cols: Vec<usize> = hierarchy.cols().iter().map(|&c| c as usize).collect();
    let counts: Vec<u32> = (0..BINS * cols[0]).map(|i| ((i * 7) % 13) as u32).collect();
    let mut tables = vec![counts.clone()];
    for level in 0..hierarchy.reduce_levels() {
        let next = reduce(&tables[level], cols[level], cols[level + 1]);
        tables.push(next);
    }
    exclusive_scan(&mut tables[hierarchy.reduce_levels()]);
    for level in (0..hierarchy.reduce_levels()).rev() {
        let (lower, upper) = tables.split_at_mut(level + 1);
        scan_add(&mut lower[level], &upper[0], cols[level], cols[level + 1]);
    }
    let mut expected = counts;
    exclusive_scan(&mut expected);
    assert_eq!(tables[0], expected);
}
