#![allow(dead_code)]

use radix_cudarc::config::{device_required, ENV_REQUIRE_DEVICE};
use radix_cudarc::{RadixSorter, SortConfig};

/// Sorter on the configured device, or `None` when the machine has no usable
/// CUDA device. With `RADIX_CUDARC_REQUIRE_DEVICE` set a missing device fails
/// the test instead.
pub fn sorter() -> Option<RadixSorter> {
    match RadixSorter::new(SortConfig::from_env()) {
        Ok(sorter) => Some(sorter),
        Err(e) if e.is_unavailable() => {
            if device_required() {
                panic!("{ENV_REQUIRE_DEVICE} is set but no device is usable: {e}");
            }
            eprintln!("SKIPPED (no CUDA device, set {ENV_REQUIRE_DEVICE}=1 to fail instead): {e}");
            None
        }
        Err(e) => panic!("{e}"),
    }
}

pub fn random_pairs(n: usize, seed: u8) -> (Vec<u32>, Vec<u32>) {
    use rand::Rng;
    use rand_chacha::rand_core::SeedableRng;
    let mut rng = rand_chacha::ChaChaRng::from_seed([seed; 32]);
    let keys = (0..n).map(|_| rng.gen()).collect();
    let values = (0..n as u32).collect();
    (keys, values)
}

/// Checks `keys_out`/`values_out` against a stable host sort of the input.
pub fn assert_sorted_pairs(
    keys_in: &[u32],
    values_in: &[u32],
    keys_out: &[u32],
    values_out: &[u32],
) {
    assert_eq!(keys_out.len(), keys_in.len());
    assert_eq!(values_out.len(), values_in.len());
    assert!(keys_out.windows(2).all(|w| w[0] <= w[1]));
    let mut pairs: Vec<(u32, u32)> = keys_in
        .iter()
        .copied()
        .zip(values_in.iter().copied())
        .collect();
    pairs.sort_by_key(|&(key, _)| key);
    let (keys_ref, values_ref): (Vec<u32>, Vec<u32>) = pairs.into_iter().unzip();
    assert_eq!(keys_out, keys_ref);
    assert_eq!(values_out, values_ref);
}
