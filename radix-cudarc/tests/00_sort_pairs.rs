mod common;

#[test]
fn test_reverse_ordered() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let keys: Vec<u32> = (1..=1000u32).rev().collect();
    let values: Vec<u32> = keys.iter().map(|&k| 2 * k).collect();
    let sorted = sorter.sort(&keys, &values)?;
    assert_eq!(sorted.keys, (1..=1000u32).collect::<Vec<_>>());
    assert_eq!(sorted.values, (1..=1000u32).map(|k| 2 * k).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_equal_keys_are_stable() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let keys = vec![42u32; 1000];
    let values: Vec<u32> = (0..1000).collect();
    let sorted = sorter.sort(&keys, &values)?;
    assert_eq!(sorted.keys, keys);
    assert_eq!(sorted.values, values);
    Ok(())
}

#[test]
fn test_random_two_million() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let (keys, values) = common::random_pairs(2_000_000, 7);
    let sorted = sorter.sort(&keys, &values)?;
    common::assert_sorted_pairs(&keys, &values, &sorted.keys, &sorted.values);
    Ok(())
}

#[test]
fn test_boundary_sizes() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let empty = sorter.sort(&[], &[])?;
    assert!(empty.keys.is_empty());
    let single = sorter.sort(&[0xdead_beef], &[5])?;
    assert_eq!(single.keys, [0xdead_beef]);
    assert_eq!(single.values, [5]);
    for n in [2usize, 13, 1023, 1024, 1025, 3000, 1024 * 1024 - 1, 1024 * 1024 + 1] {
        let (keys, values) = common::random_pairs(n, n as u8);
        let sorted = sorter.sort(&keys, &values)?;
        common::assert_sorted_pairs(&keys, &values, &sorted.keys, &sorted.values);
    }
    Ok(())
}

#[test]
fn test_maximal_keys_next_to_padding() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    // padding lanes carry u32::MAX too; real maximal keys must still land at the end
    let n = 1500;
    let keys: Vec<u32> = (0..n as u32)
        .map(|i| if i % 3 == 0 { u32::MAX } else { i })
        .collect();
    let values: Vec<u32> = (0..n as u32).collect();
    let sorted = sorter.sort(&keys, &values)?;
    common::assert_sorted_pairs(&keys, &values, &sorted.keys, &sorted.values);
    Ok(())
}

#[test]
fn test_idempotent() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let (keys, values) = common::random_pairs(100_000, 3);
    let once = sorter.sort(&keys, &values)?;
    let twice = sorter.sort(&once.keys, &once.values)?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_sort_device() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    let (keys, values) = common::random_pairs(50_000, 11);
    let stream = sorter.stream();
    let keys_dev = stream.memcpy_stod(&keys)?;
    let values_dev = stream.memcpy_stod(&values)?;
    let (keys_dev, values_dev) = sorter.sort_device(keys_dev, values_dev)?;
    let keys_out = stream.memcpy_dtov(&keys_dev)?;
    let values_out = stream.memcpy_dtov(&values_dev)?;
    common::assert_sorted_pairs(&keys, &values, &keys_out, &values_out);
    Ok(())
}

#[test]
fn test_errors() -> anyhow::Result<()> {
    let Some(sorter) = common::sorter() else {
        return Ok(());
    };
    assert!(matches!(
        sorter.sort(&[1, 2], &[1]),
        Err(radix_cudarc::SortError::LengthMismatch { keys: 2, values: 1 })
    ));
    let limit = radix_cudarc::plan::max_keys(sorter.config().max_reduce_levels);
    if limit < radix_cudarc::plan::MAX_KEYS {
        let stream = sorter.stream();
        let keys_dev = stream.alloc_zeros::<u32>(limit + 1)?;
        let values_dev = stream.alloc_zeros::<u32>(limit + 1)?;
        match sorter.sort_device(keys_dev, values_dev) {
            Err(radix_cudarc::SortError::CapacityExceeded { len, max }) => {
                assert_eq!(len, limit + 1);
                assert_eq!(max, limit);
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
    Ok(())
}
