fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let n = 2_000_000u32;
    let keys: Vec<u32> = (1..=n).rev().collect();
    let values: Vec<u32> = keys.iter().map(|&k| 2 * k).collect();
    tracing::info!(head = ?&keys[..8], tail = ?&keys[keys.len() - 8..], "input keys");

    let sorter = radix_cudarc::RadixSorter::new(radix_cudarc::SortConfig::from_env())?;
    let time0 = std::time::Instant::now();
    let sorted = sorter.sort(&keys, &values)?;
    tracing::info!(elapsed = ?time0.elapsed(), num_keys = n, "sorted");
    tracing::info!(head = ?&sorted.keys[..8], tail = ?&sorted.keys[sorted.keys.len() - 8..], "sorted keys");
    tracing::info!(head = ?&sorted.values[..8], tail = ?&sorted.values[sorted.values.len() - 8..], "sorted values");

    anyhow::ensure!(sorted.keys.windows(2).all(|w| w[0] <= w[1]), "keys are not sorted");
    anyhow::ensure!(
        sorted.keys.iter().zip(&sorted.values).all(|(&k, &v)| v == 2 * k),
        "values did not follow their keys"
    );
    Ok(())
}
