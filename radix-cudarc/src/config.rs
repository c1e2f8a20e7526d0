/// Host-side settings of a [`crate::RadixSorter`].
///
/// The digit width, pass count and block geometry are compile-time constants
/// (see the crate root); only the device and the depth of the scan hierarchy
/// are chosen at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// CUDA device ordinal
    pub device_ordinal: usize,
    /// Maximum number of reduce levels between the histogram table and the
    /// single-block scan. One level supports up to 2^26 keys.
    pub max_reduce_levels: usize,
}

pub const ENV_DEVICE: &str = "RADIX_CUDARC_DEVICE";
pub const ENV_MAX_REDUCE_LEVELS: &str = "RADIX_CUDARC_MAX_REDUCE_LEVELS";
/// When set (to anything but empty, `0` or `false`), device tests fail
/// instead of skipping on a machine without a usable CUDA device.
pub const ENV_REQUIRE_DEVICE: &str = "RADIX_CUDARC_REQUIRE_DEVICE";

/// Whether device tests must fail rather than skip without a device.
pub fn device_required() -> bool {
    device_required_from(|name| std::env::var(name).ok())
}

fn device_required_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(ENV_REQUIRE_DEVICE)
        .map(|v| !matches!(v.trim(), "" | "0" | "false"))
        .unwrap_or(false)
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            device_ordinal: 0,
            max_reduce_levels: 1,
        }
    }
}

impl SortConfig {
    /// Defaults overridden by `RADIX_CUDARC_DEVICE` and
    /// `RADIX_CUDARC_MAX_REDUCE_LEVELS`. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// The scan needs at least one reduce level below it.
    pub fn validate(&self) -> Result<(), crate::SortError> {
        if self.max_reduce_levels == 0 {
            return Err(crate::SortError::InvalidConfig(
                "max_reduce_levels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = SortConfig::default();
        if let Some(ordinal) = lookup(ENV_DEVICE).and_then(|v| v.trim().parse().ok()) {
            config.device_ordinal = ordinal;
        }
        if let Some(levels) = lookup(ENV_MAX_REDUCE_LEVELS)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&v| v >= 1)
        {
            config.max_reduce_levels = levels;
        }
        config
    }
}

#[test]
fn test_from_lookup() {
    let config = SortConfig::from_lookup(|_| None);
    assert_eq!(config, SortConfig::default());
    let config = SortConfig::from_lookup(|name| match name {
        ENV_DEVICE => Some("2".to_string()),
        ENV_MAX_REDUCE_LEVELS => Some(" 3 ".to_string()),
        _ => None,
    });
    assert_eq!(config.device_ordinal, 2);
    assert_eq!(config.max_reduce_levels, 3);
    // zero levels cannot feed the scan, keep the default
    let config = SortConfig::from_lookup(|name| match name {
        ENV_MAX_REDUCE_LEVELS => Some("0".to_string()),
        ENV_DEVICE => Some("gpu".to_string()),
        _ => None,
    });
    assert_eq!(config, SortConfig::default());
}

#[test]
fn test_validate() {
    assert!(SortConfig::default().validate().is_ok());
    let config = SortConfig {
        max_reduce_levels: 0,
        ..SortConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(crate::SortError::InvalidConfig(_))
    ));
    // rejected before any device is touched
    assert!(matches!(
        crate::RadixSorter::new(config),
        Err(crate::SortError::InvalidConfig(_))
    ));
}

#[test]
fn test_device_required() {
    assert!(!device_required_from(|_| None));
    for (value, required) in [("1", true), ("yes", true), ("0", false), ("", false), ("false", false)] {
        let lookup = |name: &str| (name == ENV_REQUIRE_DEVICE).then(|| value.to_string());
        assert_eq!(device_required_from(lookup), required, "{value:?}");
    }
}
