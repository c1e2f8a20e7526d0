use cudarc::driver::DriverError;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("no CUDA device is reachable: {0}")]
    EnvironmentUnavailable(String),
    #[error("failed to open CUDA device {ordinal}: {reason}")]
    DeviceRequest { ordinal: usize, reason: String },
    #[error("device allocation failed: {0}")]
    Allocation(#[source] DriverError),
    #[error("invalid sort configuration: {0}")]
    InvalidConfig(String),
    #[error("kernel compilation failed: {0}")]
    Compile(String),
    #[error("device execution failed: {0}")]
    Submission(#[source] DriverError),
    #[error("length mismatch: keys={keys}, values={values}")]
    LengthMismatch { keys: usize, values: usize },
    #[error("{len} keys exceed the supported maximum of {max}")]
    CapacityExceeded { len: usize, max: usize },
}

impl SortError {
    /// Errors raised because there is no usable device, as opposed to a
    /// device that misbehaves.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SortError::EnvironmentUnavailable(_) | SortError::DeviceRequest { .. }
        )
    }
}

#[test]
fn test_messages() {
    let e = SortError::LengthMismatch { keys: 3, values: 2 };
    assert_eq!(e.to_string(), "length mismatch: keys=3, values=2");
    let e = SortError::CapacityExceeded { len: 10, max: 5 };
    assert_eq!(e.to_string(), "10 keys exceed the supported maximum of 5");
    assert!(SortError::EnvironmentUnavailable("none".to_string()).is_unavailable());
    assert!(!SortError::Compile("bad".to_string()).is_unavailable());
    assert!(!SortError::InvalidConfig("bad".to_string()).is_unavailable());
}
