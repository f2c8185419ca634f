//! Error and status types for configuring and running the block averager.

use std::fmt;

/// Which configuration parameter a rejected value was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    WindowSize,
    BlockSize,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::WindowSize => write!(f, "window size"),
            Parameter::BlockSize => write!(f, "block size"),
        }
    }
}

/// Errors reported by configuration requests. None of them escape the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageError {
    /// A window or block size that is zero, negative, or not a number.
    /// The engine keeps whatever configuration it had.
    InvalidParameter { parameter: Parameter, value: f64 },

    /// History storage could not be obtained. The engine is left in the failed state
    /// and emits silence until the next successful configuration.
    AllocationFailure { window_size: usize, block_size: usize },

    /// The control to audio command queue had no free slot; nothing was changed.
    QueueFull,
}

impl AverageError {
    /// Whether the host should recompile its signal chain after this error.
    ///
    /// A failed engine cannot be wired into a running chain, so allocation failures
    /// ask the host to rebuild scheduling once storage may be available again.
    pub fn requires_chain_refresh(&self) -> bool {
        matches!(self, AverageError::AllocationFailure { .. })
    }
}

impl fmt::Display for AverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AverageError::InvalidParameter { parameter, value } => {
                write!(f, "Invalid parameter: {} must be a positive number, got {}", parameter, value)
            }
            AverageError::AllocationFailure { window_size, block_size } => write!(
                f,
                "Allocation failure: cannot allocate history of {} blocks x {} samples",
                window_size, block_size
            ),
            AverageError::QueueFull => write!(f, "Command queue full: request dropped"),
        }
    }
}

impl std::error::Error for AverageError {}

/// Why a tick produced silence instead of an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No history has been allocated yet, or it was released.
    Unconfigured,
    /// The last configuration attempt failed to allocate.
    Failed,
    /// The block handed in does not match the configured block size.
    BlockSizeMismatch,
}

/// Outcome of one `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Processed,
    Skipped(SkipReason),
}

impl ProcessStatus {
    pub fn is_processed(&self) -> bool {
        matches!(self, ProcessStatus::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_allocation_failure_requires_refresh() {
        let alloc = AverageError::AllocationFailure { window_size: 4, block_size: 64 };
        let invalid = AverageError::InvalidParameter { parameter: Parameter::WindowSize, value: 0.0 };
        assert!(alloc.requires_chain_refresh());
        assert!(!invalid.requires_chain_refresh());
        assert!(!AverageError::QueueFull.requires_chain_refresh());
    }

    #[test]
    fn test_display_names_the_parameter() {
        let err = AverageError::InvalidParameter { parameter: Parameter::BlockSize, value: -3.0 };
        let msg = err.to_string();
        assert!(msg.contains("block size"), "{}", msg);
        assert!(msg.contains("-3"), "{}", msg);
    }

    #[test]
    fn test_process_status_is_processed() {
        assert!(ProcessStatus::Processed.is_processed());
        assert!(!ProcessStatus::Skipped(SkipReason::Failed).is_processed());
    }
}
