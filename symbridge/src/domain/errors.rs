//! Structured error types for symbridge
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Library identifier must not be empty")]
    EmptyLibrary,

    #[error("Failed to start resolver {}: {source}", .resolver.display())]
    Spawn {
        resolver: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Resolver {0} stream was not captured")]
    StreamUnavailable(&'static str),

    #[error("Resolver process is not running")]
    NotRunning,

    #[error("Resolver closed its output before answering")]
    EndOfStream,

    #[error("Resolver did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace dump is {len} bytes, not a whole number of {record_size}-byte records")]
    Truncated { len: usize, record_size: usize },

    #[error("Trace slot {slot} has invalid meta word 0x{meta:08x}")]
    InvalidMeta { slot: usize, meta: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ResolverError {
    /// Startup failures: the handle never reached the running state.
    #[must_use]
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Self::EmptyLibrary | Self::Spawn { .. } | Self::StreamUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_display() {
        let err = ResolverError::Spawn {
            resolver: PathBuf::from("/opt/tools/bin/arm-none-eabi-addr2line"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        let msg = err.to_string();
        assert!(msg.contains("arm-none-eabi-addr2line"));
        assert!(msg.contains("No such file or directory"));
        assert!(err.is_startup_failure());
    }

    #[test]
    fn test_query_errors_are_not_startup_failures() {
        assert!(!ResolverError::EndOfStream.is_startup_failure());
        assert!(!ResolverError::NotRunning.is_startup_failure());
        assert!(!ResolverError::Timeout(Duration::from_millis(5)).is_startup_failure());
    }

    #[test]
    fn test_trace_error_display() {
        let err = TraceError::InvalidMeta { slot: 3, meta: 0x13 };
        assert_eq!(err.to_string(), "Trace slot 3 has invalid meta word 0x00000013");

        let err = TraceError::Truncated { len: 30, record_size: 24 };
        assert!(err.to_string().contains("30 bytes"));
    }

    #[test]
    fn test_stream_unavailable_display() {
        let err = ResolverError::StreamUnavailable("stdin");
        assert_eq!(err.to_string(), "Resolver stdin stream was not captured");
    }
}
