//! Error types for shmlink

use rustix::io::Errno;
use std::io;
use thiserror::Error;

/// Result type for shmlink operations
pub type Result<T> = std::result::Result<T, ShmLinkError>;

/// Errors that can occur in shmlink operations
#[derive(Debug, Error)]
pub enum ShmLinkError {
    /// Failed to create or attach to a segment for a reason other than "already exists"
    #[error("Failed to acquire shared memory segment for key {key}: {source}")]
    Acquire {
        key: i32,
        #[source]
        source: Errno,
    },

    /// Failed to query segment metadata after acquiring it
    #[error("Failed to stat shared memory segment for key {key}: {source}")]
    Stat {
        key: i32,
        #[source]
        source: Errno,
    },

    /// Failed to map a segment into the address space
    #[error("Failed to map shared memory segment for key {key}: {source}")]
    Map {
        key: i32,
        #[source]
        source: Errno,
    },

    /// The handle is already mapped
    #[error("Shared memory segment for key {key} is already mapped")]
    AlreadyMapped { key: i32 },

    /// The handle has been released and can no longer be used
    #[error("Shared memory segment for key {key} has been released")]
    Detached { key: i32 },

    /// The handle was acquired but never mapped
    #[error("Shared memory segment for key {key} is not mapped")]
    NotMapped { key: i32 },

    /// Best-effort removal failed. Only ever logged.
    #[error("Failed to remove shared memory segment for key {key}: {source}")]
    Remove {
        key: i32,
        #[source]
        source: Errno,
    },

    /// An access fell outside the mapped region
    #[error("Access out of bounds: offset {offset} + {len} bytes exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Encoded frame does not fit
    #[error("Frame too large: max {max} bytes, got {got} bytes")]
    FrameTooLarge { max: usize, got: usize },

    /// Payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame payload is not valid UTF-8
    #[error("Frame payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// Frame payload is not a valid document
    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShmLinkError {
    /// Bytes were present but did not form a valid payload.
    ///
    /// These are recoverable: a poller skips them and tries again on the
    /// next interval.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::InvalidUtf8(_) | Self::Decode(_))
    }
}
