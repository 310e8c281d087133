//! Channel and server configuration

use crate::error::{Result, ShmLinkError};
use crate::frame::HEADER_LEN;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default segment key
pub const DEFAULT_KEY: i32 = 12345;

/// Default segment size (1KB)
pub const DEFAULT_SIZE: usize = 1024;

/// Default permission bits for newly created segments
pub const DEFAULT_MODE: u32 = 0o666;

/// Default polling interval
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default socket path for the transport server
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/shmlink.sock";

/// Largest request the transport server reads in one chunk
const DEFAULT_MAX_REQUEST: usize = 1024;

/// Shared memory channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Key agreed upon by every participating process
    pub key: i32,
    /// Requested size of the segment in bytes
    pub size: usize,
    /// Permission bits used when this process creates the segment
    pub mode: u32,
    /// Delay between reads while polling
    pub poll_interval_ms: u64,
    /// Request kernel-level removal when the channel closes
    pub remove_on_close: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY,
            size: DEFAULT_SIZE,
            mode: DEFAULT_MODE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            remove_on_close: true,
        }
    }
}

impl ChannelConfig {
    /// Configuration for `key` with every other field defaulted
    pub fn with_key(key: i32) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject configurations that can never carry a frame
    pub fn validate(&self) -> Result<()> {
        if self.key == libc::IPC_PRIVATE {
            return Err(ShmLinkError::InvalidConfig(
                "key 0 is IPC_PRIVATE and cannot be shared between processes".to_string(),
            ));
        }
        if self.size <= HEADER_LEN {
            return Err(ShmLinkError::InvalidConfig(format!(
                "segment size must exceed the {HEADER_LEN}-byte frame header, got {}",
                self.size
            )));
        }
        if self.mode > 0o777 {
            return Err(ShmLinkError::InvalidConfig(format!(
                "mode 0o{:o} has bits outside 0o777",
                self.mode
            )));
        }
        Ok(())
    }
}

/// Transport server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Filesystem path of the listening socket
    pub socket_path: PathBuf,
    /// Maximum bytes read per request
    pub max_request: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            max_request: DEFAULT_MAX_REQUEST,
        }
    }
}

/// TOML config file structure
///
/// ```toml
/// [channel]
/// key = 5678
/// size = 4096
///
/// [server]
/// socket_path = "/run/shmlink.sock"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub channel: ChannelConfig,
    pub server: ServerConfig,
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml(&text)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.key, 12345);
        assert_eq!(config.size, 1024);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_private_key_and_tiny_segments() {
        assert!(ChannelConfig::with_key(0).validate().is_err());

        let tiny = ChannelConfig {
            size: 4,
            ..ChannelConfig::default()
        };
        assert!(matches!(
            tiny.validate(),
            Err(ShmLinkError::InvalidConfig(_))
        ));

        let bad_mode = ChannelConfig {
            mode: 0o1666,
            ..ChannelConfig::default()
        };
        assert!(bad_mode.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [channel]
            key = 5678
            remove_on_close = false
            "#,
        )
        .unwrap();

        assert_eq!(config.channel.key, 5678);
        assert_eq!(config.channel.size, DEFAULT_SIZE);
        assert!(!config.channel.remove_on_close);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = FileConfig::from_toml("[channel]\nkey = \"nope\"").unwrap_err();
        assert!(matches!(err, ShmLinkError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/shmlink.toml"))).unwrap_err();
        assert!(matches!(err, ShmLinkError::Io(_)));
    }
}
