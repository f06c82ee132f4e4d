//! Configuration management for a mesh node.

use crate::error::{Error, Result};
use crate::platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of message/command ids remembered for flood control.
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

/// Default maximum message body length (10KB).
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10 * 1024;

/// What to do with a private message whose conversation is not open.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrivatePolicy {
    /// Store it in the partner's log and bump the unread counter.
    #[default]
    UnreadOnly,
    /// Same as `UnreadOnly`, and also show it in the global log
    /// marked as private.
    MirrorToGlobal,
}

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name advertised to neighbors and used for private routing.
    pub nickname: String,

    /// How many ids the dedup cache keeps before evicting the oldest.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Handling of private messages for conversations that are not open.
    #[serde(default)]
    pub private_policy: PrivatePolicy,

    /// Directory where completed incoming file transfers are moved.
    #[serde(default = "platform::default_received_dir")]
    pub received_dir: PathBuf,

    /// Maximum accepted message body, in bytes.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_dedup_capacity() -> usize {
    DEFAULT_DEDUP_CAPACITY
}

fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nickname: "Unknown".to_string(),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            private_policy: PrivatePolicy::default(),
            received_dir: platform::default_received_dir(),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

impl Config {
    /// Create a default configuration with the given nickname.
    pub fn with_nickname(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the default config file.
    pub fn load() -> Result<Self> {
        let config_path = platform::config_file_path();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = serde_json::from_str(&contents)?;
            config.fix_invalid_values();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Fix any invalid or empty values with sensible defaults.
    fn fix_invalid_values(&mut self) {
        if self.dedup_capacity == 0 {
            self.dedup_capacity = DEFAULT_DEDUP_CAPACITY;
        }
        if self.max_message_length == 0 {
            self.max_message_length = DEFAULT_MAX_MESSAGE_LENGTH;
        }
        if self.received_dir.as_os_str().is_empty() {
            self.received_dir = platform::default_received_dir();
        }
    }

    /// Save configuration to the default config file.
    pub fn save(&mut self) -> Result<()> {
        self.fix_invalid_values();
        self.validate()?;

        let config_path = platform::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Load configuration from environment variables, falling back to file/defaults.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;

        if let Ok(nickname) = std::env::var("MESHTALK_NICKNAME") {
            config.nickname = nickname;
        }

        if let Ok(dir) = std::env::var("MESHTALK_RECEIVED_DIR") {
            config.received_dir = PathBuf::from(dir);
        }

        config.fix_invalid_values();
        Ok(config)
    }

    /// Check that the configuration can be used to start a node.
    pub fn validate(&self) -> Result<()> {
        crate::neighbors::validate_nickname(&self.nickname)?;
        if self.dedup_capacity == 0 {
            return Err(Error::Config("dedup_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
