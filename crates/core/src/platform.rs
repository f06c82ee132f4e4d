//! Cross-platform paths.

use std::path::PathBuf;

/// Get the application data directory.
///
/// - Linux: `~/.local/share/meshtalk`
/// - Windows: `%LOCALAPPDATA%\meshtalk`
/// - macOS: `~/Library/Application Support/meshtalk`
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meshtalk")
}

/// Get the configuration directory.
///
/// - Linux: `~/.config/meshtalk`
/// - Windows: `%APPDATA%\meshtalk`
/// - macOS: `~/Library/Application Support/meshtalk`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meshtalk")
}

/// Get the path to the main config file.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Default directory for files received from neighbors.
pub fn default_received_dir() -> PathBuf {
    data_dir().join("received")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        assert!(data_dir().ends_with("meshtalk"));
        assert!(config_file_path().ends_with("meshtalk/config.json"));
        assert!(default_received_dir().starts_with(data_dir()));
    }
}
