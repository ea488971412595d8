//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ipc::DEFAULT_SOCKET_PATH;
use crate::watcher::SAVE_FILE_NAME;

/// Account folder of a default retail installation on Windows.
pub const DEFAULT_SCAN_ROOT: &str = "C:/Program Files (x86)/World of Warcraft/_retail_/WTF/Account";

/// Terminal rendering options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Colorize labels and messages.
    pub color: bool,
    /// Print whole stack traces and locals instead of the first line.
    pub expand_stacks: bool,
    /// Clear the terminal before each redraw.
    pub clear_screen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            expand_stacks: false,
            clear_screen: true,
        }
    }
}

/// Configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory scanned recursively for save files.
    pub scan_root: PathBuf,
    /// File name suffix that identifies a save file.
    pub file_name: String,
    /// Socket the display process listens on.
    pub socket_path: PathBuf,
    pub display: DisplayConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from(DEFAULT_SCAN_ROOT),
            file_name: SAVE_FILE_NAME.to_string(),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            display: DisplayConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_config_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.scan_root, PathBuf::from(DEFAULT_SCAN_ROOT));
        assert_eq!(config.file_name, "!BugGrabber.lua");
        assert_eq!(config.socket_path, PathBuf::from("/tmp/buggrabber-viewer.sock"));
        assert!(config.display.color);
        assert!(!config.display.expand_stacks);
        assert!(config.display.clear_screen);
    }

    #[test]
    fn test_partial_display_section() {
        let config: ViewerConfig = toml::from_str(
            r"
            [display]
            expand_stacks = true
            ",
        )
        .unwrap();
        assert!(config.display.expand_stacks);
        assert!(config.display.color);
        assert_eq!(config.file_name, SAVE_FILE_NAME);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ViewerConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: ViewerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
