//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hotkey::{parse_combination, Key};

/// Environment variable overriding the shortcuts file location
pub const SHORTCUTS_FILE_ENV: &str = "GLOBAL_SHORTCUTS_FILE";

/// Combination used when no shortcuts file exists
pub const DEFAULT_COMBINATION: &str = "LeftControl+LeftShift+K";

/// One shortcut as written in the shortcuts file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// Name reported when the shortcut fires
    pub name: String,

    /// `+`-separated key names, e.g. `"LeftControl+LeftShift+K"`
    pub keys: String,

    /// Consume the key-up that fires the shortcut
    #[serde(default)]
    pub suppress: bool,
}

impl ShortcutConfig {
    pub fn combination(&self) -> Result<Vec<Key>> {
        parse_combination(&self.keys)
            .with_context(|| format!("invalid key combination for shortcut {:?}", self.name))
    }
}

#[derive(Debug, Deserialize)]
struct ShortcutsFile {
    #[serde(default)]
    shortcuts: Vec<ShortcutConfig>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Where shortcuts were (or would have been) read from
    pub shortcuts_path: PathBuf,

    /// Shortcuts to register, each with its parsed combination
    pub shortcuts: Vec<(ShortcutConfig, Vec<Key>)>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let shortcuts_path = match std::env::var_os(SHORTCUTS_FILE_ENV) {
            Some(path) => PathBuf::from(path),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".config")
                    .join("global-shortcuts")
                    .join("shortcuts.json")
            }
        };

        Self::from_path(&shortcuts_path)
    }

    /// Load shortcuts from `path`, falling back to the default shortcut
    /// when the file does not exist
    pub fn from_path(path: &Path) -> Result<Self> {
        let shortcuts = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file: ShortcutsFile = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            file.shortcuts
        } else {
            info!(?path, "no shortcuts file, using default shortcut");
            vec![ShortcutConfig {
                name: "default".to_string(),
                keys: DEFAULT_COMBINATION.to_string(),
                suppress: false,
            }]
        };

        let shortcuts = shortcuts
            .into_iter()
            .map(|shortcut| {
                let keys = shortcut.combination()?;
                Ok((shortcut, keys))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            shortcuts_path: path.to_owned(),
            shortcuts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("global-shortcuts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_default() {
        let config = Config::from_path(Path::new("/nonexistent/shortcuts.json")).unwrap();
        assert_eq!(config.shortcuts.len(), 1);
        let (shortcut, keys) = &config.shortcuts[0];
        assert_eq!(shortcut.name, "default");
        assert_eq!(keys, &vec![Key::LeftControl, Key::LeftShift, Key::K]);
    }

    #[test]
    fn test_load_shortcuts_file() {
        let path = write_temp(
            "valid.json",
            r#"{"shortcuts": [
                {"name": "launcher", "keys": "alt+space"},
                {"name": "lock", "keys": "cmd+ctrl+Q", "suppress": true}
            ]}"#,
        );

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.shortcuts_path, path);
        assert_eq!(config.shortcuts.len(), 2);
        assert_eq!(config.shortcuts[0].1, vec![Key::LeftAlt, Key::Space]);
        assert!(!config.shortcuts[0].0.suppress);
        assert_eq!(
            config.shortcuts[1].1,
            vec![Key::LeftMeta, Key::LeftControl, Key::Q]
        );
        assert!(config.shortcuts[1].0.suppress);
    }

    #[test]
    fn test_unknown_key_fails_with_shortcut_name() {
        let path = write_temp(
            "invalid.json",
            r#"{"shortcuts": [{"name": "broken", "keys": "ctrl+hyper"}]}"#,
        );

        let err = Config::from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn test_empty_combination_fails() {
        let shortcut = ShortcutConfig {
            name: "nothing".to_string(),
            keys: String::new(),
            suppress: false,
        };
        assert!(shortcut.combination().is_err());
    }
}
