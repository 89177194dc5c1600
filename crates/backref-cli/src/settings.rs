use std::path::{Path, PathBuf};

use anyhow::Context;
use backref_cache::CacheConfig;
use backref_store::FileStoreConfig;
use serde::Deserialize;

/// Contents of the settings file.
///
/// Cache keys sit at the top level; the store has its own table.
///
/// ```toml
/// retention = { mode = "bounded", capacity = 256 }
///
/// [store]
/// root = "/var/lib/backref"
/// fsync = true
/// ```
#[derive(Debug, Default, PartialEq)]
pub struct Settings {
    pub cache: CacheConfig,
    pub store: FileStoreConfig,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct StoreSection {
    store: FileStoreConfig,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let cache = CacheConfig::from_toml_str(text)?;
        let StoreSection { store } = toml::from_str(text).context("invalid [store] settings")?;
        Ok(Self { cache, store })
    }

    /// Read `path` if given, otherwise fall back to defaults; then apply the
    /// command-line store override.
    pub fn resolve(path: Option<&Path>, store_root: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings from {}", path.display()))?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        if let Some(root) = store_root {
            settings.store.root = root;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let settings = Settings::resolve(None, None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn parses_both_tables() {
        let settings = Settings::from_toml_str(
            "retention = { mode = \"weak\" }\n\n[store]\nroot = \"/tmp/refs\"\nfsync = false\n",
        )
        .unwrap();
        assert_eq!(settings.cache, CacheConfig::weak());
        assert_eq!(settings.store.root, PathBuf::from("/tmp/refs"));
        assert!(!settings.store.fsync);
    }

    #[test]
    fn command_line_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backref.toml");
        std::fs::write(&path, "[store]\nroot = \"from-file\"\n").unwrap();

        let settings = Settings::resolve(Some(&path), Some("from-flag".into())).unwrap();
        assert_eq!(settings.store.root, PathBuf::from("from-flag"));
        assert!(settings.store.fsync);
    }

    #[test]
    fn store_section_alone_keeps_cache_defaults() {
        let settings = Settings::from_toml_str("[store]\nfsync = false\n").unwrap();
        assert_eq!(settings.cache, CacheConfig::default());
        assert!(!settings.store.fsync);
    }

    #[test]
    fn rejects_invalid_cache_config() {
        let err = Settings::from_toml_str("retention = { mode = \"bounded\", capacity = 0 }\n");
        assert!(err.is_err());
    }
}
