use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use scopecfg_core::KeyDescriptor;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/scopecfg/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the directory holding the override table.
    pub data_dir: Option<PathBuf>,
    /// Store used when no `--scope-id` is given; falls back to the table's own default.
    pub default_store: Option<i64>,
    /// Base64 32-byte key for encrypted values; the OS keyring is used when absent.
    pub crypt_key: Option<String>,
    /// Extra or replacement registry entries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, KeyDescriptor>,
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("scopecfg").join("config.toml"))
}

/// Write the config to `path` unless a file is already there, creating parent
/// directories as needed. Never clobbers user edits.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use scopecfg_core::{FieldKind, ReadSource};

    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn returns_default_when_blank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "\n  \n").expect("write");
        assert_eq!(load_from_path(&path).expect("load"), Config::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            data_dir = "/tmp/scopecfg-data"
            default_store = 2
            crypt_key = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
            [keys.api_token]
            path = "core/env/api_token"
            kind = "encrypted"
            source = "override_table"
            [keys.region]
            path = "core/env/region"
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/scopecfg-data")));
        assert_eq!(cfg.default_store, Some(2));
        assert!(cfg.crypt_key.is_some());

        let token = &cfg.keys["api_token"];
        assert_eq!(token.path, "core/env/api_token");
        assert_eq!(token.kind, FieldKind::Encrypted);
        assert_eq!(token.source, ReadSource::OverrideTable);
        assert_eq!(cfg.keys["region"], KeyDescriptor::plain("core/env/region"));
    }

    #[test]
    fn write_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            data_dir: Some(PathBuf::from("/tmp/scopecfg-data")),
            default_store: Some(1),
            ..Config::default()
        };

        write_if_missing(&cfg, &path).expect("write should succeed");
        let other = Config::default();
        let second = write_if_missing(&other, &path).expect("second write ok");
        assert_eq!(second, path);
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
