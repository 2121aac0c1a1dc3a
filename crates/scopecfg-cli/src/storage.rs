use std::{path::PathBuf, sync::Arc};

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use scopecfg_core::{
    memory::FixedStoreResolver, Collaborators, ConfigResolver, DefaultStoreResolver, KeyRegistry,
    SecretCodec,
};
use scopecfg_storage::{
    aes_codec::AesGcmCodec,
    file_table::FileConfigTable,
    key_provider::{KeyMaterial, KeyringProvider, StaticKeyProvider},
};
use tracing::debug;

const TABLE_FILE: &str = "config-table.json";

/// Resolve the default data directory for scopecfg.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("scopecfg"))
}

/// Location of the override table, honoring the config's `data_dir`.
pub fn table_path(config: &Config) -> Result<PathBuf> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    Ok(root.join(TABLE_FILE))
}

/// Build the production resolver: file-backed table plus AES-GCM codec.
pub fn build_resolver(config: &Config) -> Result<ConfigResolver> {
    let codec: Arc<dyn SecretCodec> = match &config.crypt_key {
        Some(encoded) => {
            let material = KeyMaterial::from_encoded("config", encoded)?;
            Arc::new(AesGcmCodec::new(StaticKeyProvider::new(material)))
        }
        None => Arc::new(AesGcmCodec::new(KeyringProvider::new(
            "scopecfg",
            "crypt-key",
        ))),
    };
    resolver_with_codec(config, codec)
}

/// Open the JSON override table at the configured location.
pub fn open_table(config: &Config) -> Result<FileConfigTable> {
    let path = table_path(config)?;
    debug!(?path, "opening override table");
    Ok(FileConfigTable::new(path))
}

fn resolver_with_codec(config: &Config, codec: Arc<dyn SecretCodec>) -> Result<ConfigResolver> {
    let table = Arc::new(open_table(config)?);

    let stores: Arc<dyn DefaultStoreResolver> = match config.default_store {
        Some(id) => Arc::new(FixedStoreResolver(id)),
        None => table.clone(),
    };
    let registry = KeyRegistry::standard().with_overrides(config.keys.clone());

    Ok(ConfigResolver::new(
        registry,
        Collaborators::from_table(table, codec, stores),
    ))
}

/// Helper for tests: a resolver rooted at a temp dir with an in-memory key.
#[cfg(test)]
pub fn test_resolver(config: &Config) -> ConfigResolver {
    use scopecfg_storage::key_provider::InMemoryKeyProvider;

    resolver_with_codec(
        config,
        Arc::new(AesGcmCodec::new(InMemoryKeyProvider::default())),
    )
    .expect("test resolver")
}
