use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{backend::SecretCodec, error::CodecError};

/// How a stored value is represented at rest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Plain,
    /// Stored as ciphertext produced by the configured `SecretCodec`.
    Encrypted,
}

impl FieldKind {
    /// Turn a raw stored value into its usable form.
    ///
    /// Empty values are returned as-is; the codec is never invoked on them.
    pub fn reveal(self, raw: String, codec: &dyn SecretCodec) -> Result<String, CodecError> {
        match self {
            FieldKind::Encrypted if !raw.is_empty() => codec.decrypt(&raw),
            _ => Ok(raw),
        }
    }

    /// Inverse of `reveal`, applied before a keyed write.
    pub fn conceal(self, value: &str, codec: &dyn SecretCodec) -> Result<String, CodecError> {
        match self {
            FieldKind::Encrypted if !value.is_empty() => codec.encrypt(value),
            _ => Ok(value.to_string()),
        }
    }
}

/// Where reads for a key are served from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadSource {
    /// Scoped config reader, with store -> website -> default fallback.
    #[default]
    Cache,
    /// Exact lookup against the override table, bypassing the cache.
    OverrideTable,
}

/// Resolution metadata for one symbolic key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Storage-layer identifier, e.g. `core/settings/active`.
    pub path: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub source: ReadSource,
}

impl KeyDescriptor {
    pub fn plain(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FieldKind::Plain,
            source: ReadSource::Cache,
        }
    }

    pub fn encrypted(path: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Encrypted,
            ..Self::plain(path)
        }
    }

    pub fn from_override_table(mut self) -> Self {
        self.source = ReadSource::OverrideTable;
        self
    }
}

/// Immutable `key -> KeyDescriptor` table handed to the resolver at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRegistry {
    entries: BTreeMap<String, KeyDescriptor>,
}

impl KeyRegistry {
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, KeyDescriptor)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, descriptor)| (key.into(), descriptor))
                .collect(),
        }
    }

    /// Built-in keys shipped with every deployment.
    pub fn standard() -> Self {
        Self::new([
            ("api", KeyDescriptor::plain("core/env/api_url")),
            (
                "api_messaging",
                KeyDescriptor::plain("core/env/api_url_messaging"),
            ),
            ("api_v1", KeyDescriptor::plain("core/env/api_v1_url")),
            ("app_key", KeyDescriptor::plain("core/settings/app_key")),
            (
                "enable_debug",
                KeyDescriptor::plain("core/settings/enable_debug"),
            ),
            ("core_active", KeyDescriptor::plain("core/settings/active")),
            ("secret", KeyDescriptor::encrypted("core/settings/secret")),
        ])
    }

    /// Consume the registry and return one where `extra` entries replace same-named keys.
    pub fn with_overrides<K: Into<String>>(
        mut self,
        extra: impl IntoIterator<Item = (K, KeyDescriptor)>,
    ) -> Self {
        for (key, descriptor) in extra {
            self.entries.insert(key.into(), descriptor);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&KeyDescriptor> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyDescriptor)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
