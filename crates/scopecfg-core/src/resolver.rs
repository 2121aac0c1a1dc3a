use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::{
    backend::{
        ConfigWriter, DefaultStoreResolver, ScopedTableReader, ScopedValueReader, SecretCodec,
    },
    error::ConfigError,
    registry::{KeyDescriptor, KeyRegistry, ReadSource},
    scope::{Scope, ScopeId},
};

/// Key whose value switches the whole module on or off.
pub const ACTIVE_KEY: &str = "core_active";

/// Services the resolver delegates to. Shared so one backend can fill several roles.
#[derive(Clone)]
pub struct Collaborators {
    pub values: Arc<dyn ScopedValueReader>,
    pub table: Arc<dyn ScopedTableReader>,
    pub codec: Arc<dyn SecretCodec>,
    pub writer: Arc<dyn ConfigWriter>,
    pub stores: Arc<dyn DefaultStoreResolver>,
}

impl Collaborators {
    /// Use a single backend as fast-path reader, slow-path reader and writer.
    pub fn from_table<T>(
        table: Arc<T>,
        codec: Arc<dyn SecretCodec>,
        stores: Arc<dyn DefaultStoreResolver>,
    ) -> Self
    where
        T: ScopedValueReader + ScopedTableReader + ConfigWriter + 'static,
    {
        Self {
            values: table.clone(),
            table: table.clone(),
            codec,
            writer: table,
            stores,
        }
    }
}

/// A value to persist as-is at a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    pub path: String,
    pub value: String,
    pub scope: Scope,
}

impl ConfigValue {
    pub fn new(path: impl Into<String>, value: impl Into<String>, scope: Scope) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            scope,
        }
    }
}

/// Resolves registered keys to scoped values, decrypting secrets on the way out.
pub struct ConfigResolver {
    registry: KeyRegistry,
    backend: Collaborators,
}

impl ConfigResolver {
    pub fn new(registry: KeyRegistry, backend: Collaborators) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Whether `core_active` resolves to a truthy value. Failures read as disabled.
    pub fn is_enabled(&self, scope: Scope) -> bool {
        match self.get(ACTIVE_KEY, scope) {
            Ok(value) => value.as_deref().is_some_and(is_truthy),
            Err(err) => {
                warn!(error = %err, %scope, "could not resolve active flag, treating as disabled");
                false
            }
        }
    }

    /// Value of `key` at `scope`, or `None` when the key is unregistered or unset.
    #[instrument(skip(self))]
    pub fn get(&self, key: &str, scope: Scope) -> Result<Option<String>, ConfigError> {
        let Some(descriptor) = self.registry.get(key) else {
            debug!("key not registered");
            return Ok(None);
        };
        let scope_id = self.resolve_scope_id(scope.id)?;

        let raw = match descriptor.source {
            ReadSource::OverrideTable => {
                self.backend
                    .table
                    .fetch_one(&descriptor.path, scope.kind.table_scope(), scope_id)?
            }
            ReadSource::Cache => {
                self.backend
                    .values
                    .get_value(&descriptor.path, scope.kind, scope_id)?
            }
        };

        let Some(raw) = raw else {
            debug!(path = %descriptor.path, "no value at any scope level");
            return Ok(None);
        };

        descriptor
            .kind
            .reveal(raw, self.backend.codec.as_ref())
            .map(Some)
            .map_err(|source| ConfigError::Decryption {
                path: descriptor.path.clone(),
                source,
            })
    }

    /// Storage path registered for `key`.
    pub fn config_path(&self, key: &str) -> Result<&str, ConfigError> {
        self.descriptor(key).map(|d| d.path.as_str())
    }

    /// Remove the override for `key` at the table-level form of `scope`.
    #[instrument(skip(self))]
    pub fn delete(&self, key: &str, scope: Scope) -> Result<(), ConfigError> {
        let descriptor = self.descriptor(key)?;
        let scope_id = self.resolve_scope_id(scope.id)?;
        self.backend
            .writer
            .delete(&descriptor.path, scope.kind.table_scope(), scope_id)?;
        Ok(())
    }

    /// Write a prepared value verbatim: no key lookup, no encryption.
    #[instrument(skip_all, fields(path = %value.path, scope = %value.scope))]
    pub fn save(&self, value: &ConfigValue) -> Result<(), ConfigError> {
        let scope_id = self.resolve_scope_id(value.scope.id)?;
        self.backend.writer.save(
            &value.path,
            &value.value,
            value.scope.kind.table_scope(),
            scope_id,
        )?;
        Ok(())
    }

    /// Write `value` for a registered key, encrypting it first when the key is secret.
    #[instrument(skip(self, value))]
    pub fn save_key(&self, key: &str, value: &str, scope: Scope) -> Result<(), ConfigError> {
        let descriptor = self.descriptor(key)?;
        let scope_id = self.resolve_scope_id(scope.id)?;
        let stored = descriptor
            .kind
            .conceal(value, self.backend.codec.as_ref())
            .map_err(|source| ConfigError::Encryption {
                path: descriptor.path.clone(),
                source,
            })?;
        self.backend
            .writer
            .save(&descriptor.path, &stored, scope.kind.table_scope(), scope_id)?;
        Ok(())
    }

    fn descriptor(&self, key: &str) -> Result<&KeyDescriptor, ConfigError> {
        self.registry
            .get(key)
            .ok_or_else(|| ConfigError::unknown_key(key))
    }

    fn resolve_scope_id(&self, id: ScopeId) -> Result<i64, ConfigError> {
        match id {
            ScopeId::Explicit(id) => Ok(id),
            ScopeId::UseCurrentStore => Ok(self.backend.stores.current_store_id()?),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0"
}
