//! Collaborator contracts the resolver is composed from.
//! Hosts provide the implementations; `crate::memory` has in-process ones for tests.

use crate::{
    error::{CodecError, StorageError, StoreResolutionError},
    scope::{ScopeKind, TableScope},
};

/// Fast-path scoped lookup (the host's config cache).
pub trait ScopedValueReader: Send + Sync {
    /// Value visible at `scope`/`scope_id`, falling back to broader scopes.
    fn get_value(
        &self,
        path: &str,
        scope: ScopeKind,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError>;
}

/// Slow-path exact lookup against the override table.
pub trait ScopedTableReader: Send + Sync {
    /// Row matching `path`, `scope` and `scope_id` exactly. No fallback.
    ///
    /// Implementations return `Ok(None)` when no row matches or the table is not there.
    fn fetch_one(
        &self,
        path: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError>;
}

/// Converts stored secrets to and from their at-rest form.
pub trait SecretCodec: Send + Sync {
    fn decrypt(&self, raw: &str) -> Result<String, CodecError>;

    fn encrypt(&self, value: &str) -> Result<String, CodecError>;
}

/// Persists overrides.
pub trait ConfigWriter: Send + Sync {
    /// Insert or replace the value at `path`/`scope`/`scope_id`.
    fn save(
        &self,
        path: &str,
        value: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<(), StorageError>;

    /// Remove an override (idempotent).
    fn delete(&self, path: &str, scope: TableScope, scope_id: i64) -> Result<(), StorageError>;
}

/// Supplies the store id used when a caller does not name one.
pub trait DefaultStoreResolver: Send + Sync {
    fn current_store_id(&self) -> Result<i64, StoreResolutionError>;
}
