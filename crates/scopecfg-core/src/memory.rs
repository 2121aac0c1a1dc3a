//! In-process collaborators for tests, demos and smoke runs.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use base64::{engine::general_purpose, Engine as _};

use crate::{
    backend::{
        ConfigWriter, DefaultStoreResolver, ScopedTableReader, ScopedValueReader, SecretCodec,
    },
    error::{CodecError, StorageError, StoreResolutionError},
    scope::{fallback_chain, ScopeKind, TableScope},
};

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<(TableScope, i64, String), String>,
    store_websites: BTreeMap<i64, i64>,
}

/// Override table held in memory. Serves both the fast path (with fallback) and
/// the exact slow path, and accepts writes.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<State>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which website a store belongs to, enabling website-level fallback.
    pub fn with_store_website(self, store_id: i64, website_id: i64) -> Self {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store_websites
            .insert(store_id, website_id);
        self
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.inner.lock().map_err(|err| StorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl ScopedValueReader for InMemoryConfigStore {
    fn get_value(
        &self,
        path: &str,
        scope: ScopeKind,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError> {
        let state = self.lock()?;
        let chain = fallback_chain(scope, scope_id, |store| {
            state.store_websites.get(&store).copied()
        });
        Ok(chain.into_iter().find_map(|(table_scope, id)| {
            state
                .rows
                .get(&(table_scope, id, path.to_string()))
                .cloned()
        }))
    }
}

impl ScopedTableReader for InMemoryConfigStore {
    fn fetch_one(
        &self,
        path: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError> {
        let state = self.lock()?;
        Ok(state.rows.get(&(scope, scope_id, path.to_string())).cloned())
    }
}

impl ConfigWriter for InMemoryConfigStore {
    fn save(
        &self,
        path: &str,
        value: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .rows
            .insert((scope, scope_id, path.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, path: &str, scope: TableScope, scope_id: i64) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.rows.remove(&(scope, scope_id, path.to_string()));
        Ok(())
    }
}

/// Always reports the same current store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStoreResolver(pub i64);

impl DefaultStoreResolver for FixedStoreResolver {
    fn current_store_id(&self) -> Result<i64, StoreResolutionError> {
        Ok(self.0)
    }
}

/// Codec that XOR-masks and base64-encodes values.
/// Not cryptographically secure; production hosts use the AES-GCM codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskingCodec;

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

impl SecretCodec for MaskingCodec {
    fn decrypt(&self, raw: &str) -> Result<String, CodecError> {
        let masked = general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| CodecError::Malformed {
                reason: e.to_string(),
            })?;
        // XOR twice restores original.
        String::from_utf8(mask(&masked)).map_err(|e| CodecError::Malformed {
            reason: e.to_string(),
        })
    }

    fn encrypt(&self, value: &str) -> Result<String, CodecError> {
        Ok(general_purpose::STANDARD.encode(mask(value.as_bytes())))
    }
}
