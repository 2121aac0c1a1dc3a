use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use scopecfg_core::{
    scope::fallback_chain, ConfigWriter, DefaultStoreResolver, ScopeKind, ScopedTableReader,
    ScopedValueReader, StorageError, StoreResolutionError, TableScope,
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// One override: the value stored at `path` for `scope`/`scope_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigRow {
    pub path: String,
    pub scope: TableScope,
    pub scope_id: i64,
    pub value: String,
}

/// On-disk layout of the override table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDocument {
    /// Store used when callers do not name one.
    #[serde(default)]
    pub default_store: Option<i64>,
    /// store id -> website id, for website-level fallback.
    #[serde(default)]
    pub store_websites: BTreeMap<i64, i64>,
    #[serde(default)]
    pub rows: Vec<ConfigRow>,
}

impl TableDocument {
    fn find(&self, path: &str, scope: TableScope, scope_id: i64) -> Option<&ConfigRow> {
        self.rows
            .iter()
            .find(|row| row.path == path && row.scope == scope && row.scope_id == scope_id)
    }
}

/// JSON-file override table implementing every storage-side collaborator.
///
/// A missing file reads as an empty table. Writes replace the file atomically.
pub struct FileConfigTable {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfigTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TableDocument, StorageError> {
        read_document(&self.path)
    }

    pub fn set_default_store(&self, store_id: i64) -> Result<(), StorageError> {
        self.update(|doc| doc.default_store = Some(store_id))
    }

    pub fn assign_store(&self, store_id: i64, website_id: i64) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.store_websites.insert(store_id, website_id);
        })
    }

    fn update(&self, change: impl FnOnce(&mut TableDocument)) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|err| StorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        let mut doc = read_document(&self.path)?;
        change(&mut doc);
        write_document(&self.path, &doc)
    }
}

impl ScopedValueReader for FileConfigTable {
    #[instrument(skip_all, fields(path = %path, scope = %scope, scope_id = scope_id))]
    fn get_value(
        &self,
        path: &str,
        scope: ScopeKind,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError> {
        let doc = self.load()?;
        let chain = fallback_chain(scope, scope_id, |store| {
            doc.store_websites.get(&store).copied()
        });
        for (table_scope, id) in chain {
            if let Some(row) = doc.find(path, table_scope, id) {
                debug!(scope = %table_scope, scope_id = id, "resolved");
                return Ok(Some(row.value.clone()));
            }
        }
        Ok(None)
    }
}

impl ScopedTableReader for FileConfigTable {
    #[instrument(skip_all, fields(path = %path, scope = %scope, scope_id = scope_id))]
    fn fetch_one(
        &self,
        path: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<Option<String>, StorageError> {
        let doc = self.load()?;
        Ok(doc.find(path, scope, scope_id).map(|row| row.value.clone()))
    }
}

impl ConfigWriter for FileConfigTable {
    #[instrument(skip_all, fields(path = %path, scope = %scope, scope_id = scope_id))]
    fn save(
        &self,
        path: &str,
        value: &str,
        scope: TableScope,
        scope_id: i64,
    ) -> Result<(), StorageError> {
        self.update(|doc| {
            let existing = doc
                .rows
                .iter_mut()
                .find(|row| row.path == path && row.scope == scope && row.scope_id == scope_id);
            match existing {
                Some(row) => row.value = value.to_string(),
                None => doc.rows.push(ConfigRow {
                    path: path.to_string(),
                    scope,
                    scope_id,
                    value: value.to_string(),
                }),
            }
        })
    }

    #[instrument(skip_all, fields(path = %path, scope = %scope, scope_id = scope_id))]
    fn delete(&self, path: &str, scope: TableScope, scope_id: i64) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.rows
                .retain(|row| !(row.path == path && row.scope == scope && row.scope_id == scope_id));
        })
    }
}

impl DefaultStoreResolver for FileConfigTable {
    fn current_store_id(&self) -> Result<i64, StoreResolutionError> {
        let doc = self.load().map_err(|e| StoreResolutionError {
            reason: e.to_string(),
        })?;
        doc.default_store.ok_or_else(|| StoreResolutionError {
            reason: format!("no default_store in {}", self.path.display()),
        })
    }
}

fn read_document(path: &Path) -> Result<TableDocument, StorageError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(TableDocument::default())
        }
        Err(err) => return Err(storage_err(err)),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Ok(TableDocument::default());
    }
    serde_json::from_slice(&buf).map_err(storage_err)
}

fn write_document(path: &Path, doc: &TableDocument) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec_pretty(doc).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn storage_err<E: ToString>(err: E) -> StorageError {
    StorageError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(dir: &tempfile::TempDir) -> FileConfigTable {
        FileConfigTable::new(dir.path().join("config-table.json"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        assert_eq!(table.load().expect("load"), TableDocument::default());
        assert_eq!(
            table
                .fetch_one("a/b", TableScope::Stores, 1)
                .expect("fetch"),
            None
        );
        assert_eq!(
            table.get_value("a/b", ScopeKind::Store, 1).expect("read"),
            None
        );
    }

    #[test]
    fn save_upserts_single_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        table
            .save("a/b", "one", TableScope::Stores, 1)
            .expect("save");
        table
            .save("a/b", "two", TableScope::Stores, 1)
            .expect("save again");

        let doc = table.load().expect("load");
        assert_eq!(doc.rows.len(), 1);
        assert_eq!(
            table
                .fetch_one("a/b", TableScope::Stores, 1)
                .expect("fetch"),
            Some("two".to_string())
        );
        assert_eq!(
            table
                .fetch_one("a/b", TableScope::Stores, 2)
                .expect("fetch"),
            None
        );
    }

    #[test]
    fn fast_path_falls_back_through_website() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        table.assign_store(1, 10).expect("assign");
        table
            .save("a/b", "global", TableScope::Default, 0)
            .expect("save");
        table
            .save("a/b", "site", TableScope::Websites, 10)
            .expect("save");

        assert_eq!(
            table.get_value("a/b", ScopeKind::Store, 1).expect("read"),
            Some("site".to_string())
        );
        assert_eq!(
            table.get_value("a/b", ScopeKind::Store, 2).expect("read"),
            Some("global".to_string())
        );
        assert_eq!(
            table.get_value("a/b", ScopeKind::Global, 0).expect("read"),
            Some("global".to_string())
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        table.save("k", "v", TableScope::Stores, 1).expect("save");
        table.save("k", "w", TableScope::Stores, 2).expect("save");
        table.delete("k", TableScope::Stores, 1).expect("delete");
        table
            .delete("k", TableScope::Stores, 1)
            .expect("delete again");

        let doc = table.load().expect("load");
        assert_eq!(doc.rows.len(), 1);
        assert_eq!(doc.rows[0].scope_id, 2);
    }

    #[test]
    fn default_store_comes_from_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        assert!(table.current_store_id().is_err());

        table.set_default_store(3).expect("set default");
        assert_eq!(table.current_store_id().expect("resolve"), 3);
    }

    #[test]
    fn rejects_corrupt_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        fs::write(table.path(), "{ not json").expect("write");
        let err = table
            .fetch_one("a", TableScope::Default, 0)
            .expect_err("corrupt file");
        assert!(matches!(err, StorageError::Storage { .. }));
    }

    #[test]
    fn document_is_human_readable_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = table(&dir);
        table
            .save("core/settings/active", "1", TableScope::Websites, 1)
            .expect("save");
        let body = fs::read_to_string(table.path()).expect("read");
        assert!(body.contains("\"scope\": \"websites\""));
        assert!(body.contains("core/settings/active"));
    }
}
