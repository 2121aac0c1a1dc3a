use std::fmt;

use serde::{Deserialize, Serialize};

/// Scope id stored for the global default row.
pub const DEFAULT_SCOPE_ID: i64 = 0;

/// Breadth a lookup is made at (per-request scope).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Global default values.
    Global,
    Website,
    /// A single store view (the usual request context).
    #[default]
    Store,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "default",
            ScopeKind::Website => "website",
            ScopeKind::Store => "store",
        }
    }

    /// Table-level scope that overrides for this kind are physically stored under.
    pub fn table_scope(&self) -> TableScope {
        match self {
            ScopeKind::Global => TableScope::Default,
            ScopeKind::Website => TableScope::Websites,
            ScopeKind::Store => TableScope::Stores,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope column of the override table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TableScope {
    Default,
    Websites,
    Stores,
}

impl TableScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableScope::Default => "default",
            TableScope::Websites => "websites",
            TableScope::Stores => "stores",
        }
    }
}

impl fmt::Display for TableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which website/store a scope names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Explicit(i64),
    /// Resolve through the host's default store at call time.
    #[default]
    UseCurrentStore,
}

impl From<i64> for ScopeId {
    fn from(id: i64) -> Self {
        ScopeId::Explicit(id)
    }
}

impl From<Option<i64>> for ScopeId {
    fn from(id: Option<i64>) -> Self {
        id.map_or(ScopeId::UseCurrentStore, ScopeId::Explicit)
    }
}

/// Resolution context for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    pub kind: ScopeKind,
    pub id: ScopeId,
}

impl Scope {
    pub fn new(kind: ScopeKind, id: impl Into<ScopeId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn store(id: i64) -> Self {
        Self::new(ScopeKind::Store, id)
    }

    pub fn website(id: i64) -> Self {
        Self::new(ScopeKind::Website, id)
    }

    pub fn global() -> Self {
        Self::new(ScopeKind::Global, DEFAULT_SCOPE_ID)
    }

    /// Store scope bound to whatever the host reports as its current store.
    pub fn current_store() -> Self {
        Self::default()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            ScopeId::Explicit(id) => write!(f, "{}:{}", self.kind, id),
            ScopeId::UseCurrentStore => write!(f, "{}:current", self.kind),
        }
    }
}

/// Rows consulted, most specific first, when reading `kind`/`scope_id` with fallback.
///
/// Store reads fall back to the owning website (when `website_of` knows it) and then
/// to the global default; website reads fall back to the default only.
pub fn fallback_chain(
    kind: ScopeKind,
    scope_id: i64,
    website_of: impl Fn(i64) -> Option<i64>,
) -> Vec<(TableScope, i64)> {
    let mut chain = Vec::with_capacity(3);
    match kind {
        ScopeKind::Store => {
            chain.push((TableScope::Stores, scope_id));
            if let Some(website) = website_of(scope_id) {
                chain.push((TableScope::Websites, website));
            }
        }
        ScopeKind::Website => chain.push((TableScope::Websites, scope_id)),
        ScopeKind::Global => {}
    }
    chain.push((TableScope::Default, DEFAULT_SCOPE_ID));
    chain
}
