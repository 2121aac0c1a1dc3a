//! Core of scopecfg: scope model, key registry, collaborator contracts and the resolver.
//! Persistence and cryptography live behind traits so hosts can plug in their own backends.

pub mod backend;
pub mod error;
pub mod memory;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use backend::{
    ConfigWriter, DefaultStoreResolver, ScopedTableReader, ScopedValueReader, SecretCodec,
};
pub use error::{CodecError, ConfigError, StorageError, StoreResolutionError};
pub use registry::{FieldKind, KeyDescriptor, KeyRegistry, ReadSource};
pub use resolver::{Collaborators, ConfigResolver, ConfigValue, ACTIVE_KEY};
pub use scope::{Scope, ScopeId, ScopeKind, TableScope};
