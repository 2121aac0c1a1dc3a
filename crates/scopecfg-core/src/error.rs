use thiserror::Error;

/// Failures raised by storage collaborators (readers and writers).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Failures raised by a `SecretCodec`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not a ciphertext this codec produced (or it was tampered with).
    #[error("malformed ciphertext: {reason}")]
    Malformed { reason: String },
    /// Key material could not be obtained.
    #[error("key unavailable: {reason}")]
    Key { reason: String },
    #[error("encrypt failed: {reason}")]
    Encrypt { reason: String },
}

/// The host could not name a current store.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no default store could be resolved: {reason}")]
pub struct StoreResolutionError {
    pub reason: String,
}

/// Errors surfaced by `ConfigResolver`.
///
/// A registered key without a stored value is not an error; it resolves to `None`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown configuration key: {key}")]
    UnknownKey { key: String },
    #[error("failed to decrypt value at {path}")]
    Decryption {
        path: String,
        #[source]
        source: CodecError,
    },
    #[error("failed to encrypt value for {path}")]
    Encryption {
        path: String,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    StoreResolution(#[from] StoreResolutionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ConfigError {
    pub(crate) fn unknown_key(key: &str) -> Self {
        ConfigError::UnknownKey {
            key: key.to_string(),
        }
    }
}
