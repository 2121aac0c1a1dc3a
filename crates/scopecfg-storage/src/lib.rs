//! Concrete collaborators for the resolver: a JSON-file override table and an
//! AES-GCM secret codec with keys sourced from the OS keyring (or test doubles).

pub mod aes_codec;
pub mod file_table;
pub mod key_provider;
