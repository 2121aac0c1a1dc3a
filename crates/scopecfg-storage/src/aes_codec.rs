use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use scopecfg_core::{CodecError, SecretCodec};
use tracing::{debug, instrument};

use crate::key_provider::{KeyMaterial, KeyProvider};

const FORMAT_VERSION: &str = "1";
const NONCE_LEN: usize = 12;

/// AES-256-GCM codec for encrypted config values.
///
/// Ciphertexts are encoded as `1:<nonce>:<ciphertext>` with URL-safe base64 parts,
/// so they can be stored in a plain text column.
pub struct AesGcmCodec<P: KeyProvider> {
    key_provider: P,
}

impl<P: KeyProvider> AesGcmCodec<P> {
    pub fn new(key_provider: P) -> Self {
        Self { key_provider }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CodecError> {
        let material = self
            .key_provider
            .get_or_create()
            .map_err(|e| CodecError::Key {
                reason: format!("key provider: {e}"),
            })?;
        debug!(key_id = %material.id, "loaded config encryption key");
        build_cipher(&material)
    }
}

impl<P: KeyProvider> SecretCodec for AesGcmCodec<P> {
    #[instrument(skip_all)]
    fn decrypt(&self, raw: &str) -> Result<String, CodecError> {
        let mut parts = raw.splitn(3, ':');
        let (Some(version), Some(nonce), Some(ciphertext)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected version:nonce:ciphertext"));
        };
        if version != FORMAT_VERSION {
            return Err(malformed(format!("unsupported format version {version:?}")));
        }

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(nonce)
            .map_err(|e| malformed(format!("nonce decode failed: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(malformed(format!(
                "expected {NONCE_LEN}-byte nonce, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|e| malformed(format!("ciphertext decode failed: {e}")))?;

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| malformed(format!("decrypt failed: {e}")))?;
        String::from_utf8(plaintext).map_err(|e| malformed(e.to_string()))
    }

    #[instrument(skip_all)]
    fn encrypt(&self, value: &str) -> Result<String, CodecError> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext =
            cipher
                .encrypt(&nonce, value.as_bytes())
                .map_err(|e| CodecError::Encrypt {
                    reason: e.to_string(),
                })?;

        Ok(format!(
            "{FORMAT_VERSION}:{}:{}",
            URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, CodecError> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| CodecError::Key {
        reason: format!("cipher init failed: {e}"),
    })
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::Malformed {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_provider::{InMemoryKeyProvider, KeyError, StaticKeyProvider};

    #[test]
    fn round_trip_encrypts_and_decrypts() {
        let codec = AesGcmCodec::new(InMemoryKeyProvider::default());
        let stored = codec.encrypt("hello-config").expect("encrypt");

        assert!(stored.starts_with("1:"));
        assert!(
            !stored.contains("hello-config"),
            "plaintext must not be stored"
        );
        assert_eq!(codec.decrypt(&stored).expect("decrypt"), "hello-config");
    }

    #[test]
    fn same_plaintext_gets_fresh_nonce() {
        let codec = AesGcmCodec::new(InMemoryKeyProvider::default());
        let first = codec.encrypt("v").expect("encrypt");
        let second = codec.encrypt("v").expect("encrypt");
        assert_ne!(first, second);
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let codec = AesGcmCodec::new(InMemoryKeyProvider::default());
        let stored = codec.encrypt("hello").expect("encrypt");
        let (head, tail) = stored.rsplit_once(':').expect("three parts");
        let mut tail = tail.to_string();
        let flipped = if tail.ends_with('A') { 'B' } else { 'A' };
        tail.pop();
        tail.push(flipped);

        let err = codec
            .decrypt(&format!("{head}:{tail}"))
            .expect_err("tampered value should fail");
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn rejects_foreign_formats() {
        let codec = AesGcmCodec::new(InMemoryKeyProvider::default());
        for raw in ["plain-text", "2:abc:def", "1:short:AAAA"] {
            let err = codec.decrypt(raw).expect_err("should reject");
            assert!(matches!(err, CodecError::Malformed { .. }), "{raw}");
        }
    }

    #[test]
    fn other_key_cannot_decrypt() {
        let stored = AesGcmCodec::new(InMemoryKeyProvider::default())
            .encrypt("hello")
            .expect("encrypt");
        let err = AesGcmCodec::new(InMemoryKeyProvider::default())
            .decrypt(&stored)
            .expect_err("wrong key");
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn configured_key_decrypts_across_instances() {
        let material = crate::key_provider::generate_key();
        let stored = AesGcmCodec::new(StaticKeyProvider::new(material.clone()))
            .encrypt("shared")
            .expect("encrypt");
        let other = AesGcmCodec::new(StaticKeyProvider::new(KeyMaterial {
            id: "rotated-label".into(),
            ..material
        }));
        assert_eq!(other.decrypt(&stored).expect("decrypt"), "shared");
    }

    struct BrokenProvider;

    impl KeyProvider for BrokenProvider {
        fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
            Err(KeyError::Keyring("no keychain".into()))
        }
    }

    #[test]
    fn key_failures_surface_as_key_errors() {
        let err = AesGcmCodec::new(BrokenProvider)
            .encrypt("hello")
            .expect_err("no key");
        assert!(matches!(err, CodecError::Key { .. }));
    }
}
