//! Client credentials on disk
//!
//! The key directory holds everything a host remembers about this client:
//! - `uniqueid.dat`: the 16-hex-char unique id sent with every request
//! - `client.pem` / `key.pem`: the certificate presented while pairing and
//!   as TLS client identity
//!
//! Both are created on first use and reused afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use gsc_core::ClientIdentity;
use gsc_crypto::cert::CertifiedKey;
use gsc_crypto::CryptoError;

/// Credential loading errors
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to load unique id from {path}: {source}")]
    UniqueId {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load client certificate from {path}: {source}")]
    Certificate {
        path: PathBuf,
        #[source]
        source: CryptoError,
    },
}

/// Unique id plus certificate, loaded from one key directory.
pub struct Credentials {
    pub identity: ClientIdentity,
    pub cert: Arc<CertifiedKey>,
    key_dir: PathBuf,
}

/// Credential details for display
#[derive(Debug, Clone, Serialize)]
pub struct IdentityInfo {
    pub unique_id: String,
    /// SHA-256 of the certificate DER, hex encoded
    pub fingerprint: String,
    pub key_dir: String,
}

impl Credentials {
    /// Load credentials from `key_dir`, creating whatever is missing.
    pub fn load_or_create(key_dir: &Path) -> Result<Self, CredentialsError> {
        let identity =
            ClientIdentity::load_or_create(key_dir).map_err(|source| CredentialsError::UniqueId {
                path: key_dir.to_path_buf(),
                source,
            })?;
        let cert =
            CertifiedKey::load_or_generate(key_dir).map_err(|source| CredentialsError::Certificate {
                path: key_dir.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            key_dir = %key_dir.display(),
            unique_id = identity.as_str(),
            "loaded client credentials"
        );

        Ok(Self {
            identity,
            cert: Arc::new(cert),
            key_dir: key_dir.to_path_buf(),
        })
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.cert.cert_der()))
    }

    pub fn display_info(&self) -> IdentityInfo {
        IdentityInfo {
            unique_id: self.identity.as_str().to_string(),
            fingerprint: self.fingerprint(),
            key_dir: self.key_dir.display().to_string(),
        }
    }
}
