//! Client certificate management and RSA signatures.
//!
//! The host learns the client's certificate during pairing and from then on
//! trusts any TLS connection presenting it. The pairing rounds also mix the
//! certificate's own signature bytes into the challenge digest, and the final
//! round exchanges RSA PKCS#1 v1.5 / SHA-256 signatures over the secrets.
//!
//! Files kept in the key directory:
//! - `client.pem`: self-signed X.509 certificate
//! - `key.pem`: PKCS#8 private key (PKCS#1 is accepted on load)

use std::fs;
use std::io::Write;
use std::path::Path;

use rand_core::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::CryptoError;

pub const CERT_FILE_NAME: &str = "client.pem";
pub const KEY_FILE_NAME: &str = "key.pem";

const RSA_BITS: usize = 2048;
const CERT_COMMON_NAME: &str = "NVIDIA GameStream Client";

/// Signing capability handed to the pairing state machine.
pub trait Signer: Send + Sync {
    /// PEM text of the client certificate.
    fn certificate_pem(&self) -> &str;

    /// Raw signature bytes of the client certificate itself.
    fn certificate_signature(&self) -> &[u8];

    /// Sign `data` with the client private key.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// An X.509 certificate together with its RSA private key.
pub struct CertifiedKey {
    cert_pem: String,
    cert_der: Vec<u8>,
    signature: Vec<u8>,
    private_key: RsaPrivateKey,
}

impl CertifiedKey {
    /// Build from PEM-encoded certificate and private key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, CryptoError> {
        let cert = parse_certificate(cert_pem.as_bytes())?;
        let private_key = RsaPrivateKey::from_pkcs8_pem(key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(key_pem))
            .map_err(|e| CryptoError::Key(e.to_string()))?;

        let cert_der = cert
            .to_der()
            .map_err(|e| CryptoError::Certificate(e.to_string()))?;
        let signature = cert.signature.raw_bytes().to_vec();

        Ok(Self {
            cert_pem: cert_pem.to_string(),
            cert_der,
            signature,
            private_key,
        })
    }

    /// Generate a fresh RSA key and a long-lived self-signed certificate.
    pub fn generate() -> Result<Self, CryptoError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
            .map_err(|e| CryptoError::Key(e.to_string()))?;
        let key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Key(e.to_string()))?;

        let key_pair = rcgen::KeyPair::from_pem_and_sign_algo(&key_pem, &rcgen::PKCS_RSA_SHA256)
            .map_err(|e| CryptoError::Certificate(e.to_string()))?;
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new())
            .map_err(|e| CryptoError::Certificate(e.to_string()))?;
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, CERT_COMMON_NAME);
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2045, 1, 1);

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| CryptoError::Certificate(e.to_string()))?;

        Self::from_pem(&cert.pem(), &key_pem)
    }

    /// Load `client.pem` / `key.pem` from `dir`, generating and saving them
    /// when both are missing.
    ///
    /// If only one of the two exists the survivor is left untouched and a
    /// `NotFound` error names the missing file.
    pub fn load_or_generate(dir: &Path) -> Result<Self, CryptoError> {
        let cert_path = dir.join(CERT_FILE_NAME);
        let key_path = dir.join(KEY_FILE_NAME);

        match (cert_path.exists(), key_path.exists()) {
            (false, false) => {}
            (true, true) => {
                let cert_pem = fs::read_to_string(&cert_path)?;
                let key_pem = Zeroizing::new(fs::read_to_string(&key_path)?);
                return Self::from_pem(&cert_pem, &key_pem);
            }
            (cert_exists, _) => {
                let missing = if cert_exists { &key_path } else { &cert_path };
                return Err(CryptoError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} is missing; refusing to replace its pair", missing.display()),
                )));
            }
        }

        tracing::info!(dir = %dir.display(), "generating client certificate");
        let generated = Self::generate()?;
        generated.save(dir)?;
        Ok(generated)
    }

    /// Write the certificate and key into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), CryptoError> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CERT_FILE_NAME), self.cert_pem.as_bytes())?;

        let key_path = dir.join(KEY_FILE_NAME);
        let key_pem = self.private_key_pem()?;
        let mut file = fs::File::create(&key_path)?;
        file.write_all(key_pem.as_bytes())?;
        file.sync_all()?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&key_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&key_path, perms)?;
        }

        Ok(())
    }

    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// PKCS#8 PEM of the private key, e.g. for a TLS client identity.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Key(e.to_string()))
    }
}

impl Signer for CertifiedKey {
    fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    fn certificate_signature(&self) -> &[u8] {
        &self.signature
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

impl std::fmt::Debug for CertifiedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertifiedKey")
            .field("cert_der_len", &self.cert_der.len())
            .finish_non_exhaustive()
    }
}

/// Signature bytes of a PEM certificate.
pub fn certificate_signature(cert_pem: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Ok(parse_certificate(cert_pem)?.signature.raw_bytes().to_vec())
}

/// Verify an RSA PKCS#1 v1.5 / SHA-256 signature over `data` with the public
/// key of a PEM certificate.
///
/// Returns `Ok(false)` for a well-formed certificate whose key does not
/// verify the signature, and an error when the certificate itself is
/// unusable.
pub fn verify_signature(cert_pem: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    let cert = parse_certificate(cert_pem)?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::Certificate(e.to_string()))?;
    let public_key =
        RsaPublicKey::from_public_key_der(&spki).map_err(|e| CryptoError::Key(e.to_string()))?;

    let Ok(signature) = Signature::try_from(signature) else {
        return Ok(false);
    };
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    Ok(verifying_key.verify(data, &signature).is_ok())
}

fn parse_certificate(pem: &[u8]) -> Result<Certificate, CryptoError> {
    Certificate::from_pem(pem).map_err(|e| CryptoError::Certificate(e.to_string()))
}
