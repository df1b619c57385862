#![cfg(feature = "http")]

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use gsc_crypto::cert::CertifiedKey;

use crate::errors::TransportError;
use crate::transport::Transport;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed transport.
///
/// Presents the client certificate as TLS identity. Hosts serve a self-signed
/// certificate, so server certificate validation is disabled; pairing proves
/// the host's identity instead.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cert: &CertifiedKey, timeout: Duration) -> Result<Self, TransportError> {
        let key_pem = cert
            .private_key_pem()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let mut identity_pem = key_pem.as_bytes().to_vec();
        identity_pem.extend_from_slice(cert.cert_pem().as_bytes());
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        zeroize::Zeroize::zeroize(&mut identity_pem);

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let resp = self.client.get(url).send().await.map_err(map_reqwest)?;

        match resp.status() {
            StatusCode::OK => resp.bytes().await.map_err(map_reqwest),
            other => Err(TransportError::Status(other.as_u16())),
        }
    }
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(e.to_string())
    }
}
