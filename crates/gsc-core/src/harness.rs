//! Test harness for GSC core.
//!
//! [`ScriptedTransport`] replays canned responses in order and records every
//! URL it was asked for, so tests can assert both on outcomes and on the exact
//! requests a flow issued. The XML builders produce host-shaped bodies.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use gsc_crypto::cert::Signer;
use gsc_crypto::CryptoError;

use crate::errors::TransportError;
use crate::transport::Transport;

/// Transport that answers from a queue.
///
/// An empty queue answers with [`TransportError::Request`].
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Bytes, TransportError>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body.
    pub fn push_body(&self, body: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(Ok(Bytes::from(body.into())));
        self
    }

    /// Queue a `status_code="200"` document with `inner` as its children.
    pub fn push_ok(&self, inner: &str) -> &Self {
        self.push_body(ok_document(inner))
    }

    pub fn push_error(&self, err: TransportError) -> &Self {
        lock(&self.responses).push_back(Err(err));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Responses not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        lock(&self.requests).push(url.to_string());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".into())))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Signer with fixed bytes, for flows that never reach a real signature
/// check.
pub struct StaticSigner {
    pub cert_pem: String,
    pub cert_signature: Vec<u8>,
}

impl Default for StaticSigner {
    fn default() -> Self {
        Self {
            cert_pem: "-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n".into(),
            cert_signature: vec![0u8; 256],
        }
    }
}

impl Signer for StaticSigner {
    fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    fn certificate_signature(&self) -> &[u8] {
        &self.cert_signature
    }

    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(vec![0u8; 256])
    }
}

/// Wrap `inner` in a successful response document.
pub fn ok_document(inner: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="utf-8"?><root status_code="200">{inner}</root>"#)
}

/// Wrap an error status in a response document.
pub fn error_document(code: u16, message: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="utf-8"?><root status_code="{code}" status_message="{message}"/>"#)
}

/// Children of a `/serverinfo` response.
pub fn server_info_xml(
    app_version: &str,
    paired: bool,
    current_game: u32,
    busy: bool,
    modes: &[(u32, u32, u32)],
) -> String {
    let modes: String = modes
        .iter()
        .map(|(w, h, r)| {
            format!(
                "<DisplayMode><Width>{w}</Width><Height>{h}</Height><RefreshRate>{r}</RefreshRate></DisplayMode>"
            )
        })
        .collect();
    format!(
        "<hostname>TEST-PC</hostname><appversion>{app_version}</appversion>\
         <GfeVersion>3.23.0.74</GfeVersion><PairStatus>{}</PairStatus>\
         <currentgame>{current_game}</currentgame><state>{}</state>\
         <gputype>GeForce GTX 1080</gputype>\
         <SupportedDisplayMode>{modes}</SupportedDisplayMode>",
        u8::from(paired),
        if busy { "SUNSHINE_SERVER_BUSY" } else { "SUNSHINE_SERVER_FREE" },
    )
}

/// Query parameter `key` of a recorded URL, undecoded.
pub fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let transport = ScriptedTransport::new();
        transport.push_body("a").push_error(TransportError::Timeout);

        assert_eq!(transport.get("http://h/1").await.unwrap(), Bytes::from("a"));
        assert_eq!(transport.get("http://h/2").await, Err(TransportError::Timeout));
        assert!(transport.get("http://h/3").await.is_err());
        assert_eq!(transport.requests(), vec!["http://h/1", "http://h/2", "http://h/3"]);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_query_param() {
        let url = "http://h:47989/pair?uniqueid=AB&phrase=getservercert";
        assert_eq!(query_param(url, "phrase"), Some("getservercert"));
        assert_eq!(query_param(url, "salt"), None);
        assert_eq!(query_param("http://h/", "x"), None);
    }
}
