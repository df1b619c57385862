//! Pairing against an in-process fake host.
//!
//! The fake host runs the server side of the handshake with its own
//! certificate: it decrypts the client's challenge, answers with its hash
//! and its own challenge, signs its secret and finally checks the client's
//! challenge hash and signature. A client that pairs with it has exercised every round for real.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use gsc_core::errors::{ClientError, TransportError};
use gsc_core::harness::{ok_document, query_param, ScriptedTransport};
use gsc_core::transport::Transport;
use gsc_core::{ClientIdentity, GameStreamClient, Pin, ServerDescriptor};
use gsc_crypto::cert::{certificate_signature, verify_signature, CertifiedKey, Signer};
use gsc_crypto::cipher::{AesKey, BlockCipher};
use gsc_crypto::encoding::{from_hex, from_hex_array, to_hex};
use gsc_crypto::hash::DigestAlgorithm;
use gsc_crypto::pairing::{challenge_digest, derive_pairing_key};
use gsc_crypto::random::random_bytes;

const CLIENT_CERT: &str = include_str!("../../gsc-crypto/testdata/client-cert.pem");
const CLIENT_KEY: &str = include_str!("../../gsc-crypto/testdata/client-key.pem");
const SERVER_CERT: &str = include_str!("../../gsc-crypto/testdata/server-cert.pem");
const SERVER_KEY: &str = include_str!("../../gsc-crypto/testdata/server-key.pem");

const HOST_PIN: &[u8; 4] = b"1234";

#[derive(Default)]
struct HostState {
    client_cert: Vec<u8>,
    key: Option<AesKey>,
    server_secret: [u8; 16],
    server_challenge: [u8; 16],
    client_hash: Vec<u8>,
    paired: bool,
    unpaired: bool,
    phrases: Vec<String>,
}

struct FakeHost {
    algorithm: DigestAlgorithm,
    server_key: CertifiedKey,
    corrupt_signature: bool,
    state: Mutex<HostState>,
}

impl FakeHost {
    fn new(server_major_version: u32) -> Self {
        Self {
            algorithm: DigestAlgorithm::for_server_version(server_major_version),
            server_key: CertifiedKey::from_pem(SERVER_CERT, SERVER_KEY).unwrap(),
            corrupt_signature: false,
            state: Mutex::new(HostState::default()),
        }
    }

    fn corrupting_signature(mut self) -> Self {
        self.corrupt_signature = true;
        self
    }

    fn paired(&self) -> bool {
        self.state.lock().unwrap().paired
    }

    fn unpaired(&self) -> bool {
        self.state.lock().unwrap().unpaired
    }

    fn phrases(&self) -> Vec<String> {
        self.state.lock().unwrap().phrases.clone()
    }

    fn cipher(state: &HostState) -> BlockCipher {
        BlockCipher::new(state.key.as_ref().expect("salt exchanged"))
    }

    fn handle_pair(&self, url: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let param = |key| query_param(url, key).map(str::to_string);

        if param("phrase").as_deref() == Some("getservercert") {
            state.phrases.push("getservercert".into());
            let salt: [u8; 16] = from_hex_array(&param("salt").unwrap()).unwrap();
            state.client_cert = from_hex(&param("clientcert").unwrap()).unwrap();
            state.key = Some(derive_pairing_key(&salt, HOST_PIN, self.algorithm));
            return ok_document(&format!(
                "<paired>1</paired><plaincert>{}</plaincert>",
                to_hex(SERVER_CERT.as_bytes())
            ));
        }

        if let Some(challenge) = param("clientchallenge") {
            state.phrases.push("clientchallenge".into());
            let cipher = Self::cipher(&state);
            let client_challenge = cipher.decrypt(&from_hex(&challenge).unwrap()).unwrap();
            state.server_secret = random_bytes().unwrap();
            state.server_challenge = random_bytes().unwrap();

            let hash_len = self.algorithm.output_len();
            let digest = challenge_digest(
                &client_challenge,
                self.server_key.certificate_signature(),
                &state.server_secret,
                self.algorithm,
            );
            let mut plain = [0u8; 48];
            plain[..hash_len].copy_from_slice(&digest[..hash_len]);
            plain[hash_len..hash_len + 16].copy_from_slice(&state.server_challenge);
            let response = cipher.encrypt(&plain).unwrap();
            return ok_document(&format!(
                "<paired>1</paired><challengeresponse>{}</challengeresponse>",
                to_hex(&response)
            ));
        }

        if let Some(answer) = param("serverchallengeresp") {
            state.phrases.push("serverchallengeresp".into());
            state.client_hash = Self::cipher(&state)
                .decrypt(&from_hex(&answer).unwrap())
                .unwrap();

            let mut signature = self.server_key.sign(&state.server_secret).unwrap();
            if self.corrupt_signature {
                signature[10] ^= 0xFF;
            }
            let mut secret = state.server_secret.to_vec();
            secret.extend_from_slice(&signature);
            return ok_document(&format!(
                "<paired>1</paired><pairingsecret>{}</pairingsecret>",
                to_hex(&secret)
            ));
        }

        if let Some(payload) = param("clientpairingsecret") {
            state.phrases.push("clientpairingsecret".into());
            let payload = from_hex(&payload).unwrap();
            let (client_secret, signature) = payload.split_at(16);

            let signature_ok = verify_signature(&state.client_cert, client_secret, signature).unwrap();
            let expected = challenge_digest(
                &state.server_challenge,
                &certificate_signature(&state.client_cert).unwrap(),
                client_secret,
                self.algorithm,
            );
            let hash_ok = state.client_hash == expected;
            state.paired = signature_ok && hash_ok;
            return ok_document(&format!("<paired>{}</paired>", u8::from(state.paired)));
        }

        if param("phrase").as_deref() == Some("pairchallenge") {
            state.phrases.push("pairchallenge".into());
            assert!(url.starts_with("https://"), "final round must use TLS");
            return ok_document(&format!("<paired>{}</paired>", u8::from(state.paired)));
        }

        ok_document("<paired>0</paired>")
    }
}

#[async_trait]
impl Transport for FakeHost {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let path = url
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, path)| path)
            .unwrap_or_default();

        let body = if path.starts_with("pair?") {
            self.handle_pair(url)
        } else if path.starts_with("unpair?") {
            let mut state = self.state.lock().unwrap();
            state.paired = false;
            state.unpaired = true;
            ok_document("")
        } else {
            return Err(TransportError::Status(404));
        };
        Ok(Bytes::from(body))
    }
}

fn client<T: Transport>(transport: Arc<T>) -> GameStreamClient<T> {
    let signer = CertifiedKey::from_pem(CLIENT_CERT, CLIENT_KEY).unwrap();
    GameStreamClient::new(
        transport,
        ClientIdentity::from_string("0123456789ABCDEF").unwrap(),
        Arc::new(signer),
    )
}

fn descriptor(server_major_version: u32) -> ServerDescriptor {
    ServerDescriptor {
        address: "192.168.1.20".into(),
        paired: false,
        current_game: 0,
        supports_4k: false,
        unsupported: false,
        server_major_version,
        app_version: format!("{server_major_version}.1.431.-1"),
        gfe_version: None,
        gpu_type: None,
        gs_version: None,
        display_modes: Vec::new(),
    }
}

fn pin(digits: &str) -> Pin {
    Pin::new(digits).unwrap()
}

#[tokio::test]
async fn pairing_succeeds_with_sha256_host() {
    let host = Arc::new(FakeHost::new(7));
    let client = client(host.clone());
    let mut server = descriptor(7);

    client.pair(&mut server, &pin("1234")).await.unwrap();

    assert!(server.paired);
    assert!(host.paired());
    assert!(!host.unpaired());
    assert_eq!(
        host.phrases(),
        vec![
            "getservercert",
            "clientchallenge",
            "serverchallengeresp",
            "clientpairingsecret",
            "pairchallenge"
        ]
    );
}

#[tokio::test]
async fn pairing_succeeds_with_sha1_host() {
    let host = Arc::new(FakeHost::new(5));
    let client = client(host.clone());
    let mut server = descriptor(5);

    client.pair(&mut server, &pin("1234")).await.unwrap();
    assert!(server.paired);
    assert!(host.paired());
}

#[tokio::test]
async fn corrupted_pairing_signature_is_security_error() {
    let host = Arc::new(FakeHost::new(7).corrupting_signature());
    let client = client(host.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();

    assert!(err.is_security(), "unexpected error: {err:?}");
    assert!(!server.paired);
    assert!(host.unpaired());
    // The client secret is never sent to a host that failed the check.
    assert!(!host.phrases().contains(&"clientpairingsecret".to_string()));
}

#[tokio::test]
async fn wrong_pin_is_rejected_by_host() {
    let host = Arc::new(FakeHost::new(7));
    let client = client(host.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("9999")).await.unwrap_err();

    assert!(
        matches!(err, ClientError::PairingFailed(ref msg) if msg.contains("incorrect PIN")),
        "unexpected error: {err:?}"
    );
    assert!(!server.paired);
    assert!(!host.paired());
    assert!(host.unpaired());
    // Caught from the round 2 hash, before the signed client secret goes out.
    assert!(!host.phrases().contains(&"clientpairingsecret".to_string()));
}

#[tokio::test]
async fn wrong_pin_is_caught_with_sha1_host() {
    let host = Arc::new(FakeHost::new(5));
    let client = client(host.clone());
    let mut server = descriptor(5);

    let err = client.pair(&mut server, &pin("4321")).await.unwrap_err();
    assert!(matches!(err, ClientError::PairingFailed(_)), "unexpected error: {err:?}");
    assert_eq!(
        host.phrases(),
        vec!["getservercert", "clientchallenge", "serverchallengeresp"]
    );
}

#[tokio::test]
async fn pairing_when_already_paired_sends_nothing() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client(transport.clone());
    let mut server = descriptor(7);
    server.paired = true;

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();

    assert!(matches!(err, ClientError::WrongState(ref msg) if msg.contains("already paired")));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn pairing_while_game_running_sends_nothing() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client(transport.clone());
    let mut server = descriptor(7);
    server.current_game = 42;

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();

    assert!(matches!(err, ClientError::WrongState(ref msg) if msg.contains("running a game")));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn rejected_round_unpairs_and_keeps_original_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_ok("<paired>0</paired>")
        .push_error(TransportError::Timeout);
    let client = client(transport.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();

    // The failing cleanup unpair does not replace the pairing error.
    assert!(matches!(err, ClientError::PairingFailed(_)), "unexpected error: {err:?}");
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("http://192.168.1.20:47989/pair?"));
    assert_eq!(query_param(&requests[0], "phrase"), Some("getservercert"));
    assert_eq!(query_param(&requests[0], "devicename"), Some("roth"));
    assert_eq!(query_param(&requests[0], "updateState"), Some("1"));
    assert!(requests[1].starts_with("http://192.168.1.20:47989/unpair?"));
}

#[tokio::test]
async fn oversized_server_certificate_is_rejected() {
    let transport = Arc::new(ScriptedTransport::new());
    let huge = "00".repeat(8192);
    transport
        .push_ok(&format!("<paired>1</paired><plaincert>{huge}</plaincert>"))
        .push_ok("");
    let client = client(transport.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();
    assert!(matches!(err, ClientError::PairingFailed(ref msg) if msg.contains("too large")));
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test]
async fn missing_plaincert_is_protocol_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_ok("<paired>1</paired>").push_ok("");
    let client = client(transport.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)), "unexpected error: {err:?}");
    assert!(!server.paired);
}

#[tokio::test]
async fn short_challenge_response_is_protocol_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_ok(&format!(
            "<paired>1</paired><plaincert>{}</plaincert>",
            to_hex(SERVER_CERT.as_bytes())
        ))
        .push_ok(&format!(
            "<paired>1</paired><challengeresponse>{}</challengeresponse>",
            to_hex(&[0u8; 32])
        ))
        .push_ok("");
    let client = client(transport.clone());
    let mut server = descriptor(7);

    let err = client.pair(&mut server, &pin("1234")).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)), "unexpected error: {err:?}");
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn every_pairing_request_has_fresh_uuid() {
    let host = Arc::new(ScriptedTransport::new());
    host.push_ok("<paired>0</paired>").push_ok("");
    let client = client(host.clone());
    let mut server = descriptor(7);

    let _ = client.pair(&mut server, &pin("1234")).await;
    let requests = host.requests();
    assert_ne!(query_param(&requests[0], "uuid"), query_param(&requests[1], "uuid"));
    assert_eq!(query_param(&requests[0], "uniqueid"), Some("0123456789ABCDEF"));
}

#[tokio::test]
async fn unpair_clears_paired_flag() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_ok("");
    let client = client(transport.clone());
    let mut server = descriptor(7);
    server.paired = true;

    client.unpair(&mut server).await.unwrap();
    assert!(!server.paired);
    assert!(transport.requests()[0].contains(":47989/unpair?"));
}
