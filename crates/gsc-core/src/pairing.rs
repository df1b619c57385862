//! Pairing handshake.
//!
//! Pairing establishes mutual trust between this client's certificate and the
//! host's using a 4-digit PIN the user types on the host. The PIN never
//! travels: both sides derive an AES key from `salt || PIN` and prove
//! knowledge of it by exchanging encrypted challenges. The host then proves
//! possession of its certificate's private key by signing a secret, which is
//! the only defense against an on-path attacker substituting its own
//! certificate.
//!
//! Rounds (all `GET /pair` on the HTTP port except the last):
//!
//! | Round | Query                  | Response                       |
//! |-------|------------------------|--------------------------------|
//! | 1     | `getservercert`, salt  | `plaincert`                    |
//! | 2     | `clientchallenge`      | `challengeresponse` (48 bytes) |
//! | 3     | `serverchallengeresp`  | `pairingsecret` (272 bytes)    |
//! | 4     | `clientpairingsecret`  | -                              |
//! | 5     | HTTPS `pairchallenge`  | -                              |
//!
//! Every response must carry `paired=1`. Before round 4 the client checks the
//! host's signature and then the hash from round 2, which only matches when
//! both sides used the same PIN. Any failure unpairs before the error is
//! returned.

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use gsc_crypto::cert::{certificate_signature, verify_signature};
use gsc_crypto::cipher::{AesKey, BlockCipher};
use gsc_crypto::encoding::{from_hex, to_hex};
use gsc_crypto::hash::DigestAlgorithm;
use gsc_crypto::pairing::{challenge_digest, derive_pairing_key, PIN_LEN, SALT_LEN};
use gsc_crypto::random::{random_bytes, random_u32};

use crate::client::GameStreamClient;
use crate::errors::ClientError;
use crate::server::ServerDescriptor;
use crate::transport::{RequestUrl, Scheme, Transport};
use crate::xml::XmlResponse;

/// Largest server certificate accepted in round 1.
pub const MAX_SERVER_CERT_LEN: usize = 8191;

const CHALLENGE_LEN: usize = 16;
const MAX_HASH_LEN: usize = 32;
const SECRET_LEN: usize = 16;
const CHALLENGE_RESPONSE_LEN: usize = 48;
const SIGNATURE_LEN: usize = 256;
const PAIRING_SECRET_LEN: usize = SECRET_LEN + SIGNATURE_LEN;

// ============================================================================
// PIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("PIN must be exactly {PIN_LEN} digits")]
pub struct InvalidPin;

/// The 4-digit pairing PIN.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin([u8; PIN_LEN]);

impl Pin {
    pub fn new(digits: &str) -> Result<Self, InvalidPin> {
        let bytes: [u8; PIN_LEN] = digits.as_bytes().try_into().map_err(|_| InvalidPin)?;
        if !bytes.iter().all(u8::is_ascii_digit) {
            return Err(InvalidPin);
        }
        Ok(Self(bytes))
    }

    /// Random PIN for the user to enter on the host.
    pub fn generate() -> Result<Self, ClientError> {
        let value = random_u32()? % 10_000;
        let digits = Zeroizing::new(format!("{value:04}"));
        Self::new(&digits).map_err(|e| ClientError::PairingFailed(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    fn as_bytes(&self) -> &[u8; PIN_LEN] {
        &self.0
    }
}

impl std::str::FromStr for Pin {
    type Err = InvalidPin;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}

// ============================================================================
// Pairing session
// ============================================================================

/// Key material for one `pair()` call. Wiped when the call returns, on
/// success and failure alike.
#[derive(Zeroize, ZeroizeOnDrop)]
struct PairingSession {
    #[zeroize(skip)]
    algorithm: DigestAlgorithm,
    key: AesKey,
    server_cert: Vec<u8>,
    client_challenge: [u8; CHALLENGE_LEN],
    server_challenge: [u8; CHALLENGE_LEN],
    server_hash: [u8; MAX_HASH_LEN],
    client_secret: [u8; SECRET_LEN],
}

impl PairingSession {
    fn new(
        algorithm: DigestAlgorithm,
        salt: &[u8; SALT_LEN],
        pin: &Pin,
        server_cert: Vec<u8>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            algorithm,
            key: derive_pairing_key(salt, pin.as_bytes(), algorithm),
            server_cert,
            client_challenge: random_bytes()?,
            server_challenge: [0u8; CHALLENGE_LEN],
            server_hash: [0u8; MAX_HASH_LEN],
            client_secret: random_bytes()?,
        })
    }

    fn cipher(&self) -> BlockCipher {
        BlockCipher::new(&self.key)
    }

    /// Extract the host's hash and challenge from the decrypted round 2
    /// response.
    ///
    /// Layout: `digest(hash_len) || server_challenge(16) || padding`.
    fn accept_challenge_response(&mut self, encrypted: &[u8]) -> Result<(), ClientError> {
        if encrypted.len() != CHALLENGE_RESPONSE_LEN {
            return Err(ClientError::Protocol(format!(
                "challengeresponse must be {CHALLENGE_RESPONSE_LEN} bytes, got {}",
                encrypted.len()
            )));
        }
        let decrypted = Zeroizing::new(self.cipher().decrypt(encrypted)?);
        let offset = self.algorithm.output_len();
        self.server_hash = [0u8; MAX_HASH_LEN];
        self.server_hash[..offset].copy_from_slice(&decrypted[..offset]);
        self.server_challenge
            .copy_from_slice(&decrypted[offset..offset + CHALLENGE_LEN]);
        Ok(())
    }

    /// Encrypted digest answering the host's challenge.
    fn challenge_answer(&self, cert_signature: &[u8]) -> Result<Vec<u8>, ClientError> {
        let digest = Zeroizing::new(challenge_digest(
            &self.server_challenge,
            cert_signature,
            &self.client_secret,
            self.algorithm,
        ));
        Ok(self.cipher().encrypt(&digest[..])?)
    }

    /// Check the host's signature over its secret with the certificate it
    /// presented in round 1.
    fn verify_server_secret(&self, pairing_secret: &[u8]) -> Result<(), ClientError> {
        if pairing_secret.len() != PAIRING_SECRET_LEN {
            return Err(ClientError::Protocol(format!(
                "pairingsecret must be {PAIRING_SECRET_LEN} bytes, got {}",
                pairing_secret.len()
            )));
        }
        let (secret, signature) = pairing_secret.split_at(SECRET_LEN);
        match verify_signature(&self.server_cert, secret, signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ClientError::Security("possible man-in-the-middle".into())),
            Err(e) => Err(ClientError::Security(format!(
                "cannot verify host certificate: {e}"
            ))),
        }
    }

    /// Check the round 2 hash against `digest(client_challenge ||
    /// server_cert_signature || server_secret)`. A mismatch means the two
    /// sides used different PINs.
    fn verify_server_hash(&self, server_secret: &[u8]) -> Result<(), ClientError> {
        let cert_signature = certificate_signature(&self.server_cert).map_err(|e| {
            ClientError::Security(format!("cannot read host certificate: {e}"))
        })?;
        let expected = Zeroizing::new(challenge_digest(
            &self.client_challenge,
            &cert_signature,
            server_secret,
            self.algorithm,
        ));
        if *expected != self.server_hash {
            return Err(ClientError::PairingFailed("incorrect PIN".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Handshake
// ============================================================================

impl<T: Transport> GameStreamClient<T> {
    /// Pair with `server` using `pin`.
    ///
    /// Requires an unpaired, idle host; no request is sent otherwise. On
    /// success `server.paired` becomes true. On any failure the client
    /// unpairs (best effort) and returns the original error.
    pub async fn pair(&self, server: &mut ServerDescriptor, pin: &Pin) -> Result<(), ClientError> {
        if server.paired {
            return Err(ClientError::WrongState("already paired".into()));
        }
        if server.current_game != 0 {
            return Err(ClientError::WrongState(
                "server is running a game; quit it before pairing".into(),
            ));
        }

        match self.run_handshake(server, pin).await {
            Ok(()) => {
                server.paired = true;
                tracing::info!(address = %server.address, "paired with server");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(address = %server.address, error = %e, "pairing failed, unpairing");
                if let Err(unpair_err) = self.unpair_request(&server.address).await {
                    tracing::warn!(error = %unpair_err, "cleanup unpair failed");
                }
                Err(e)
            }
        }
    }

    /// Remove this client from the host's paired list.
    pub async fn unpair(&self, server: &mut ServerDescriptor) -> Result<(), ClientError> {
        self.unpair_request(&server.address).await?;
        server.paired = false;
        tracing::info!(address = %server.address, "unpaired from server");
        Ok(())
    }

    async fn unpair_request(&self, host: &str) -> Result<(), ClientError> {
        self.request(self.url(Scheme::Http, host, "unpair")).await?;
        Ok(())
    }

    async fn run_handshake(&self, server: &ServerDescriptor, pin: &Pin) -> Result<(), ClientError> {
        let host = server.address.as_str();
        let algorithm = DigestAlgorithm::for_server_version(server.server_major_version);
        let salt: Zeroizing<[u8; SALT_LEN]> = Zeroizing::new(random_bytes()?);

        let server_cert = self.exchange_salt(host, &salt).await?;
        let mut session = PairingSession::new(algorithm, &salt, pin, server_cert)?;

        self.exchange_challenge(host, &mut session).await?;
        let pairing_secret = self.answer_server_challenge(host, &session).await?;
        session.verify_server_secret(&pairing_secret)?;
        session.verify_server_hash(&pairing_secret[..SECRET_LEN])?;
        self.send_client_secret(host, &session).await?;
        self.confirm_pairing(host).await
    }

    /// Round 1: send the salt and our certificate, receive the host's.
    async fn exchange_salt(&self, host: &str, salt: &[u8; SALT_LEN]) -> Result<Vec<u8>, ClientError> {
        let url = self
            .pair_url(Scheme::Http, host)
            .param("phrase", "getservercert")
            .param("salt", to_hex(salt))
            .param("clientcert", to_hex(self.signer().certificate_pem().as_bytes()));
        let resp = self.pair_round("getservercert", url).await?;

        let plaincert = resp.require_non_empty("plaincert")?;
        if plaincert.len() / 2 > MAX_SERVER_CERT_LEN {
            return Err(ClientError::PairingFailed("certificate too large".into()));
        }
        decode_field("plaincert", plaincert)
    }

    /// Round 2: send our encrypted challenge, receive the host's challenge.
    async fn exchange_challenge(
        &self,
        host: &str,
        session: &mut PairingSession,
    ) -> Result<(), ClientError> {
        let encrypted = session.cipher().encrypt(&session.client_challenge)?;
        let url = self
            .pair_url(Scheme::Http, host)
            .param("clientchallenge", to_hex(&encrypted));
        let resp = self.pair_round("clientchallenge", url).await?;

        let response = decode_field("challengeresponse", resp.require("challengeresponse")?)?;
        session.accept_challenge_response(&response)
    }

    /// Round 3: answer the host's challenge, receive its signed secret.
    async fn answer_server_challenge(
        &self,
        host: &str,
        session: &PairingSession,
    ) -> Result<Vec<u8>, ClientError> {
        let answer = session.challenge_answer(self.signer().certificate_signature())?;
        let url = self
            .pair_url(Scheme::Http, host)
            .param("serverchallengeresp", to_hex(&answer));
        let resp = self.pair_round("serverchallengeresp", url).await?;

        decode_field("pairingsecret", resp.require("pairingsecret")?)
    }

    /// Round 4: send our secret signed with the client key.
    async fn send_client_secret(&self, host: &str, session: &PairingSession) -> Result<(), ClientError> {
        let signature = self.signer().sign(&session.client_secret)?;
        let mut payload = Zeroizing::new(Vec::with_capacity(SECRET_LEN + signature.len()));
        payload.extend_from_slice(&session.client_secret);
        payload.extend_from_slice(&signature);

        let url = self
            .pair_url(Scheme::Http, host)
            .param("clientpairingsecret", to_hex(&payload));
        self.pair_round("clientpairingsecret", url).await?;
        Ok(())
    }

    /// Round 5: confirm over TLS with the now-trusted certificate.
    async fn confirm_pairing(&self, host: &str) -> Result<(), ClientError> {
        let url = self
            .pair_url(Scheme::Https, host)
            .param("phrase", "pairchallenge");
        self.pair_round("pairchallenge", url).await?;
        Ok(())
    }

    fn pair_url(&self, scheme: Scheme, host: &str) -> RequestUrl {
        self.url(scheme, host, "pair")
            .param("devicename", self.device_name())
            .param("updateState", 1)
    }

    async fn pair_round(&self, round: &'static str, url: RequestUrl) -> Result<XmlResponse, ClientError> {
        tracing::debug!(round, "pairing round");
        let resp = self.request(url).await?;
        if resp.require("paired")? != "1" {
            return Err(ClientError::PairingFailed(format!("host rejected {round}")));
        }
        Ok(resp)
    }
}

fn decode_field(name: &str, hex: &str) -> Result<Vec<u8>, ClientError> {
    from_hex(hex).map_err(|e| ClientError::Protocol(format!("{name}: {e}")))
}
