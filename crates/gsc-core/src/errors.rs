//! Error types for GSC Core.
//!
//! Every public operation returns [`ClientError`]. Transport and session
//! failures carry their own typed sub-enums, mirroring how the host reports
//! them.

use thiserror::Error;

use gsc_crypto::CryptoError;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection or request failed before a response arrived
    #[error("request failed: {0}")]
    Request(String),

    /// Request exceeded the transport timeout
    #[error("request timed out")]
    Timeout,

    /// Host answered with a non-success HTTP status
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Session control rejected by the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    #[error("quit failed: the host refused or nothing was running")]
    QuitFailed,
}

/// Unified error type for GSC Core operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Filesystem failure (identity or certificate storage)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Host string that cannot name a GameStream host
    #[error("invalid host address {0}")]
    InvalidAddress(String),

    /// Malformed response, or an error status reported by the host
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unsupported server version: {0}")]
    UnsupportedVersion(String),

    /// Operation not allowed in the descriptor's current state
    #[error("wrong state: {0}")]
    WrongState(String),

    /// Host rejected a pairing round
    #[error("pairing failed: {0}")]
    PairingFailed(String),

    /// Host failed to prove possession of its certificate.
    /// Never retried or downgraded.
    #[error("security error: {0}")]
    Security(String),

    #[error("requested display mode is not supported by the host")]
    NotSupportedMode,

    #[error("optimal playback settings require a resolution the host supports")]
    NotSupportedSopsResolution,

    #[error("the host does not support 4K streaming")]
    NotSupported4k,

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ClientError {
    /// True for local policy rejections raised before any request is sent.
    pub fn is_mode_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::NotSupportedMode
                | ClientError::NotSupportedSopsResolution
                | ClientError::NotSupported4k
        )
    }

    /// True when the error indicates possible tampering.
    pub fn is_security(&self) -> bool {
        matches!(self, ClientError::Security(_))
    }
}
