//! GSC Controller - CLI for GameStream hosts
//!
//! Library half of the `gsc-controller` binary: query a host's status, pair
//! and unpair with a PIN, and list, launch, resume or quit its apps.

pub mod cli;
pub mod config;
pub mod context;
pub mod credentials;
pub mod output;

#[cfg(test)]
mod proptests;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{JsonResponse, OutputFormat, OutputFormatter, SuccessMessage};

use gsc_core::errors::{ClientError, TransportError};

/// Process exit status, one value per failure class a script may want to
/// branch on. `name()` is the stable spelling used in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    AuthenticationFailed = 2,
    Timeout = 3,
    ConnectionFailed = 4,
    InvalidInput = 5,
    NotPaired = 6,
    WrongState = 7,
    Unsupported = 8,
}

impl From<&ClientError> for ExitCode {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Transport(TransportError::Timeout) => ExitCode::Timeout,
            ClientError::Transport(_) => ExitCode::ConnectionFailed,
            ClientError::PairingFailed(_) | ClientError::Security(_) => {
                ExitCode::AuthenticationFailed
            }
            ClientError::WrongState(_) => ExitCode::WrongState,
            ClientError::InvalidAddress(_) => ExitCode::InvalidInput,
            ClientError::UnsupportedVersion(_)
            | ClientError::NotSupportedMode
            | ClientError::NotSupportedSopsResolution
            | ClientError::NotSupported4k => ExitCode::Unsupported,
            ClientError::Io(_)
            | ClientError::Protocol(_)
            | ClientError::Session(_)
            | ClientError::Crypto(_) => ExitCode::GeneralError,
        }
    }
}

impl ExitCode {
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Classify a top-level error, looking through anyhow context for a
    /// protocol error.
    pub fn for_error(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<ClientError>())
            .map(ExitCode::from)
            .unwrap_or(ExitCode::GeneralError)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::AuthenticationFailed => "AUTH_FAILED",
            ExitCode::Timeout => "TIMEOUT",
            ExitCode::ConnectionFailed => "CONNECTION_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::NotPaired => "NOT_PAIRED",
            ExitCode::WrongState => "WRONG_STATE",
            ExitCode::Unsupported => "UNSUPPORTED",
        }
    }
}
