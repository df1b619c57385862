//! GSC Core - control-plane client for GameStream hosts.
//!
//! This crate implements:
//! - Persistent client identity
//! - Server status resolution with HTTPS-to-HTTP fallback
//! - The PIN pairing handshake
//! - Session control (app list, launch/resume, quit)

#![forbid(unsafe_code)]

// Protocol operations
pub mod server;
pub mod pairing;
pub mod session;

// Wire plumbing
pub mod client;
pub mod transport;
pub mod xml;

// Supporting modules
pub mod errors;
pub mod identity;
pub mod audio;
pub mod harness;

// Optional transport implementation
#[cfg(feature = "http")]
pub mod http;

#[cfg(test)]
mod proptests;

pub use client::GameStreamClient;
pub use errors::{ClientError, SessionError, TransportError};
pub use identity::ClientIdentity;
pub use pairing::Pin;
pub use server::{DisplayMode, ServerDescriptor};
pub use session::{AppInfo, AppList, RemoteInputKey, StreamLaunchRequest};
