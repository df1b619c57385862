//! Client context shared by every control-plane operation.
//!
//! [`GameStreamClient`] owns the identity, the signer and the transport. The
//! operations themselves live next to their protocol logic:
//! - [`crate::server`]: `resolve`, `refresh`
//! - [`crate::pairing`]: `pair`, `unpair`
//! - [`crate::session`]: `list_apps`, `launch_or_resume`, `quit`

use std::sync::Arc;

use gsc_crypto::cert::Signer;

use crate::errors::ClientError;
use crate::identity::ClientIdentity;
use crate::transport::{RequestUrl, Scheme, Transport};
use crate::xml::XmlResponse;

/// Device name reported to the host while pairing.
pub const DEFAULT_DEVICE_NAME: &str = "roth";

pub struct GameStreamClient<T: Transport> {
    transport: Arc<T>,
    identity: ClientIdentity,
    signer: Arc<dyn Signer>,
    device_name: String,
}

impl<T: Transport> GameStreamClient<T> {
    pub fn new(transport: Arc<T>, identity: ClientIdentity, signer: Arc<dyn Signer>) -> Self {
        Self {
            transport,
            identity,
            signer,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }

    /// Override the device name shown on the host's pairing list.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub(crate) fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    pub(crate) fn url(&self, scheme: Scheme, host: &str, endpoint: &'static str) -> RequestUrl {
        RequestUrl::new(scheme, host, endpoint, &self.identity)
    }

    /// Send one request and parse the status-checked response.
    pub(crate) async fn request(&self, url: RequestUrl) -> Result<XmlResponse, ClientError> {
        tracing::debug!(scheme = %url.scheme(), endpoint = url.endpoint(), "sending request");
        let body = self.transport.get(&url.build()).await?;
        XmlResponse::parse(&body)
    }
}
