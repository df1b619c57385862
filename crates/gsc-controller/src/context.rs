//! Per-invocation state shared by the commands
//!
//! Loads credentials from the configured key directory and builds
//! HTTP-backed clients with the configured timeouts and device name.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use gsc_core::http::HttpTransport;
use gsc_core::{AppInfo, ClientError, GameStreamClient, ServerDescriptor};
use gsc_crypto::cert::Signer;

use crate::config::Config;
use crate::credentials::Credentials;

pub type HttpClient = GameStreamClient<HttpTransport>;

pub struct ControllerContext {
    pub config: Config,
    pub credentials: Credentials,
}

impl ControllerContext {
    pub fn load(config: Config) -> anyhow::Result<Self> {
        let key_dir = config.key_dir()?;
        let credentials = Credentials::load_or_create(&key_dir)?;
        Ok(Self { config, credentials })
    }

    /// Client for everything except pairing.
    pub fn client(&self) -> anyhow::Result<HttpClient> {
        self.client_with_timeout(self.config.transport.timeout())
    }

    /// Client for pairing. The first round stays open until the PIN has been
    /// entered on the host, so it gets the longer timeout.
    pub fn pairing_client(&self) -> anyhow::Result<HttpClient> {
        self.client_with_timeout(self.config.transport.pair_timeout())
    }

    fn client_with_timeout(&self, timeout: Duration) -> anyhow::Result<HttpClient> {
        let transport = HttpTransport::new(&self.credentials.cert, timeout)
            .context("failed to set up HTTP transport")?;
        let signer: Arc<dyn Signer> = self.credentials.cert.clone();

        Ok(GameStreamClient::new(
            Arc::new(transport),
            self.credentials.identity.clone(),
            signer,
        )
        .with_device_name(self.config.client.device_name.clone()))
    }

    /// Query `host` with the configured version policy.
    pub async fn resolve(
        &self,
        client: &HttpClient,
        host: &str,
    ) -> Result<ServerDescriptor, ClientError> {
        client
            .resolve(host, self.config.server.allow_unsupported)
            .await
    }
}

/// Find an app by numeric id, falling back to a case-insensitive title match.
pub fn find_app<'a>(apps: &'a [AppInfo], selector: &str) -> Option<&'a AppInfo> {
    if let Ok(id) = selector.parse::<u32>() {
        if let Some(app) = apps.iter().find(|a| a.id == id) {
            return Some(app);
        }
    }
    apps.iter().find(|a| a.title.eq_ignore_ascii_case(selector))
}
