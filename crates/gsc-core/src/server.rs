//! Server status resolution.
//!
//! `/serverinfo` describes the host: version, pairing state, the running
//! game and the display modes it can encode. Modern hosts refuse this call
//! over HTTPS until the client is paired, and plain HTTP does not report the
//! pairing state reliably, so the resolver tries HTTPS first and falls back
//! to HTTP exactly once.

use crate::client::GameStreamClient;
use crate::errors::ClientError;
use crate::transport::{validate_address, Scheme, Transport};
use crate::xml::{Record, XmlResponse};

/// Oldest host generation this client speaks to.
pub const MIN_SUPPORTED_SERVER_VERSION: u32 = 3;
/// Newest host generation this client speaks to.
pub const MAX_SUPPORTED_SERVER_VERSION: u32 = 7;

/// Substring of `<state>` present while a stream is active.
const SERVER_BUSY_MARKER: &str = "_SERVER_BUSY";

/// One display mode the host can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh: u32,
}

impl DisplayMode {
    fn from_record(record: &Record<'_>) -> Result<Self, ClientError> {
        Ok(Self {
            width: record.number("Width")?,
            height: record.number("Height")?,
            refresh: record.number("RefreshRate")?,
        })
    }
}

/// What the client knows about one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Host name or IP literal
    pub address: String,
    pub paired: bool,
    /// Running app id, 0 when nothing is streaming
    pub current_game: u32,
    pub supports_4k: bool,
    /// Skip version and display-mode policy checks
    pub unsupported: bool,
    pub server_major_version: u32,
    pub app_version: String,
    pub gfe_version: Option<String>,
    pub gpu_type: Option<String>,
    pub gs_version: Option<String>,
    pub display_modes: Vec<DisplayMode>,
}

impl ServerDescriptor {
    /// Build a descriptor from a status-checked `/serverinfo` response.
    pub fn from_server_info(
        address: &str,
        info: &XmlResponse,
        unsupported: bool,
    ) -> Result<Self, ClientError> {
        let current_game = info.require_non_empty("currentgame")?;
        let pair_status = info.require_non_empty("PairStatus")?;
        let app_version = info.require_non_empty("appversion")?;
        let state = info.require_non_empty("state")?;

        // Hosts keep reporting the last game after a stream ends; only trust
        // it while the host says it is busy.
        let current_game = if state.contains(SERVER_BUSY_MARKER) {
            current_game.parse().unwrap_or(0)
        } else {
            0
        };

        let display_modes = info
            .records("DisplayMode")
            .iter()
            .filter_map(|record| match DisplayMode::from_record(record) {
                Ok(mode) => Some(mode),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed display mode");
                    None
                }
            })
            .collect();

        Ok(Self {
            address: address.to_string(),
            paired: pair_status == "1",
            current_game,
            supports_4k: info.contains("ServerCodecModeSupport"),
            unsupported,
            server_major_version: parse_major_version(app_version),
            app_version: app_version.to_string(),
            gfe_version: info.text("GfeVersion").map(str::to_string),
            gpu_type: info.text("gputype").map(str::to_string),
            gs_version: info.text("GsVersion").map(str::to_string),
            display_modes,
        })
    }

    /// Enforce the supported version window unless the override is set.
    pub fn check_version(&self) -> Result<(), ClientError> {
        if self.unsupported {
            return Ok(());
        }
        if self.server_major_version > MAX_SUPPORTED_SERVER_VERSION {
            return Err(ClientError::UnsupportedVersion(format!(
                "host version {} is too new: upgrade client or downgrade server",
                self.app_version
            )));
        }
        if self.server_major_version < MIN_SUPPORTED_SERVER_VERSION {
            return Err(ClientError::UnsupportedVersion(format!(
                "host version {} is too old: upgrade server",
                self.app_version
            )));
        }
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.current_game != 0
    }
}

/// Leading integer of a dotted version such as `7.1.431.-1`; 0 if none.
pub fn parse_major_version(version: &str) -> u32 {
    let digits: String = version
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

impl<T: Transport> GameStreamClient<T> {
    /// Query `/serverinfo` on `address` and build its descriptor.
    ///
    /// Exactly two attempts: HTTPS on the control port, then HTTP on the
    /// legacy port. Any failure of the first attempt (transport, error status,
    /// missing field) moves on to the second; the second attempt's error is
    /// returned if it fails too. A malformed address fails before either.
    pub async fn resolve(
        &self,
        address: &str,
        allow_unsupported: bool,
    ) -> Result<ServerDescriptor, ClientError> {
        validate_address(address)?;
        let server = match self.fetch_server_info(address, Scheme::Https, allow_unsupported).await {
            Ok(server) => server,
            Err(e) => {
                tracing::warn!(address, error = %e, "serverinfo over HTTPS failed, retrying over HTTP");
                self.fetch_server_info(address, Scheme::Http, allow_unsupported)
                    .await?
            }
        };

        server.check_version()?;
        tracing::debug!(
            address,
            version = %server.app_version,
            paired = server.paired,
            current_game = server.current_game,
            "resolved server"
        );
        Ok(server)
    }

    /// Re-resolve `server` in place, keeping its override flag.
    pub async fn refresh(&self, server: &mut ServerDescriptor) -> Result<(), ClientError> {
        *server = self.resolve(&server.address, server.unsupported).await?;
        Ok(())
    }

    async fn fetch_server_info(
        &self,
        address: &str,
        scheme: Scheme,
        unsupported: bool,
    ) -> Result<ServerDescriptor, ClientError> {
        let info = self.request(self.url(scheme, address, "serverinfo")).await?;
        ServerDescriptor::from_server_info(address, &info, unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(body: &str) -> XmlResponse {
        XmlResponse::parse(format!(r#"<root status_code="200">{body}</root>"#).as_bytes()).unwrap()
    }

    fn descriptor(version: u32, unsupported: bool) -> ServerDescriptor {
        let xml = info(&format!(
            "<currentgame>0</currentgame><PairStatus>0</PairStatus>\
             <appversion>{version}.1.431.-1</appversion><state>SUNSHINE_SERVER_FREE</state>"
        ));
        ServerDescriptor::from_server_info("host", &xml, unsupported).unwrap()
    }

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("7.1.431.-1"), 7);
        assert_eq!(parse_major_version("12"), 12);
        assert_eq!(parse_major_version("abc"), 0);
        assert_eq!(parse_major_version(""), 0);
    }

    #[test]
    fn test_full_server_info() {
        let xml = info(
            "<hostname>PC</hostname><appversion>7.1.431.-1</appversion>\
             <GfeVersion>3.23.0.74</GfeVersion><PairStatus>1</PairStatus>\
             <currentgame>881448767</currentgame><state>SUNSHINE_SERVER_BUSY</state>\
             <gputype>GeForce RTX 3080</gputype><GsVersion>7.1.0</GsVersion>\
             <ServerCodecModeSupport>259</ServerCodecModeSupport>\
             <SupportedDisplayMode>\
               <DisplayMode><Width>1920</Width><Height>1080</Height><RefreshRate>60</RefreshRate></DisplayMode>\
               <DisplayMode><Width>3840</Width><Height>2160</Height><RefreshRate>120</RefreshRate></DisplayMode>\
             </SupportedDisplayMode>",
        );
        let server = ServerDescriptor::from_server_info("10.0.0.2", &xml, false).unwrap();
        assert!(server.paired);
        assert_eq!(server.current_game, 881448767);
        assert!(server.supports_4k);
        assert_eq!(server.server_major_version, 7);
        assert_eq!(server.gfe_version.as_deref(), Some("3.23.0.74"));
        assert_eq!(server.gpu_type.as_deref(), Some("GeForce RTX 3080"));
        assert_eq!(
            server.display_modes,
            vec![
                DisplayMode { width: 1920, height: 1080, refresh: 60 },
                DisplayMode { width: 3840, height: 2160, refresh: 120 },
            ]
        );
    }

    #[test]
    fn test_current_game_forced_to_zero_when_not_busy() {
        let xml = info(
            "<currentgame>42</currentgame><PairStatus>1</PairStatus>\
             <appversion>7.1</appversion><state>SUNSHINE_SERVER_FREE</state>",
        );
        let server = ServerDescriptor::from_server_info("h", &xml, false).unwrap();
        assert_eq!(server.current_game, 0);
        assert!(!server.is_busy());
        assert!(!server.supports_4k);
        assert!(server.display_modes.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let xml = info("<currentgame>0</currentgame><PairStatus>1</PairStatus><state>x</state>");
        assert!(matches!(
            ServerDescriptor::from_server_info("h", &xml, false),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_empty_required_field() {
        let xml = info(
            "<currentgame></currentgame><PairStatus>1</PairStatus>\
             <appversion>7.1</appversion><state>x</state>",
        );
        assert!(ServerDescriptor::from_server_info("h", &xml, false).is_err());
    }

    #[test]
    fn test_malformed_display_mode_is_skipped() {
        let xml = info(
            "<currentgame>0</currentgame><PairStatus>0</PairStatus>\
             <appversion>7.1</appversion><state>x</state>\
             <DisplayMode><Width>wide</Width><Height>1080</Height><RefreshRate>60</RefreshRate></DisplayMode>\
             <DisplayMode><Width>1280</Width><Height>720</Height><RefreshRate>60</RefreshRate></DisplayMode>",
        );
        let server = ServerDescriptor::from_server_info("h", &xml, false).unwrap();
        assert_eq!(server.display_modes, vec![DisplayMode { width: 1280, height: 720, refresh: 60 }]);
    }

    #[test]
    fn test_version_gate_boundaries() {
        assert!(descriptor(MIN_SUPPORTED_SERVER_VERSION, false).check_version().is_ok());
        assert!(descriptor(MAX_SUPPORTED_SERVER_VERSION, false).check_version().is_ok());

        let too_old = descriptor(MIN_SUPPORTED_SERVER_VERSION - 1, false).check_version();
        match too_old {
            Err(ClientError::UnsupportedVersion(msg)) => assert!(msg.contains("upgrade server")),
            other => panic!("unexpected: {other:?}"),
        }

        let too_new = descriptor(MAX_SUPPORTED_SERVER_VERSION + 1, false).check_version();
        match too_new {
            Err(ClientError::UnsupportedVersion(msg)) => {
                assert!(msg.contains("upgrade client or downgrade server"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_version_gate_override() {
        assert!(descriptor(MAX_SUPPORTED_SERVER_VERSION + 1, true).check_version().is_ok());
        assert!(descriptor(1, true).check_version().is_ok());
    }
}
