//! Session control: app listing, launch/resume and quit.
//!
//! All calls go over HTTPS and rely on the host already trusting the client
//! certificate. A launch hands the host a fresh remote-input key; the caller
//! keeps the returned [`RemoteInputKey`] to encrypt input for that stream.

use zeroize::{Zeroize, ZeroizeOnDrop};

use gsc_crypto::encoding::to_hex;
use gsc_crypto::random::{random_bytes, random_u32};

use crate::audio::AudioConfiguration;
use crate::client::GameStreamClient;
use crate::errors::{ClientError, SessionError};
use crate::server::{DisplayMode, ServerDescriptor};
use crate::transport::{Scheme, Transport};

/// Highest frame rate passed through to the host; above it `0` is sent so
/// optimal playback settings keep the requested resolution.
pub const MAX_LAUNCH_FPS: u32 = 60;

/// Heights at or above this need 4K support on the host.
pub const UHD_MIN_HEIGHT: u32 = 2160;

const REMOTE_INPUT_KEY_LEN: usize = 16;

/// One launchable application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub id: u32,
    pub title: String,
}

/// Applications in the order the host lists them.
pub type AppList = Vec<AppInfo>;

/// Stream parameters for a launch or resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLaunchRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Let the host apply optimal playback settings
    pub sops: bool,
    /// Keep playing audio on the host
    pub local_audio: bool,
    /// Bitmap of attached gamepads
    pub gamepad_mask: u32,
    pub audio: AudioConfiguration,
}

impl Default for StreamLaunchRequest {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60,
            sops: true,
            local_audio: false,
            gamepad_mask: 0,
            audio: AudioConfiguration::Stereo,
        }
    }
}

impl StreamLaunchRequest {
    /// Frame rate as sent on the wire.
    pub fn wire_fps(&self) -> u32 {
        if self.fps > MAX_LAUNCH_FPS {
            0
        } else {
            self.fps
        }
    }

    fn mode(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.wire_fps())
    }
}

/// Key material the host uses to decrypt remote input for one stream.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RemoteInputKey {
    pub key: [u8; REMOTE_INPUT_KEY_LEN],
    /// Always zero.
    pub iv: [u8; REMOTE_INPUT_KEY_LEN],
    pub key_id: u32,
}

impl RemoteInputKey {
    pub fn generate() -> Result<Self, ClientError> {
        Ok(Self {
            key: random_bytes()?,
            iv: [0u8; REMOTE_INPUT_KEY_LEN],
            key_id: random_u32()?,
        })
    }
}

impl std::fmt::Debug for RemoteInputKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteInputKey")
            .field("key", &"<redacted>")
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Check `request` against what `server` can stream.
///
/// The override flag relaxes only the exact-mode check; optimal playback
/// settings still need a listed resolution and 4K still needs host support.
/// Rejections happen locally, before any request is sent.
pub fn validate_mode(server: &ServerDescriptor, request: &StreamLaunchRequest) -> Result<(), ClientError> {
    let matches_resolution =
        |m: &&DisplayMode| m.width == request.width && m.height == request.height;
    let supported_resolution = server.display_modes.iter().any(|m| matches_resolution(&m));
    let correct_mode = server
        .display_modes
        .iter()
        .filter(matches_resolution)
        .any(|m| m.refresh == request.fps);

    if !correct_mode && !server.unsupported {
        return Err(ClientError::NotSupportedMode);
    }
    if request.sops && !supported_resolution {
        return Err(ClientError::NotSupportedSopsResolution);
    }
    if request.height >= UHD_MIN_HEIGHT && !server.supports_4k {
        return Err(ClientError::NotSupported4k);
    }
    Ok(())
}

impl<T: Transport> GameStreamClient<T> {
    /// Fetch the host's applications.
    pub async fn list_apps(&self, server: &ServerDescriptor) -> Result<AppList, ClientError> {
        let resp = self
            .request(self.url(Scheme::Https, &server.address, "applist"))
            .await?;

        resp.records("App")
            .iter()
            .map(|app| -> Result<AppInfo, ClientError> {
                let title = app
                    .get("AppTitle")
                    .ok_or_else(|| ClientError::Protocol("app without <AppTitle>".into()))?;
                Ok(AppInfo {
                    id: app.number("ID")?,
                    title: title.to_string(),
                })
            })
            .collect()
    }

    /// Launch `app_id`, or resume the running game if there is one.
    ///
    /// Returns the remote-input key handed to the host for this stream.
    pub async fn launch_or_resume(
        &self,
        server: &mut ServerDescriptor,
        app_id: u32,
        request: &StreamLaunchRequest,
    ) -> Result<RemoteInputKey, ClientError> {
        let resuming = server.current_game != 0;
        if !resuming {
            validate_mode(server, request)?;
        }

        let input_key = RemoteInputKey::generate()?;
        let rikey = to_hex(&input_key.key);
        let surround_info = request.audio.surround_audio_info();

        let (url, field) = if resuming {
            let url = self
                .url(Scheme::Https, &server.address, "resume")
                .param("rikey", &rikey)
                .param("rikeyid", input_key.key_id)
                .param("surroundAudioInfo", surround_info);
            (url, "resume")
        } else {
            let url = self
                .url(Scheme::Https, &server.address, "launch")
                .param("appid", app_id)
                .param("mode", request.mode())
                .param("additionalStates", 1)
                .param("sops", u8::from(request.sops))
                .param("rikey", &rikey)
                .param("rikeyid", input_key.key_id)
                .param("localAudioPlayMode", u8::from(request.local_audio))
                .param("surroundAudioInfo", surround_info)
                .param("remoteControllersBitmap", request.gamepad_mask)
                .param("gcmap", request.gamepad_mask);
            (url, "gamesession")
        };

        let resp = self.request(url).await?;
        match resp.text(field) {
            Some(value) if !value.is_empty() && value != "0" => {}
            _ => {
                return Err(SessionError::LaunchFailed(format!(
                    "host did not start the session (<{field}>)"
                ))
                .into())
            }
        }

        server.current_game = app_id;
        tracing::info!(
            address = %server.address,
            app_id,
            resumed = resuming,
            "session started"
        );
        Ok(input_key)
    }

    /// Stop the running game.
    pub async fn quit(&self, server: &mut ServerDescriptor) -> Result<(), ClientError> {
        let resp = self
            .request(self.url(Scheme::Https, &server.address, "cancel"))
            .await?;
        match resp.text("cancel") {
            Some(value) if value != "0" => {}
            _ => return Err(SessionError::QuitFailed.into()),
        }

        server.current_game = 0;
        tracing::info!(address = %server.address, "session ended");
        Ok(())
    }
}
