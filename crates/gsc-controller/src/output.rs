//! Rendering of command results.
//!
//! `table` prints comfy-table grids for people, `json` prints one
//! [`JsonResponse`] document per result for scripts, and `quiet` prints
//! nothing so only the exit code speaks.

use std::fmt;
use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use gsc_core::{AppInfo, RemoteInputKey, ServerDescriptor, StreamLaunchRequest};

use crate::credentials::IdentityInfo;
use crate::ExitCode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Quiet => "quiet",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Table, Self::Json, Self::Quiet]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown output format '{s}' (expected table, json or quiet)"))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope shared by every JSON document the CLI prints.
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339, UTC
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn success_with_command(data: T, command: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

impl JsonResponse<()> {
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: now_rfc3339(),
            command: None,
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Payload for commands whose only result is that they worked.
#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    pub fn format_server(&self, server: &ServerDescriptor) -> String {
        self.render(|| self.server_table(server), &ServerOutput::from(server), "info")
    }

    pub fn format_apps(&self, apps: &[AppInfo]) -> String {
        self.render(|| self.apps_table(apps), &AppsOutput::from(apps), "list")
    }

    pub fn format_launch(&self, launch: &LaunchResult<'_>) -> String {
        self.render(|| self.launch_table(launch), &LaunchOutput::from(launch), "launch")
    }

    pub fn format_identity(&self, info: &IdentityInfo) -> String {
        self.render(|| self.identity_table(info), info, "identity")
    }

    /// JSON envelope for `data`; table and quiet output print nothing here.
    pub fn format_success<T: Serialize>(&self, data: &T, command: &str) -> String {
        self.render(String::new, data, command)
    }

    pub fn format_error_with_code(&self, error: &str, code: ExitCode) -> String {
        match self.format {
            OutputFormat::Table => format!("Error: {error}"),
            OutputFormat::Json => self.to_json(&ErrorOutput {
                success: false,
                error: error.to_string(),
                exit_code: code as i32,
                exit_code_name: code.name(),
                timestamp: now_rfc3339(),
            }),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Step-by-step narration, table output with `--verbose` only.
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("✓ {message}");
        }
    }

    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Table => eprintln!("✗ {message}"),
            OutputFormat::Json => println!("{}", self.to_json(&JsonResponse::<()>::error(message))),
            OutputFormat::Quiet => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Table => eprintln!("⚠ {message}"),
            OutputFormat::Json => eprintln!(
                "{}",
                self.to_json(&WarningOutput {
                    warning: message.to_string(),
                    timestamp: now_rfc3339(),
                })
            ),
            OutputFormat::Quiet => {}
        }
    }

    fn render<T: Serialize>(&self, table: impl FnOnce() -> String, data: &T, command: &str) -> String {
        match self.format {
            OutputFormat::Table => table(),
            OutputFormat::Json => self.to_json(&JsonResponse::success_with_command(data, command)),
            OutputFormat::Quiet => String::new(),
        }
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"success\": false, \"error\": \"serialization failed: {e}\"}}"))
    }

    fn server_table(&self, server: &ServerDescriptor) -> String {
        let mut rows = vec![
            ("Address", server.address.clone()),
            ("Paired", yes_no(server.paired).to_string()),
            ("Current Game", current_game(server.current_game)),
            ("App Version", server.app_version.clone()),
            ("Server Generation", server.server_major_version.to_string()),
        ];
        if let Some(gfe) = &server.gfe_version {
            rows.push(("GFE Version", gfe.clone()));
        }
        if let Some(gpu) = &server.gpu_type {
            rows.push(("GPU", gpu.clone()));
        }
        rows.push(("4K Support", yes_no(server.supports_4k).to_string()));
        if server.unsupported {
            rows.push(("Version Checks", "overridden".to_string()));
        }
        let modes: Vec<String> = server
            .display_modes
            .iter()
            .map(|m| format!("{}x{}@{}", m.width, m.height, m.refresh))
            .collect();
        rows.push((
            "Display Modes",
            if modes.is_empty() { "-".to_string() } else { modes.join("\n") },
        ));
        property_table(rows)
    }

    fn apps_table(&self, apps: &[AppInfo]) -> String {
        if apps.is_empty() {
            return "No apps found.".to_string();
        }

        let mut table = styled_table(["ID", "Title"]);
        for app in apps {
            table.add_row(vec![app.id.to_string(), app.title.clone()]);
        }
        table.to_string()
    }

    fn launch_table(&self, launch: &LaunchResult<'_>) -> String {
        property_table(vec![
            ("App", format!("{} ({})", launch.app.title, launch.app.id)),
            ("Action", (if launch.resumed { "resumed" } else { "launched" }).to_string()),
            ("Mode", mode_string(launch.request)),
            ("Audio", launch.request.audio.to_string()),
            ("Input Key ID", launch.key.key_id.to_string()),
        ])
    }

    fn identity_table(&self, info: &IdentityInfo) -> String {
        property_table(vec![
            ("Unique ID", info.unique_id.clone()),
            ("Cert Fingerprint", info.fingerprint.clone()),
            ("Key Directory", info.key_dir.clone()),
        ])
    }
}

fn styled_table(header: [&str; 2]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header.to_vec());
    table
}

fn property_table(rows: Vec<(&str, String)>) -> String {
    let mut table = styled_table(["Property", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    table.to_string()
}

/// What `launch` reports back. The input key itself is never printed.
pub struct LaunchResult<'a> {
    pub app: &'a AppInfo,
    pub resumed: bool,
    pub request: &'a StreamLaunchRequest,
    pub key: &'a RemoteInputKey,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn current_game(id: u32) -> String {
    if id == 0 {
        "none".to_string()
    } else {
        id.to_string()
    }
}

fn mode_string(request: &StreamLaunchRequest) -> String {
    format!("{}x{}@{}", request.width, request.height, request.fps)
}

// JSON output structures

#[derive(Serialize)]
struct ServerOutput {
    address: String,
    paired: bool,
    current_game: u32,
    busy: bool,
    app_version: String,
    server_major_version: u32,
    gfe_version: Option<String>,
    gpu_type: Option<String>,
    gs_version: Option<String>,
    supports_4k: bool,
    unsupported: bool,
    display_modes: Vec<DisplayModeJson>,
}

#[derive(Serialize)]
struct DisplayModeJson {
    width: u32,
    height: u32,
    refresh: u32,
}

impl From<&ServerDescriptor> for ServerOutput {
    fn from(s: &ServerDescriptor) -> Self {
        Self {
            address: s.address.clone(),
            paired: s.paired,
            current_game: s.current_game,
            busy: s.is_busy(),
            app_version: s.app_version.clone(),
            server_major_version: s.server_major_version,
            gfe_version: s.gfe_version.clone(),
            gpu_type: s.gpu_type.clone(),
            gs_version: s.gs_version.clone(),
            supports_4k: s.supports_4k,
            unsupported: s.unsupported,
            display_modes: s
                .display_modes
                .iter()
                .map(|m| DisplayModeJson {
                    width: m.width,
                    height: m.height,
                    refresh: m.refresh,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct AppsOutput {
    apps: Vec<AppJson>,
    count: usize,
}

#[derive(Serialize)]
struct AppJson {
    id: u32,
    title: String,
}

impl From<&[AppInfo]> for AppsOutput {
    fn from(apps: &[AppInfo]) -> Self {
        Self {
            count: apps.len(),
            apps: apps
                .iter()
                .map(|a| AppJson {
                    id: a.id,
                    title: a.title.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct LaunchOutput {
    app_id: u32,
    title: String,
    resumed: bool,
    mode: String,
    audio: String,
    rikey_id: u32,
}

impl From<&LaunchResult<'_>> for LaunchOutput {
    fn from(l: &LaunchResult<'_>) -> Self {
        Self {
            app_id: l.app.id,
            title: l.app.title.clone(),
            resumed: l.resumed,
            mode: mode_string(l.request),
            audio: l.request.audio.to_string(),
            rikey_id: l.key.key_id,
        }
    }
}

#[derive(Serialize)]
struct ErrorOutput {
    success: bool,
    error: String,
    exit_code: i32,
    exit_code_name: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct WarningOutput {
    warning: String,
    timestamp: String,
}
