//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gsc_core::audio::AudioConfiguration;
use gsc_core::session::MAX_LAUNCH_FPS;
use gsc_core::{Pin, ServerDescriptor, StreamLaunchRequest};

use crate::config::{CliOverrides, Config};
use crate::context::{find_app, ControllerContext};
use crate::output::{LaunchResult, OutputFormat, OutputFormatter, SuccessMessage};
use crate::ExitCode;

/// GSC Controller CLI - GameStream host control
#[derive(Parser, Debug)]
#[command(name = "gsc-controller")]
#[command(version, about = "GSC Controller CLI - pair with and control GameStream hosts")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: table, json, quiet (overrides config)
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug mode (protocol-level tracing)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the client identity and certificate
    #[arg(long, global = true, env = "GSC_KEY_DIR")]
    pub key_dir: Option<PathBuf>,

    /// Device name shown on the host while pairing
    #[arg(long, global = true)]
    pub device_name: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Accept host versions and stream modes the host does not advertise
    #[arg(long, global = true)]
    pub unsupported: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show host status and capabilities
    Info(HostArgs),
    /// Pair with a host using a PIN
    Pair(PairArgs),
    /// Remove this client from the host's paired list
    Unpair(HostArgs),
    /// List the host's apps
    List(HostArgs),
    /// Launch an app, or resume the one already running
    Launch(LaunchArgs),
    /// Quit the running app
    Quit(HostArgs),
    /// Show this client's identity
    Identity,
}

/// Arguments for commands that only need a host
#[derive(Args, Debug)]
pub struct HostArgs {
    /// Host name or IP address
    pub host: String,
}

/// Arguments for the pair command
#[derive(Args, Debug)]
pub struct PairArgs {
    /// Host name or IP address
    pub host: String,

    /// 4-digit PIN to use (random if omitted)
    #[arg(long)]
    pub pin: Option<String>,
}

/// Arguments for the launch command
#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Host name or IP address
    pub host: String,

    /// App ID or title
    pub app: String,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Do not let the host apply optimal playback settings
    #[arg(long)]
    pub no_sops: bool,

    /// Keep playing audio on the host
    #[arg(long)]
    pub local_audio: bool,

    /// Bitmap of attached gamepads
    #[arg(long, default_value_t = 0)]
    pub gamepads: u32,

    /// Audio layout: stereo, 5.1, 7.1
    #[arg(long, default_value = "stereo")]
    pub audio: AudioConfiguration,
}

impl LaunchArgs {
    pub fn stream_request(&self) -> StreamLaunchRequest {
        StreamLaunchRequest {
            width: self.width,
            height: self.height,
            fps: self.fps,
            sops: !self.no_sops,
            local_audio: self.local_audio,
            gamepad_mask: self.gamepads,
            audio: self.audio,
        }
    }
}

impl Cli {
    /// Overrides carried by the global flags
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            output_format: self.output.map(|f| f.to_string()),
            verbose: self.verbose.then_some(true),
            debug: self.debug.then_some(true),
            key_dir: self.key_dir.clone(),
            device_name: self.device_name.clone(),
            timeout_seconds: self.timeout,
            allow_unsupported: self.unsupported.then_some(true),
        }
    }

    /// Execute the CLI command with a pre-loaded configuration
    pub async fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        let formatter = formatter_for(&config);

        match self.command {
            Commands::Identity => {
                let ctx = ControllerContext::load(config)?;
                println!("{}", formatter.format_identity(&ctx.credentials.display_info()));
                Ok(ExitCode::Success)
            }
            Commands::Info(args) => {
                let ctx = ControllerContext::load(config)?;
                let client = ctx.client()?;
                formatter.progress(&format!("Querying {}...", args.host));
                let server = ctx.resolve(&client, &args.host).await?;
                println!("{}", formatter.format_server(&server));
                Ok(ExitCode::Success)
            }
            Commands::Pair(args) => args.execute(config, &formatter).await,
            Commands::Unpair(args) => {
                let ctx = ControllerContext::load(config)?;
                let client = ctx.client()?;
                let mut server = ctx.resolve(&client, &args.host).await?;
                client.unpair(&mut server).await?;
                formatter.success(&format!("Unpaired from {}", server.address));
                print_json(&formatter, &SuccessMessage::new("unpaired"), "unpair");
                Ok(ExitCode::Success)
            }
            Commands::List(args) => {
                let ctx = ControllerContext::load(config)?;
                let client = ctx.client()?;
                let server = ctx.resolve(&client, &args.host).await?;
                if !require_paired(&server, &formatter) {
                    return Ok(ExitCode::NotPaired);
                }
                let apps = client.list_apps(&server).await?;
                println!("{}", formatter.format_apps(&apps));
                Ok(ExitCode::Success)
            }
            Commands::Launch(args) => args.execute(config, &formatter).await,
            Commands::Quit(args) => {
                let ctx = ControllerContext::load(config)?;
                let client = ctx.client()?;
                let mut server = ctx.resolve(&client, &args.host).await?;
                if !require_paired(&server, &formatter) {
                    return Ok(ExitCode::NotPaired);
                }
                client.quit(&mut server).await?;
                formatter.success(&format!("Quit the running app on {}", server.address));
                print_json(&formatter, &SuccessMessage::new("quit"), "quit");
                Ok(ExitCode::Success)
            }
        }
    }
}

impl PairArgs {
    pub async fn execute(self, config: Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let pin = match self.pin.as_deref() {
            Some(text) => match text.parse::<Pin>() {
                Ok(pin) => pin,
                Err(e) => {
                    formatter.error(&e.to_string());
                    return Ok(ExitCode::InvalidInput);
                }
            },
            None => Pin::generate()?,
        };

        let ctx = ControllerContext::load(config)?;
        let client = ctx.pairing_client()?;
        let mut server = ctx.resolve(&client, &self.host).await?;

        if server.paired {
            formatter.success(&format!("Already paired with {}", server.address));
            print_json(formatter, &SuccessMessage::new("already paired"), "pair");
            return Ok(ExitCode::Success);
        }

        if !formatter.is_quiet() {
            eprintln!("Enter PIN {pin} on {} to complete pairing", server.address);
        }
        formatter.progress("Waiting for the host...");
        client.pair(&mut server, &pin).await?;

        formatter.success(&format!("Paired with {}", server.address));
        print_json(formatter, &SuccessMessage::new("paired"), "pair");
        Ok(ExitCode::Success)
    }
}

impl LaunchArgs {
    pub async fn execute(self, config: Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let ctx = ControllerContext::load(config)?;
        let client = ctx.client()?;
        let mut server = ctx.resolve(&client, &self.host).await?;
        if !require_paired(&server, formatter) {
            return Ok(ExitCode::NotPaired);
        }

        let apps = client.list_apps(&server).await?;
        let Some(app) = find_app(&apps, &self.app) else {
            formatter.error(&format!("No app named or numbered '{}' on {}", self.app, server.address));
            return Ok(ExitCode::InvalidInput);
        };

        let resumed = server.is_busy();
        if resumed && server.current_game != app.id {
            formatter.error(&format!(
                "Another app ({}) is running on {}; quit it first",
                server.current_game, server.address
            ));
            return Ok(ExitCode::WrongState);
        }

        let request = self.stream_request();
        if !resumed && request.fps > MAX_LAUNCH_FPS {
            formatter.warning(&format!(
                "{} fps is above {MAX_LAUNCH_FPS}; the host will choose the frame rate",
                request.fps
            ));
        }
        formatter.progress(&format!(
            "{} {}...",
            if resumed { "Resuming" } else { "Launching" },
            app.title
        ));
        let key = client.launch_or_resume(&mut server, app.id, &request).await?;

        println!(
            "{}",
            formatter.format_launch(&LaunchResult {
                app,
                resumed,
                request: &request,
                key: &key,
            })
        );
        Ok(ExitCode::Success)
    }
}

/// Build the formatter described by `config`.
pub fn formatter_for(config: &Config) -> OutputFormatter {
    OutputFormatter::new(
        config.output.format.parse().unwrap_or_default(),
        config.output.verbose,
    )
}

fn require_paired(server: &ServerDescriptor, formatter: &OutputFormatter) -> bool {
    if !server.paired {
        formatter.error(&format!(
            "Not paired with {}; run `gsc-controller pair {}` first",
            server.address, server.address
        ));
    }
    server.paired
}

fn print_json(formatter: &OutputFormatter, message: &SuccessMessage, command: &str) {
    if formatter.format() == OutputFormat::Json {
        println!("{}", formatter.format_success(message, command));
    }
}
