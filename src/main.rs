//! Mixer Remote - interactive control client for a networked mixer bridge

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mixer_remote::channel::{ConnectionState, ControlChannelHandle, ReconnectBackoff};
use mixer_remote::cli::{self, ReplCommand};
use mixer_remote::config::AppConfig;
use mixer_remote::level::{Band, LevelReading};
use mixer_remote::protocol::ChannelId;
use mixer_remote::sink::{ConsoleSink, MixerView, StripState, ViewSnapshot};
use mixer_remote::sound::SoundEffectClient;

const DEFAULT_CONFIG: &str = "config.yaml";

/// Mixer Remote - move faders, mute channels and watch meters on a mixer bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when absent)
    #[arg(short, long)]
    config: Option<String>,

    /// Mixer bridge origin, overrides server.url
    #[arg(short, long, env = "MIXER_URL")]
    url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Also write logs to this file (rotated daily)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run without the interactive prompt until Ctrl+C
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Held for the process lifetime so buffered file logs are flushed
    let _log_guard = init_logging(&args)?;

    info!("Starting Mixer Remote v{}...", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.as_deref()).await?;
    if let Some(url) = &args.url {
        config.server.url = url.clone();
        config.validate().context("Invalid --url")?;
    }

    let endpoint = config.server.control_endpoint()?;
    info!("Mixer bridge: {}", endpoint);

    let view = MixerView::new(config.channels.clone());
    let (handle, channel_task) = ControlChannelHandle::spawn(
        endpoint,
        ReconnectBackoff::from_config(&config.reconnect),
        (view.clone(), ConsoleSink::new()),
    );
    let gong = SoundEffectClient::from_config(&config.server)?;

    handle.connect();

    run_app(&args, &handle, &view, &gong, shutdown_signal()).await;

    // Cleanup
    info!("Shutting down...");
    handle.disconnect();
    handle.shutdown();
    if tokio::time::timeout(Duration::from_secs(2), channel_task)
        .await
        .is_err()
    {
        warn!("Control channel did not stop in time");
    }

    info!("Mixer Remote shutdown complete");
    Ok(())
}

async fn load_config(path: Option<&str>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let config = AppConfig::load(path).await?;
            info!("Configuration loaded from {}", path);
            Ok(config)
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            let config = AppConfig::load(DEFAULT_CONFIG).await?;
            info!("Configuration loaded from {}", DEFAULT_CONFIG);
            Ok(config)
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(AppConfig::default())
        }
    }
}

async fn run_app(
    args: &Args,
    handle: &ControlChannelHandle,
    view: &MixerView,
    gong: &SoundEffectClient,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let interactive = !args.headless;
    let (command_tx, mut command_rx) = mpsc::channel::<ReplCommand>(16);

    if interactive {
        println!("{}", "Mixer Remote - type 'help' for commands".bold().cyan());
        // The prompt thread is not joined; it dies with the process
        let _ = cli::spawn_repl(command_tx);
    } else {
        drop(command_tx);
        info!("Running headless, press Ctrl+C to stop");
    }

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            command = command_rx.recv(), if interactive => {
                let Some(command) = command else {
                    break;
                };
                if !execute(command, handle, view, gong) {
                    break;
                }
            }

            _ = &mut shutdown => {
                break;
            }
        }
    }
}

/// Apply one REPL command; `false` means quit
fn execute(
    command: ReplCommand,
    handle: &ControlChannelHandle,
    view: &MixerView,
    gong: &SoundEffectClient,
) -> bool {
    match command {
        ReplCommand::Fader { channel, value } => {
            let id = resolve_channel(view, &channel);
            warn_if_offline(view);
            handle.send_fader(id, value);
        }
        ReplCommand::Mute { channel, muted } => {
            let id = resolve_channel(view, &channel);
            warn_if_offline(view);
            handle.send_mute(id, muted);
        }
        ReplCommand::Gong => {
            let gong = gong.clone();
            tokio::spawn(async move {
                match gong.trigger().await {
                    Ok(()) => println!("{}", "🔔 Gong!".green()),
                    Err(e) => {
                        warn!("Gong failed: {}", e);
                        println!("{} {}", "Gong failed:".red(), e);
                    }
                }
            });
        }
        ReplCommand::Status => print_status(&view.snapshot()),
        ReplCommand::Connect => handle.connect(),
        ReplCommand::Disconnect => handle.disconnect(),
        ReplCommand::Help => println!("{}", cli::HELP),
        ReplCommand::Quit => return false,
    }
    true
}

/// Map a typed name to a configured channel; unknown names are sent verbatim
fn resolve_channel(view: &MixerView, name: &str) -> ChannelId {
    view.resolve(name).unwrap_or_else(|| {
        println!("{} '{}' is not configured, sending as-is", "note:".yellow(), name);
        ChannelId::new(name)
    })
}

fn warn_if_offline(view: &MixerView) {
    let state = view.connection_state();
    if state != ConnectionState::Open {
        println!("{} connection is {}, change dropped", "note:".yellow(), state);
    }
}

fn print_status(snapshot: &ViewSnapshot) {
    let connection = match snapshot.connection {
        ConnectionState::Open => snapshot.connection.to_string().green(),
        ConnectionState::Connecting | ConnectionState::Reconnecting => {
            snapshot.connection.to_string().yellow()
        }
        ConnectionState::Disconnected => snapshot.connection.to_string().red(),
    };

    println!("\n{} {}", "Connection:".bold(), connection);
    println!("{} {}", "Syncs:".bold(), snapshot.ready_count);

    println!("\n{}", "Strips:".bold());
    for (id, strip) in &snapshot.strips {
        print_strip(id.as_str(), strip);
    }
    print_strip(ChannelId::MASTER, &snapshot.master);

    let (left, right) = snapshot.meters;
    println!(
        "\n{} L {}  R {}\n",
        "Meters:".bold(),
        format_level(left),
        format_level(right)
    );
}

fn print_strip(id: &str, strip: &StripState) {
    const WIDTH: usize = 20;
    let filled = (strip.fader * WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(WIDTH - filled.min(WIDTH)));
    let mute = if strip.muted {
        "MUTED".red().bold()
    } else {
        "on".green()
    };
    println!(
        "  {:<12} {:<12} [{}] {:>5.1}%  {}",
        strip.name.yellow(),
        id.dimmed(),
        bar,
        strip.fader * 100.0,
        mute
    );
}

fn format_level(level: LevelReading) -> ColoredString {
    let text = format!("{:>5.1}% ({})", level.percent, level.band);
    match level.band {
        Band::Low => text.green(),
        Band::Medium => text.yellow(),
        Band::High => text.red(),
    }
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level)
            .with_context(|| format!("Invalid log level '{}'", args.log_level))?,
    };

    let (file_writer, guard) = match &args.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("--log-file '{}' has no file name", path.display()))?;
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let console = (!args.log_json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });
    let console_json = args
        .log_json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let file = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(console_json)
        .with(file)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
