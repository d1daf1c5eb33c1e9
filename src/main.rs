use adkit::config::{self, ConfigFormat, ConfigManager, Settings, ENV_FILE, SETTINGS_FILE};
use adkit::files::{get_project_root, DEFAULT_ROOT_MARKERS};
use adkit::server::{ServerConfig, StaticServer};
use adkit::text::{TextProcessor, DEFAULT_BUZZWORD_MIN_LENGTH};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adkit")]
#[command(about = "Shared utilities for ad-copy analysis: text features, config, static preview server")]
struct Cli {
    /// Settings file (defaults to adkit.toml at the project root)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a directory over HTTP with CORS enabled
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory to serve
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Name shown in the startup banner
        #[arg(long)]
        name: Option<String>,
        /// Don't open a browser once the server is up
        #[arg(long)]
        no_browser: bool,
    },
    /// Clean ad copy (tags, links, whitespace). Reads stdin when TEXT is omitted.
    Clean {
        text: Option<String>,
        #[arg(long)]
        remove_emojis: bool,
    },
    /// Print a JSON report of features, buzzwords, CTAs and sentiment signals
    Analyze {
        text: Option<String>,
        #[arg(long)]
        remove_emojis: bool,
        #[arg(long, default_value_t = DEFAULT_BUZZWORD_MIN_LENGTH)]
        min_length: usize,
    },
    /// Load a config file and print it as JSON
    Config {
        /// Config name, with or without extension
        name: String,
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// auto, json, yaml or toml
        #[arg(short, long, default_value = "auto")]
        format: ConfigFormat,
        /// Keys that must be present
        #[arg(long = "require")]
        required: Vec<String>,
    },
}

fn settings_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| get_project_root(&cwd, &DEFAULT_ROOT_MARKERS))
        .map(|root| root.join(SETTINGS_FILE))
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
}

fn read_input(text: Option<String>) -> Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read text from stdin")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load saved values from .env (real env vars take precedence)
    config::load_env_file(Path::new(ENV_FILE));

    let mut settings = Settings::load(&settings_path(cli.settings))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // After logging is up so rejected overrides are reported
    settings.apply_env_overrides();

    match cli.command {
        Command::Serve { host, port, dir, name, no_browser } => {
            let mut server = ServerConfig::from(&settings.server);
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            if dir.is_some() {
                server.root = dir;
            }
            if let Some(name) = name {
                server.service_name = name;
            }
            if no_browser {
                server.open_browser = false;
            }
            StaticServer::bind(server).await?.run().await?;
        }
        Command::Clean { text, remove_emojis } => {
            let input = read_input(text)?;
            println!("{}", TextProcessor::new().clean_text(&input, remove_emojis));
        }
        Command::Analyze { text, remove_emojis, min_length } => {
            let input = read_input(text)?;
            let report = TextProcessor::new().analyze(&input, remove_emojis, min_length);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Config { name, dir, format, required } => {
            let mut manager = ConfigManager::new(dir);
            let loaded = manager.load_config(&name, format, true)?;
            let keys: Vec<&str> = required.iter().map(String::as_str).collect();
            manager.validate_config(&loaded, &keys)?;
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        }
    }

    Ok(())
}
