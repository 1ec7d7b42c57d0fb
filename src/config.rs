// Optional JSON config file, overridden by flags or `PROJECTDESK_*` env vars.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory holding one JSON file per persisted key.
    pub data_dir: PathBuf,
    /// Upper bound for one preview fetch. `None` keeps the HTTP client defaults.
    pub preview_timeout_secs: Option<u64>,
    /// Start with the sample projects, todos and files.
    pub demo_data: bool,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3030)),
            data_dir: PathBuf::from("projectdesk-data"),
            preview_timeout_secs: None,
            demo_data: false,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn preview_timeout(&self) -> Option<Duration> {
        self.preview_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub fn command() -> Command {
    Command::new("projectdesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Local-first project dashboard server with link previews")
        .arg(
            Arg::new("config")
                .long("config")
                .env("PROJECTDESK_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .help("JSON config file"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .env("PROJECTDESK_BIND")
                .value_parser(value_parser!(SocketAddr))
                .help("Address to listen on [default: 127.0.0.1:3030]"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .env("PROJECTDESK_DATA_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory for persisted settings and notes [default: ./projectdesk-data]"),
        )
        .arg(
            Arg::new("preview-timeout")
                .long("preview-timeout")
                .env("PROJECTDESK_PREVIEW_TIMEOUT")
                .value_parser(value_parser!(u64))
                .help("Timeout in seconds for link preview fetches"),
        )
        .arg(
            Arg::new("demo-data")
                .long("demo-data")
                .env("PROJECTDESK_DEMO_DATA")
                .action(ArgAction::SetTrue)
                .help("Start with sample projects, todos and files"),
        )
        .arg(
            Arg::new("strict-cors")
                .long("strict-cors")
                .env("PROJECTDESK_STRICT_CORS")
                .action(ArgAction::SetTrue)
                .help("Do not send permissive CORS headers"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .env("PROJECTDESK_LOG_FORMAT")
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Log output format"),
        )
}

/// Build the effective config: file (if any), then explicit flags on top.
pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<(ServerConfig, LogFormat)> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = matches.get_one::<SocketAddr>("bind") {
        config.bind = *bind;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config.data_dir = dir.clone();
    }
    if let Some(secs) = matches.get_one::<u64>("preview-timeout") {
        config.preview_timeout_secs = Some(*secs);
    }
    if matches.get_flag("demo-data") {
        config.demo_data = true;
    }
    if matches.get_flag("strict-cors") {
        config.cors_permissive = false;
    }

    let log_format = match matches.get_one::<String>("log-format").map(String::as_str) {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    };
    Ok((config, log_format))
}
