use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use lib_parksync::SyncConfig;
use lib_parksync::realtime::ws_url_for_origin;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG_FILE: &str = "parksync.conf";

#[derive(Parser, Debug)]
#[command(about = "Parking occupancy and alert watcher", version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow the live channel (default).
    Watch,
    /// Work with the stored notification inbox.
    #[command(subcommand)]
    Inbox(InboxCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum InboxCommand {
    /// List stored notifications.
    List {
        #[arg(long, help = "Only unread notifications.")]
        unread: bool,
    },
    /// Mark one notification read.
    MarkRead { id: i64 },
    /// Mark every notification read.
    MarkAllRead,
    /// Delete every notification.
    Clear,
}

#[derive(Args, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[arg(long, env = "PARKSYNC_ORIGIN", help = "Origin of the parking web app, e.g. https://park.example.com.")]
    pub origin: Option<String>,

    #[arg(long, env = "PARKSYNC_WS_URL", help = "Explicit live-update endpoint; overrides the one derived from the origin.")]
    pub ws_url: Option<String>,

    #[arg(long, env = "PARKSYNC_API_BASE_URL", help = "Base URL of the REST API. Defaults to the origin.")]
    pub api_base_url: Option<String>,

    #[arg(long, env = "PARKSYNC_AUTH_TOKEN", help = "Bearer token for the REST API.", hide_env_values = true)]
    pub auth_token: Option<String>,

    #[arg(long, env = "PARKSYNC_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "PARKSYNC_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "PARKSYNC_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[arg(long, env = "PARKSYNC_RECONNECT_DELAY_MS", help = "Fixed delay in milliseconds before reconnecting.")]
    pub reconnect_delay_ms: Option<u64>,

    #[arg(long, env = "PARKSYNC_DEDUP_WINDOW_MS", help = "Milliseconds a violation stays suppressed after it alerted.")]
    pub dedup_window_ms: Option<u64>,

    #[arg(long, env = "PARKSYNC_LOG_CAPACITY", help = "Notifications kept in the local inbox.")]
    pub log_capacity: Option<usize>,

    #[arg(long, env = "PARKSYNC_BACKFILL", help = "Load stored notifications into the inbox at startup.")]
    pub backfill: Option<bool>,
}

/// Concrete settings after merging and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ws_url: Url,
    pub api_base_url: Option<String>,
    pub auth_token: Option<String>,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub sync: SyncConfig,
    pub backfill: bool,
}

impl Config {
    // 'other' wins wherever it has a value
    fn merge(self, other: Config) -> Config {
        Config {
            origin: other.origin.or(self.origin),
            ws_url: other.ws_url.or(self.ws_url),
            api_base_url: other.api_base_url.or(self.api_base_url),
            auth_token: other.auth_token.or(self.auth_token),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            dedup_window_ms: other.dedup_window_ms.or(self.dedup_window_ms),
            log_capacity: other.log_capacity.or(self.log_capacity),
            backfill: other.backfill.or(self.backfill),
        }
    }

    fn defaults() -> Config {
        let sync = SyncConfig::default();
        Config {
            origin: Some("http://localhost:8000".to_string()),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            reconnect_delay_ms: Some(sync.reconnect_delay.as_millis() as u64),
            dedup_window_ms: Some(sync.dedup_window.as_millis() as u64),
            log_capacity: Some(sync.log_capacity),
            backfill: Some(true),
            ..Default::default()
        }
    }

    /// Validates the merged values into [`Settings`].
    pub fn resolve(&self) -> Result<Settings> {
        let ws_url = match (&self.ws_url, &self.origin) {
            (Some(raw), _) => Url::parse(raw).with_context(|| format!("invalid live-update URL: {}", raw))?,
            (None, Some(origin)) => ws_url_for_origin(origin)?,
            (None, None) => bail!("either an origin or a live-update URL is required"),
        };
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            bail!("live-update URL must use ws or wss: {}", ws_url);
        }

        if self.reconnect_delay_ms == Some(0) {
            bail!("reconnect delay must be at least 1 ms");
        }

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            reconnect_delay: self
                .reconnect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            dedup_window: self
                .dedup_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.dedup_window),
            log_capacity: self.log_capacity.unwrap_or(defaults.log_capacity),
        };

        Ok(Settings {
            ws_url,
            api_base_url: self.api_base_url.clone().or_else(|| self.origin.clone()),
            auth_token: self.auth_token.clone(),
            log_dir: self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            sync,
            backfill: self.backfill.unwrap_or(true),
        })
    }
}

/// Layers defaults, then the config file, then env/CLI values.
pub fn load_config_from(cli_config: Config) -> Config {
    let config_file_path = cli_config
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => log::warn!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            },
            Err(e) => log::warn!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            ),
        }
    } else {
        log::info!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        );
    }

    current_config.merge(cli_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_when_no_file() {
        let cli = Config {
            config_path: Some(PathBuf::from("/nonexistent/parksync.conf")),
            ..Default::default()
        };
        let settings = load_config_from(cli).resolve().unwrap();

        assert_eq!(settings.ws_url.as_str(), "ws://localhost:8000/ws");
        assert_eq!(settings.api_base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(settings.sync, SyncConfig::default());
        assert!(settings.backfill);
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let file = config_file(
            r#"{"origin":"https://park.example.com","reconnectDelayMs":2500,"logLevel":"debug","backfill":false}"#,
        );
        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            log_level: Some("warn".to_string()),
            ..Default::default()
        };
        let settings = load_config_from(cli).resolve().unwrap();

        assert_eq!(settings.ws_url.as_str(), "wss://park.example.com/ws");
        assert_eq!(settings.sync.reconnect_delay, Duration::from_millis(2500));
        assert_eq!(settings.sync.dedup_window, Duration::from_millis(60_000));
        assert_eq!(settings.log_level, "warn");
        assert!(!settings.backfill);
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let file = config_file("{ not json");
        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let merged = load_config_from(cli);
        assert_eq!(merged.origin.as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn test_explicit_ws_url_wins_and_is_validated() {
        let config = Config {
            origin: Some("https://park.example.com".to_string()),
            ws_url: Some("ws://10.0.0.5:9000/ws".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve().unwrap().ws_url.as_str(), "ws://10.0.0.5:9000/ws");

        let bad = Config {
            ws_url: Some("http://10.0.0.5/ws".to_string()),
            ..Default::default()
        };
        assert!(bad.resolve().is_err());

        assert!(Config::default().resolve().is_err());
    }

    #[test]
    fn test_zero_reconnect_delay_is_rejected() {
        let zero = Config {
            origin: Some("http://localhost:8000".to_string()),
            reconnect_delay_ms: Some(0),
            ..Default::default()
        };
        assert!(zero.resolve().is_err());

        let one = Config {
            reconnect_delay_ms: Some(1),
            ..zero
        };
        assert_eq!(one.resolve().unwrap().sync.reconnect_delay, Duration::from_millis(1));
    }

    #[test]
    fn test_cli_parses_inbox_subcommand() {
        let cli = Cli::try_parse_from(["parksync-watch", "--origin", "http://h:1", "inbox", "mark-read", "7"]).unwrap();
        assert_eq!(cli.config.origin.as_deref(), Some("http://h:1"));
        assert_eq!(cli.command, Some(Command::Inbox(InboxCommand::MarkRead { id: 7 })));
    }
}
