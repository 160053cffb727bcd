// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::credential::Account;

/// Default renew-within threshold (30 minutes).
pub const DEFAULT_RENEW_WITHIN_SECS: i64 = 1800;

/// Keeps AWS credentials for SSO-backed accounts fresh.
#[derive(Debug, Parser)]
#[command(name = "awsllama", version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Subcommand to run; `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the local server and refresh scheduler until interrupted.
    Serve,
    /// Make a one-time refresh, starting a server if none is running.
    Refresh,
    /// Show credentials held by a running server.
    Status,
    /// Install as a launchd service (macOS only).
    Install {
        /// Alternative executable for the service.
        #[arg(long)]
        executable: Option<PathBuf>,
    },
    /// Start the installed launchd service.
    Start,
}

/// Flags and environment shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "AWSLLAMA_HOST")]
    pub host: String,

    /// Port to listen on. Also fixes the SSO callback URL registered with the IdP.
    #[arg(long, default_value_t = 2600, env = "AWSLLAMA_PORT")]
    pub port: u16,

    /// Path to the JSON account configuration [default: ~/.awsllama/config.json].
    #[arg(long, env = "AWSLLAMA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shared credentials file to manage [default: ~/.aws/credentials].
    #[arg(long, env = "AWSLLAMA_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Persistent browser profile directory [default: ~/.awsllama/chrome].
    #[arg(long, env = "AWSLLAMA_BROWSER_DATA_DIR")]
    pub browser_data_dir: Option<PathBuf>,

    /// Seconds between refresh ticks.
    #[arg(long, default_value_t = 300, env = "AWSLLAMA_REFRESH_INTERVAL_SECS")]
    pub refresh_interval_secs: u64,

    /// Renew credentials expiring within this many seconds (overrides the file).
    #[arg(long, env = "AWSLLAMA_RENEW_WITHIN_SECS", allow_negative_numbers = true)]
    pub renew_within_secs: Option<i64>,

    /// Log format (json or text).
    #[arg(long, env = "AWSLLAMA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AWSLLAMA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command used to run the Playwright bridge script.
    #[arg(long, env = "AWSLLAMA_BROWSER_BRIDGE", default_value = "node")]
    pub browser_bridge: String,

    /// Browser channel handed to Playwright.
    #[arg(long, env = "AWSLLAMA_BROWSER_CHANNEL", default_value = "chrome")]
    pub browser_channel: String,
}

impl Config {
    /// Checks that need no filesystem access.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("--refresh-interval-secs must be positive");
        }
        if let Some(secs) = self.renew_within_secs {
            if secs < 0 {
                anyhow::bail!("--renew-within-secs must not be negative");
            }
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {}:{}: {e}", self.host, self.port))
    }

    /// Base URL the browser and IdP see for this server.
    pub fn root_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| state_dir().join("config.json"))
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| home_dir().join(".aws").join("credentials"))
    }

    pub fn browser_data_path(&self) -> PathBuf {
        self.browser_data_dir.clone().unwrap_or_else(|| state_dir().join("chrome"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Build a `Config` for tests (port 0, paths under `dir`).
    #[doc(hidden)]
    pub fn test(dir: &Path) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            config: Some(dir.join("config.json")),
            credentials_file: Some(dir.join("credentials")),
            browser_data_dir: Some(dir.join("chrome")),
            refresh_interval_secs: 300,
            renew_within_secs: None,
            log_format: "text".into(),
            log_level: "debug".into(),
            browser_bridge: "node".into(),
            browser_channel: "chrome".into(),
        }
    }
}

/// Contents of the JSON account configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew_within_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
    }
}

/// IdP login used for form auto-fill.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub accounts: Vec<Account>,
    pub renew_within_secs: i64,
    pub login: Option<LoginCredentials>,
    pub root_url: String,
    pub listen_addr: SocketAddr,
    pub credentials_path: PathBuf,
    pub browser_data_dir: PathBuf,
    pub browser_bridge: String,
    pub browser_channel: String,
    pub refresh_interval: Duration,
}

impl Settings {
    /// Read the account file named by `config` and validate the result.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let file = FileConfig::load(&config.config_path())?;
        Self::from_parts(config, file)
    }

    pub fn from_parts(config: &Config, file: FileConfig) -> anyhow::Result<Self> {
        config.validate()?;
        validate_accounts(&file.accounts)?;

        let renew_within_secs = config
            .renew_within_secs
            .or(file.renew_within_secs)
            .unwrap_or(DEFAULT_RENEW_WITHIN_SECS);
        if renew_within_secs < 0 {
            anyhow::bail!("renew_within_secs must not be negative");
        }

        let login = match (file.username, file.password) {
            (Some(username), Some(password)) => Some(LoginCredentials { username, password }),
            (None, None) => None,
            _ => anyhow::bail!("username and password must be configured together"),
        };

        Ok(Self {
            accounts: file.accounts,
            renew_within_secs,
            login,
            root_url: config.root_url(),
            listen_addr: config.listen_addr()?,
            credentials_path: config.credentials_path(),
            browser_data_dir: config.browser_data_path(),
            browser_bridge: config.browser_bridge.clone(),
            browser_channel: config.browser_channel.clone(),
            refresh_interval: config.refresh_interval(),
        })
    }

    /// Nickname of the configured account using `metadata_url`.
    pub fn nickname_for(&self, metadata_url: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.metadata_url == metadata_url)
            .map(|a| a.nickname.as_str())
            .filter(|n| !n.is_empty())
    }
}

fn validate_accounts(accounts: &[Account]) -> anyhow::Result<()> {
    if accounts.is_empty() {
        anyhow::bail!("no accounts configured");
    }
    let mut seen = HashSet::new();
    for account in accounts {
        let url = url::Url::parse(&account.metadata_url)
            .map_err(|e| anyhow::anyhow!("invalid metadata_url {}: {e}", account.metadata_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("metadata_url must be http(s): {}", account.metadata_url);
        }
        if !seen.insert(account.metadata_url.as_str()) {
            anyhow::bail!("duplicate metadata_url: {}", account.metadata_url);
        }
    }
    Ok(())
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_default())
}

/// `~/.awsllama`: default home of the config file, browser profile, and service logs.
pub fn state_dir() -> PathBuf {
    home_dir().join(".awsllama")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
