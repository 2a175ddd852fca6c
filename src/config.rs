//! Configuration file handling for jarview.
//!
//! The configuration file is stored at `$JARVIEW_HOME/config.json` and contains the base URL of
//! the budgeting API along with a few presentation defaults.

use crate::error::{ErrorType, IntoResult};
use crate::series::{Palette, TimeRange};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "jarview";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const TIMEOUT_SECS: u64 = 30;
const DEFAULT_DAYS: u32 = 7;
const RECENT_TRANSACTIONS: usize = 5;

/// The base URL used by the reference web UI.
pub const DEFAULT_BASE_URL: &str = "https://localhost:7042/api";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$JARVIEW_HOME` and from there it loads `$JARVIEW_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    base_url: Url,
}

impl Config {
    /// Creates the home directory and an initial `config.json` pointing at `base_url`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/jarview`
    /// - `base_url` - The base URL of the budgeting API, e.g. `https://localhost:7042/api`
    ///
    /// # Errors
    /// - Returns an error if the URL is invalid or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let base = parse_base_url(base_url).pub_result(ErrorType::Config)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the jarview home directory")
            .pub_result(ErrorType::Config)?;
        let root = utils::canonicalize(&maybe_relative)
            .await
            .pub_result(ErrorType::Config)?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            base_url: base_url.to_string(),
            ..ConfigFile::default()
        };
        config_file
            .save(&config_path)
            .await
            .pub_result(ErrorType::Config)?;

        Ok(Self {
            root,
            config_path,
            config_file,
            base_url: base,
        })
    }

    /// This will
    /// - validate that `jarview_home` and the config file exist
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(jarview_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(jarview_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(maybe_relative: PathBuf) -> anyhow::Result<Self> {
        if !maybe_relative.is_dir() {
            bail!(
                "The jarview home directory is missing '{}', run 'jarview init' first",
                maybe_relative.display()
            )
        }
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let base_url = parse_base_url(&config_file.base_url)
            .with_context(|| format!("Bad base_url in {}", config_path.display()))?;
        Ok(Self {
            root,
            config_path,
            config_file,
            base_url,
        })
    }

    /// Returns a copy of this configuration that talks to `base_url` instead of the configured
    /// URL. Nothing is written to disk.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url).pub_result(ErrorType::Config)?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The API base URL, always ending in `/` so that relative paths can be joined onto it.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.timeout_secs)
    }

    /// The time range shown when none is requested.
    pub fn default_time_range(&self) -> TimeRange {
        TimeRange::new(self.config_file.default_days).unwrap_or_default()
    }

    /// How many transactions the dashboard lists as recent.
    pub fn recent_transactions(&self) -> usize {
        self.config_file.recent_transactions
    }

    /// The series color palette.
    pub fn palette(&self) -> Palette {
        match &self.config_file.palette {
            Some(colors) => Palette::new(colors.iter().cloned()),
            None => Palette::default(),
        }
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "jarview",
///   "config_version": 1,
///   "base_url": "https://localhost:7042/api",
///   "timeout_secs": 30,
///   "default_days": 7,
///   "recent_transactions": 5,
///   "palette": ["#0088FE", "#00C49F"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "jarview"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the budgeting API
    base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// Number of days of history shown by default
    #[serde(default = "default_days")]
    default_days: u32,

    /// Number of transactions shown on the dashboard
    #[serde(default = "default_recent_transactions")]
    recent_transactions: usize,

    /// Colors assigned to series, cycled when there are more series than colors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    palette: Option<Vec<String>>,
}

fn default_timeout_secs() -> u64 {
    TIMEOUT_SECS
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn default_recent_transactions() -> usize {
    RECENT_TRANSACTIONS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: TIMEOUT_SECS,
            default_days: DEFAULT_DAYS,
            recent_transactions: RECENT_TRANSACTIONS,
            palette: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Config file version {} is newer than this program supports ({})",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

/// Parses an API base URL. Only absolute `http` and `https` URLs are accepted. The returned URL
/// path always ends in `/`, otherwise `Url::join` would drop the last path segment.
pub(crate) fn parse_base_url(s: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(s.trim()).with_context(|| format!("Invalid base URL '{s}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("Unsupported URL scheme '{other}' in '{s}', expected http or https"),
    }
    if url.cannot_be_a_base() {
        bail!("The URL '{s}' cannot be used as a base URL");
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
