use anyhow::{Context, anyhow, bail};
use matchscan_core::providers::BattleNetSettings;
use matchscan_core::{DispatcherSettings, ScannerSettings};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const CONFIG_PATH_VAR: &str = "MATCHSCAN_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "MATCHSCAN_CONFIG_JSON";
pub const API_KEY_VAR: &str = "BATTLENET_API_KEY";

const CANDIDATES: &[&str] = &[
    "matchscan.toml",
    "matchscan.json",
    "config/matchscan.toml",
    "config/matchscan.json",
];

fn default_worker_id() -> String {
    format!("scanner-{}", uuid::Uuid::now_v7().simple())
}

/// Encoding of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" | "tml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Documents without a telling extension are JSON when they open with a
    /// brace and TOML otherwise.
    fn sniff(contents: &str) -> Self {
        if contents.trim_start().starts_with('{') {
            ConfigFormat::Json
        } else {
            ConfigFormat::Toml
        }
    }

    fn decode(self, contents: &str) -> anyhow::Result<MatchScanConfig> {
        match self {
            ConfigFormat::Toml => {
                toml::from_str(contents).map_err(|err| anyhow!("toml: {err}"))
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|err| anyhow!("json: {err}"))
            }
        }
    }
}

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl ConfigSource {
    /// File backing the configuration, if it can be re-read.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
                Some(path)
            }
            ConfigSource::Default | ConfigSource::EnvInline => None,
        }
    }

    /// Format the source is known to use. `None` when it has to be sniffed
    /// from the contents.
    pub fn format(&self) -> Option<ConfigFormat> {
        match self {
            ConfigSource::EnvInline => Some(ConfigFormat::Json),
            ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
                ConfigFormat::from_extension(path)
            }
            ConfigSource::Default => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            ConfigSource::Default => "built-in defaults".to_string(),
            ConfigSource::EnvInline => format!("${CONFIG_JSON_VAR}"),
            ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
                path.display().to_string()
            }
        }
    }

    /// Decodes `contents` as this source's document.
    pub fn decode(&self, contents: &str) -> anyhow::Result<MatchScanConfig> {
        self.format()
            .unwrap_or_else(|| ConfigFormat::sniff(contents))
            .decode(contents)
            .with_context(|| format!("invalid matchscan config {}", self.describe()))
    }

    /// Reads and decodes the source, then applies `$BATTLENET_API_KEY` from
    /// `lookup`. Values are not validated here.
    pub fn resolve(
        &self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<MatchScanConfig> {
        let mut config = match self {
            ConfigSource::Default => MatchScanConfig::default(),
            ConfigSource::EnvInline => {
                let raw = lookup(CONFIG_JSON_VAR).unwrap_or_default();
                self.decode(&raw)?
            }
            ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
                let contents = fs::read_to_string(path).with_context(|| {
                    format!("failed to read matchscan config from {}", path.display())
                })?;
                self.decode(&contents)?
            }
        };

        if let Some(key) = lookup(API_KEY_VAR)
            && !key.trim().is_empty()
        {
            config.battle_net.api_key = key.trim().to_string();
        }
        Ok(config)
    }
}

/// Everything a matchscan process reads at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchScanConfig {
    /// Participant label this process uses on distributed tasks.
    pub worker_id: String,
    pub scanner: ScannerSettings,
    pub dispatcher: DispatcherSettings,
    pub battle_net: BattleNetSettings,
}

impl Default for MatchScanConfig {
    fn default() -> Self {
        Self {
            worker_id: default_worker_id(),
            scanner: ScannerSettings::default(),
            dispatcher: DispatcherSettings::default(),
            battle_net: BattleNetSettings::default(),
        }
    }
}

impl MatchScanConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$MATCHSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$MATCHSCAN_CONFIG_JSON` (inline JSON),
    /// 3) `matchscan.{toml,json}` or `config/matchscan.{toml,json}`,
    /// 4) defaults.
    ///
    /// `$BATTLENET_API_KEY` overrides the API key from any of these.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|key| env::var(key).ok(), Path::new("."))
    }

    /// [`Self::load_from_env`] with an explicit variable lookup and the
    /// directory default files are searched in.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        let source = Self::select_source(&lookup, base_dir);
        let config = source.resolve(&lookup)?;
        config.validate()?;
        tracing::debug!(?source, worker_id = %config.worker_id, "loaded configuration");
        Ok((config, source))
    }

    fn select_source(
        lookup: &impl Fn(&str) -> Option<String>,
        base_dir: &Path,
    ) -> ConfigSource {
        let present = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(path) = present(CONFIG_PATH_VAR) {
            return ConfigSource::EnvPath(PathBuf::from(path.trim()));
        }
        if present(CONFIG_JSON_VAR).is_some() {
            return ConfigSource::EnvInline;
        }
        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
            .map_or(ConfigSource::Default, ConfigSource::File)
    }

    /// Reads a single file without any environment overrides.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        ConfigSource::File(path.to_path_buf()).resolve(&|_| None)
    }

    /// Rejects values the scanner cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.trim().is_empty() {
            bail!("worker_id must not be empty");
        }
        if self.scanner.fetch_retry.max_attempts == 0
            || self.scanner.registration_retry.max_attempts == 0
        {
            bail!("retry policies need at least one attempt");
        }
        if self.scanner.refresh_max_parallelism == Some(0) {
            bail!("refresh_max_parallelism must be positive when set");
        }
        if self.scanner.partition_lease_ms == 0 {
            bail!("partition_lease_ms must be positive");
        }
        if self.dispatcher.max_attempts == 0 {
            bail!("dispatcher.max_attempts must be positive");
        }
        if self.dispatcher.min_backoff_ms > self.dispatcher.max_backoff_ms {
            bail!(
                "dispatcher.min_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.dispatcher.min_backoff_ms,
                self.dispatcher.max_backoff_ms
            );
        }
        Ok(())
    }
}
