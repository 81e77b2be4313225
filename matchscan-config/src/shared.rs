use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use anyhow::Context;
use matchscan_core::ScannerTuning;

use crate::models::{ConfigSource, MatchScanConfig};

/// Live configuration handle shared by the scanner and whatever triggers
/// reloads. Partition refreshes read the tuning knobs through
/// [`ScannerTuning`], so a reload takes effect on the next partition.
#[derive(Clone)]
pub struct SharedScannerConfig {
    inner: Arc<RwLock<MatchScanConfig>>,
    source: ConfigSource,
}

impl fmt::Debug for SharedScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedScannerConfig")
            .field("source", &self.source)
            .field("config", &*self.read())
            .finish()
    }
}

impl SharedScannerConfig {
    pub fn new(config: MatchScanConfig, source: ConfigSource) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            source,
        }
    }

    pub fn load_from_env() -> anyhow::Result<Self> {
        let (config, source) = MatchScanConfig::load_from_env()?;
        Ok(Self::new(config, source))
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub fn snapshot(&self) -> MatchScanConfig {
        self.read().clone()
    }

    /// Swaps in `config` after validating it.
    pub fn replace(&self, config: MatchScanConfig) -> anyhow::Result<()> {
        config.validate()?;
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
        Ok(())
    }

    /// Re-reads the backing file. Returns whether anything changed;
    /// configurations without a file never change.
    pub fn reload(&self) -> anyhow::Result<bool> {
        let Some(path) = self.source.path() else {
            return Ok(false);
        };

        let mut fresh =
            MatchScanConfig::load_from_file(path).with_context(|| {
                format!("failed to reload configuration from {}", path.display())
            })?;
        {
            let current = self.read();
            // Keep values that did not come from the file.
            if fresh.battle_net.api_key.is_empty() {
                fresh.battle_net.api_key = current.battle_net.api_key.clone();
            }
            if *current == fresh {
                return Ok(false);
            }
        }

        self.replace(fresh)?;
        tracing::info!(path = %path.display(), "reloaded configuration");
        Ok(true)
    }

    fn read(&self) -> RwLockReadGuard<'_, MatchScanConfig> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ScannerTuning for SharedScannerConfig {
    fn refresh_max_parallelism(&self) -> Option<usize> {
        self.read().scanner.refresh_max_parallelism
    }
}
