//! hgw.toml configuration parser.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::ScriptKind;

/// Top-level configuration handed to the optimizer at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HgwConfig {
    pub slots: SlotsConfig,
    pub timing: TimingConfig,
    pub workers: WorkersConfig,
    pub simulation: Option<SimulationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsConfig {
    /// RAM (GB) consumed by one worker thread.
    pub ram_per_thread: f64,
    /// RAM (GB) kept free on `home`.
    pub home_reserve: f64,
    /// RAM (GB) kept free on specific hosts, added to `home_reserve` on `home`.
    pub reserve: HashMap<String, f64>,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            ram_per_thread: 1.75,
            home_reserve: 0.0,
            reserve: HashMap::new(),
        }
    }
}

impl SlotsConfig {
    /// RAM (GB) that must stay unused on `hostname`.
    pub fn reserve_for(&self, hostname: &str) -> f64 {
        let base = if hostname == "home" {
            self.home_reserve
        } else {
            0.0
        };
        base + self.reserve.get(hostname).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// ETAs are rounded up to a multiple of this.
    pub rounding_ms: u64,
    pub weaken_margin_ms: u64,
    pub grow_margin_ms: u64,
    /// Upper bound on a single wait between loop iterations.
    pub max_poll_interval_ms: u64,
    /// Wait used when every outstanding ETA is already in the past.
    pub fallback_wait_ms: u64,
    /// Stop converging after this many passes even if the target is not optimal.
    pub max_iterations: Option<u32>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rounding_ms: 100,
            weaken_margin_ms: ScriptKind::Weaken.default_margin_ms(),
            grow_margin_ms: ScriptKind::Grow.default_margin_ms(),
            max_poll_interval_ms: 10_000,
            fallback_wait_ms: 3_000,
            max_iterations: None,
        }
    }
}

impl TimingConfig {
    pub fn margin_for(&self, kind: ScriptKind) -> u64 {
        match kind {
            ScriptKind::Weaken => self.weaken_margin_ms,
            ScriptKind::Grow => self.grow_margin_ms,
            ScriptKind::Hack => kind.default_margin_ms(),
        }
    }
}

/// Worker script file per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub hack: String,
    pub grow: String,
    pub weaken: String,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            hack: "/hgw/hack.js".to_string(),
            grow: "/hgw/grow.js".to_string(),
            weaken: "/hgw/weaken.js".to_string(),
        }
    }
}

impl WorkersConfig {
    pub fn script_for(&self, kind: ScriptKind) -> &str {
        match kind {
            ScriptKind::Hack => &self.hack,
            ScriptKind::Grow => &self.grow,
            ScriptKind::Weaken => &self.weaken,
        }
    }
}

/// A network description for dry runs against the simulated environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Virtual clock start, epoch milliseconds.
    pub start_ms: u64,
    pub hosts: Vec<SimHostConfig>,
    pub targets: Vec<SimTargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimHostConfig {
    pub hostname: String,
    pub max_ram: f64,
    #[serde(default)]
    pub used_ram: f64,
    #[serde(default = "default_true")]
    pub rooted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTargetConfig {
    pub hostname: String,
    pub hack_time_ms: f64,
    pub security: f64,
    pub min_security: f64,
    pub money: f64,
    pub max_money: f64,
    /// Money added per grow thread on completion.
    #[serde(default = "default_growth_per_thread")]
    pub growth_per_thread: f64,
}

fn default_true() -> bool {
    true
}

fn default_growth_per_thread() -> f64 {
    1_000.0
}

impl HgwConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: HgwConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.slots.ram_per_thread <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "slots.ram_per_thread must be positive".to_string(),
            ));
        }
        if self.timing.rounding_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "timing.rounding_ms must be positive".to_string(),
            ));
        }
        if self.timing.fallback_wait_ms == 0 || self.timing.max_poll_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "timing waits must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Scaffold a config with a small simulated network.
    pub fn scaffold() -> Self {
        HgwConfig {
            timing: TimingConfig {
                max_iterations: Some(1_000),
                ..TimingConfig::default()
            },
            simulation: Some(SimulationConfig {
                start_ms: 1_700_000_000_000,
                hosts: vec![
                    SimHostConfig {
                        hostname: "home".to_string(),
                        max_ram: 64.0,
                        used_ram: 8.0,
                        rooted: true,
                    },
                    SimHostConfig {
                        hostname: "foodnstuff".to_string(),
                        max_ram: 16.0,
                        used_ram: 0.0,
                        rooted: true,
                    },
                    SimHostConfig {
                        hostname: "sigma-cosmetics".to_string(),
                        max_ram: 16.0,
                        used_ram: 0.0,
                        rooted: true,
                    },
                ],
                targets: vec![SimTargetConfig {
                    hostname: "n00dles".to_string(),
                    hack_time_ms: 1_500.0,
                    security: 10.0,
                    min_security: 1.0,
                    money: 20_000.0,
                    max_money: 1_750_000.0,
                    growth_per_thread: default_growth_per_thread(),
                }],
            }),
            ..HgwConfig::default()
        }
    }
}
