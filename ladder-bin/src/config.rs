use ladder_instrument::Pair;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ladder defaults applied when the engine starts with no `/start` command yet issued. The ladder itself stays `active = false` until a command activates it; these
/// values only seed the amount/count/step an operator would otherwise have to type out in full.
#[derive(Debug, Clone, Deserialize)]
pub struct LadderDefaults {
    pub amount: Decimal,
    #[serde(default)]
    pub amount_coin: AmountCoinConfig,
    pub count_per_side: u32,
    pub step_percent: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountCoinConfig {
    #[default]
    Quote,
    Base,
}

/// Tick intervals, seconds. Defaults match [`ladder_engine::SchedulerIntervals::default`].
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalsConfig {
    #[serde(default = "default_ladder_tick_secs")]
    pub ladder_tick_secs: u64,
    #[serde(default = "default_reconcile_tick_secs")]
    pub reconcile_tick_secs: u64,
    #[serde(default = "default_market_cache_refresh_secs")]
    pub market_cache_refresh_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_ladder_tick_secs() -> u64 {
    30
}
fn default_reconcile_tick_secs() -> u64 {
    45
}
fn default_market_cache_refresh_secs() -> u64 {
    15 * 60
}
fn default_call_timeout_secs() -> u64 {
    10
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            ladder_tick_secs: default_ladder_tick_secs(),
            reconcile_tick_secs: default_reconcile_tick_secs(),
            market_cache_refresh_secs: default_market_cache_refresh_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl IntervalsConfig {
    pub fn ladder_tick(&self) -> Duration {
        Duration::from_secs(self.ladder_tick_secs)
    }

    pub fn reconcile_tick(&self) -> Duration {
        Duration::from_secs(self.reconcile_tick_secs)
    }

    pub fn market_cache_refresh(&self) -> Duration {
        Duration::from_secs(self.market_cache_refresh_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// `config.toml` schema (SPEC_FULL "Configuration"). Venue credentials are a path only; the
/// core never parses secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub venue: String,
    pub pair: String,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    pub ladder: LadderDefaults,
    pub amount_to_confirm_usd: Decimal,
    #[serde(default)]
    pub intervals: IntervalsConfig,
    /// Purposes the ladder tick's reinit sweep is forbidden from cancelling beyond the
    /// compile-time default.
    #[serde(default)]
    pub non_cancellable_purposes: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn pair(&self) -> Result<Pair, ConfigError> {
        self.pair
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid pair {:?}, expected BASE/QUOTE", self.pair)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.venue.trim().is_empty() {
            return Err(ConfigError::Invalid("venue must not be empty".to_string()));
        }
        self.pair()?;
        if self.ladder.count_per_side == 0 {
            return Err(ConfigError::Invalid("ladder.count_per_side must be at least 1".to_string()));
        }
        if self.ladder.amount <= Decimal::ZERO {
            return Err(ConfigError::Invalid("ladder.amount must be positive".to_string()));
        }
        if self.ladder.step_percent <= Decimal::ZERO {
            return Err(ConfigError::Invalid("ladder.step_percent must be positive".to_string()));
        }
        if self.amount_to_confirm_usd <= Decimal::ZERO {
            return Err(ConfigError::Invalid("amount_to_confirm_usd must be positive".to_string()));
        }
        for name in &self.non_cancellable_purposes {
            if ladder_engine::Purpose::parse(name).is_none() {
                return Err(ConfigError::Invalid(format!("unknown purpose {name:?} in non_cancellable_purposes")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        venue = "mock"
        pair = "ADM/USDT"
        amount_to_confirm_usd = "250"

        [ladder]
        amount = "300"
        count_per_side = 3
        step_percent = "2"
    "#;

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.pair().unwrap().to_string(), "ADM/USDT");
        assert_eq!(config.intervals.ladder_tick_secs, 30);
    }

    #[test]
    fn rejects_zero_count_per_side() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.ladder.count_per_side = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_non_cancellable_purpose() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.non_cancellable_purposes = vec!["not-a-purpose".to_string()];
        assert!(config.validate().is_err());
    }
}
