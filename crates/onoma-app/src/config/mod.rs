//! Configuration loading: defaults, optional settings file, environment.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_COOLDOWN_SECS, DEFAULT_NAMING_MODEL, DEFAULT_ORACLE_RPS,
    DEFAULT_RETRY_BASE_SECS, DEFAULT_RETRY_BUDGET,
};

const CONFIG_FILE: &str = "config/settings";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    pub model: String,
    pub retry_budget: u32,
    pub retry_base_secs: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    pub chunk_size: usize,
    pub cooldown_secs: u64,
}

pub fn load() -> Result<AppConfig, AppConfigError> {
    let builder = Config::builder()
        .set_default("oracle.model", DEFAULT_NAMING_MODEL)?
        .set_default("oracle.retry_budget", i64::from(DEFAULT_RETRY_BUDGET))?
        .set_default("oracle.retry_base_secs", DEFAULT_RETRY_BASE_SECS as i64)?
        .set_default(
            "oracle.requests_per_second",
            i64::from(DEFAULT_ORACLE_RPS),
        )?
        .set_default("batch.chunk_size", DEFAULT_CHUNK_SIZE as i64)?
        .set_default("batch.cooldown_secs", DEFAULT_COOLDOWN_SECS as i64)?
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("ONOMA").separator("__"));

    let cfg = builder.build()?.try_deserialize()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = load().expect("default config loads");
        assert_eq!(cfg.oracle.model, DEFAULT_NAMING_MODEL);
        assert_eq!(cfg.oracle.retry_budget, DEFAULT_RETRY_BUDGET);
        assert_eq!(cfg.oracle.retry_base_secs, DEFAULT_RETRY_BASE_SECS);
        assert_eq!(cfg.batch.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.batch.cooldown_secs, DEFAULT_COOLDOWN_SECS);
    }
}
