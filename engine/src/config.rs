use serde::Deserialize;
use std::{env, path::PathBuf};

use crate::{blend::BlendConfig, error::AppError};

const DEFAULT_CONFIG_FILE: &str = "trust-engine";
const ENV_PREFIX: &str = "TRUST";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    pub bind_addr: String,
    pub model_path: PathBuf,
    pub feature_spec_path: PathBuf,
    pub public_suffix_path: Option<PathBuf>,
    pub include_private_suffixes: bool,
    pub blend: BlendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "URL Trust Scorer".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            model_path: PathBuf::from("ml/artifacts/model.json"),
            feature_spec_path: PathBuf::from("ml/artifacts/feature_spec.json"),
            public_suffix_path: None,
            include_private_suffixes: false,
            blend: BlendConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `trust-engine.toml` (or `$TRUST_CONFIG`) if present,
    /// then `TRUST_*` environment variables. Nested keys use `__`, e.g.
    /// `TRUST_BLEND__ML_WEIGHT`.
    pub fn load() -> Result<Self, AppError> {
        let file = env::var("TRUST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config: Config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let blend = &self.blend;
        for (name, weight) in [
            ("ml_weight", blend.ml_weight),
            ("heuristic_weight", blend.heuristic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::InvalidConfig(format!(
                    "blend.{name} must be a non-negative number, got {weight}"
                )));
            }
        }

        if blend.suspicious_threshold >= blend.safe_threshold || blend.safe_threshold > 100 {
            return Err(AppError::InvalidConfig(format!(
                "thresholds must satisfy 0 <= suspicious ({}) < safe ({}) <= 100",
                blend.suspicious_threshold, blend.safe_threshold
            )));
        }

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(AppError::InvalidConfig(format!(
                "bind_addr {:?} is not a socket address",
                self.bind_addr
            )));
        }

        Ok(())
    }
}
