use std::{
  env::{self, VarError},
  fmt::Display,
  fs,
  path::{Path, PathBuf},
  str::FromStr,
};

use libcordon::prelude::EngineConfig;

use crate::errors::AppError;

/// Boundary runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
  pub env: Env,
  /// Path to the engine defaults file. A missing or incomplete file is fatal.
  pub config_path: PathBuf,
  /// Base prepended to trace report paths in responses.
  pub report_base_url: String,
}

impl Config {
  pub fn from_env() -> Result<Config, AppError> {
    Ok(Config {
      env: Env::from(env::var("ENV").unwrap_or("dev".into())),
      config_path: PathBuf::from(env::var("CONFIG_PATH").unwrap_or("config/cordon.yml".into())),
      report_base_url: env::var("REPORT_BASE_URL").unwrap_or_default(),
    })
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Env {
  Dev,
  Production,
}

impl From<String> for Env {
  fn from(value: String) -> Self {
    match value.as_ref() {
      "production" => Env::Production,
      _ => Env::Dev,
    }
  }
}

/// Load the complete engine defaults from a YAML file.
///
/// Every similarity, weights and search key must be present: the engine has no
/// built-in fallbacks, so a missing key refuses startup.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, AppError> {
  let contents = fs::read_to_string(path).map_err(|err| AppError::ConfigError(format!("could not read {}: {err}", path.display())))?;

  let config = serde_yaml::from_str::<EngineConfig>(&contents).map_err(|err| AppError::ConfigError(format!("could not parse {}: {err}", path.display())))?;

  config.validate().map_err(AppError::from)?;

  Ok(config)
}

pub fn parse_env<T>(name: &str, default: T) -> Result<T, AppError>
where
  T: FromStr,
  T::Err: Display,
{
  match env::var(name) {
    Ok(value) if value.is_empty() => Ok(default),
    Ok(value) => value.parse::<T>().map_err(|err| AppError::ConfigError(format!("could not read {name}: {err}"))),
    Err(VarError::NotPresent) => Ok(default),
    Err(err) => Err(AppError::ConfigError(format!("could not read {name}: {err}"))),
  }
}
