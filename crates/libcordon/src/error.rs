#[derive(Debug, thiserror::Error)]
pub enum CordonError {
  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error("invalid query: {0}")]
  InvalidQuery(String),
  #[error("index has not been loaded yet")]
  IndexUnavailable,
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),
}
