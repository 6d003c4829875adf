use libcordon::prelude::CordonError;
use serde::Serialize;
use tracing::error;

/// Boundary-level error, shaped into an [`ErrorBody`] for the caller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("service unavailable: {0}")]
  Unavailable(String),
  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error("server error, please check your logs for more information")]
  ServerError,
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),
}

impl From<CordonError> for AppError {
  fn from(value: CordonError) -> Self {
    match value {
      CordonError::InvalidQuery(err) => AppError::BadRequest(err),
      CordonError::IndexUnavailable => AppError::Unavailable("index has not been loaded yet".to_string()),
      CordonError::ConfigError(err) => AppError::ConfigError(err),
      CordonError::OtherError(err) => AppError::OtherError(err),
    }
  }
}

impl AppError {
  /// HTTP-equivalent status code for this error kind.
  pub fn status(&self) -> u16 {
    match self {
      AppError::BadRequest(_) => 400,
      AppError::Unavailable(_) => 503,
      AppError::ConfigError(_) | AppError::ServerError | AppError::OtherError(_) => 500,
    }
  }

  /// Shape the error for the caller. Internal faults are logged with the
  /// request correlation id and reduced to a generic record.
  pub fn into_body(self, request_id: Option<String>) -> ErrorBody {
    let status = self.status();

    let message = match &self {
      AppError::ServerError | AppError::OtherError(_) => {
        error!(request_id = request_id.as_deref(), error = %self, "unexpected fault");

        "server error, please check your logs for more information".to_string()
      }

      other => other.to_string(),
    };

    ErrorBody {
      code: status,
      message,
      request_id,
    }
  }
}

/// The structured error record every failed request receives.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
  pub code: u16,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,
}
