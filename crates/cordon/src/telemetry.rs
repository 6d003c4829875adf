use std::io::Write;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;

use crate::config::{Config, Env};

/// Install the global tracing subscriber: compact output in dev, JSON lines in
/// production, both behind a non-blocking writer.
pub fn init_logging(config: &Config, writer: impl Write + Send + 'static) -> WorkerGuard {
  use tracing_subscriber::{EnvFilter, prelude::*};

  let (appender, guard) = tracing_appender::non_blocking(writer);

  let formatter = match config.env {
    Env::Dev => fmt::layer().compact().with_writer(appender).boxed(),
    Env::Production => fmt::layer().json().flatten_event(true).with_writer(appender).boxed(),
  };

  tracing_subscriber::registry()
    .with(EnvFilter::builder().try_from_env().or_else(|_| EnvFilter::try_new("info")).unwrap())
    .with(formatter)
    .init();

  guard
}
