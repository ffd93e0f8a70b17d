//! Logging setup for a run.

use tracing::subscriber::DefaultGuard;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
  Error,
  Warn,
  #[default]
  Info,
  Debug,
  Trace,
}
impl From<LogLevel> for tracing::Level {
  fn from(level: LogLevel) -> Self {
    match level {
      LogLevel::Error => Self::ERROR,
      LogLevel::Warn => Self::WARN,
      LogLevel::Info => Self::INFO,
      LogLevel::Debug => Self::DEBUG,
      LogLevel::Trace => Self::TRACE,
    }
  }
}

/// Keeps a fmt subscriber installed as the default of the current thread.
///
/// The previous subscriber is restored when the environment is dropped.
#[must_use = "logging stops when the environment is dropped"]
pub struct Environment {
  level: LogLevel,
  _guard: DefaultGuard,
}
impl Environment {
  pub fn init(level: LogLevel) -> Self {
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::from(level))
      .with_target(false)
      .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    tracing::debug!("logging at {level:?}");
    Self {
      level,
      _guard: guard,
    }
  }

  pub fn level(&self) -> LogLevel {
    self.level
  }

  pub fn teardown(self) {
    tracing::debug!("tearing down logging");
  }
}
