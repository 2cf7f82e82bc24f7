//! Error types for `riskcheck-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject reference must not be empty")]
  EmptySubject,

  #[error("unknown risk level: {0:?}")]
  UnknownRiskLevel(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
