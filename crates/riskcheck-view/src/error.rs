//! Error types for `riskcheck-view`.

use thiserror::Error;

/// Why an invalidation (or re-bind) did not deliver a fresh snapshot.
///
/// `Clone` because one underlying fetch may be awaited by several coalesced
/// callers, and each of them receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
  #[error("subscription is not bound to a subject")]
  Unbound,

  #[error("history fetch failed: {0}")]
  Fetch(String),

  /// The subject changed while the fetch was in flight; its result was
  /// discarded.
  #[error("subscription was re-bound before the fetch completed")]
  Superseded,

  /// The proxy was dropped while the fetch was in flight.
  #[error("subscription was dropped")]
  Detached,
}

pub type Result<T, E = SubscriptionError> = std::result::Result<T, E>;
