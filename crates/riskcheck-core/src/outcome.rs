//! Results of a single risk check trigger.
//!
//! A check ends in one of three ways:
//!
//! - a structured [`CheckOutcome`] with `success = true`,
//! - a structured [`CheckOutcome`] with `success = false` (a *domain failure*:
//!   the provider answered but reported an unsuccessful assessment),
//! - a [`ServiceFailure`] (a *transport/system failure*: the call itself did
//!   not complete normally).

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::assessment::RiskLevel;

/// Shown when a transport failure carries no usable message at all.
pub const FALLBACK_FAILURE_MESSAGE: &str =
  "An unexpected error occurred. Please try again.";

// ─── Structured result ───────────────────────────────────────────────────────

/// The structured answer of
/// [`AssessmentService::check_risk`](crate::service::AssessmentService::check_risk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
  pub success:       bool,
  #[serde(default)]
  pub risk_level:    Option<RiskLevel>,
  #[serde(default)]
  pub error_message: Option<String>,
}

impl CheckOutcome {
  pub fn succeeded(risk_level: RiskLevel) -> Self {
    Self {
      success:       true,
      risk_level:    Some(risk_level),
      error_message: None,
    }
  }

  pub fn failed(reason: impl Into<String>) -> Self {
    Self {
      success:       false,
      risk_level:    None,
      error_message: Some(reason.into()),
    }
  }
}

// ─── Latest result ───────────────────────────────────────────────────────────

/// The outcome of the most recent accepted trigger, as shown to the user.
///
/// Replaced wholesale by the next structured outcome; never cleared in
/// between, and left untouched by transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestResult {
  pub success:       bool,
  /// Only present when the provider call itself produced a classification.
  pub risk_level:    Option<RiskLevel>,
  pub error_message: Option<String>,
}

impl From<CheckOutcome> for LatestResult {
  fn from(outcome: CheckOutcome) -> Self {
    Self {
      success:       outcome.success,
      risk_level:    outcome.risk_level,
      error_message: outcome.error_message,
    }
  }
}

// ─── Transport / system failure ──────────────────────────────────────────────

/// What kind of failure prevented the service call from completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailureKind {
  #[strum(to_string = "network")]
  Network,
  #[strum(to_string = "timeout")]
  Timeout,
  #[strum(to_string = "quota exceeded")]
  QuotaExceeded,
  #[strum(to_string = "server")]
  Server,
  #[strum(to_string = "unexpected")]
  Other,
}

/// A call to the assessment service that did not complete normally.
///
/// `body_message` is the message field of a structured server error body;
/// `message` is the generic message of the underlying error. Either may be
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure")]
pub struct ServiceFailure {
  pub kind:         FailureKind,
  pub status:       Option<u16>,
  pub body_message: Option<String>,
  pub message:      Option<String>,
}

impl ServiceFailure {
  /// A failure carrying no detail at all.
  pub fn bare(kind: FailureKind) -> Self {
    Self {
      kind,
      status: None,
      body_message: None,
      message: None,
    }
  }

  /// A failure with a generic message only.
  pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
    Self {
      message: Some(message.into()),
      ..Self::bare(kind)
    }
  }

  /// A non-success HTTP answer, optionally with a structured body message.
  pub fn server(status: u16, body_message: Option<String>) -> Self {
    Self {
      status: Some(status),
      body_message,
      ..Self::bare(FailureKind::Server)
    }
  }

  /// The text shown to the user: the structured server message if there is
  /// one, else the generic message, else [`FALLBACK_FAILURE_MESSAGE`].
  /// Blank strings count as missing.
  pub fn user_message(&self) -> String {
    non_blank(self.body_message.as_deref())
      .or_else(|| non_blank(self.message.as_deref()))
      .unwrap_or(FALLBACK_FAILURE_MESSAGE)
      .to_string()
  }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
  s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn server_body_message_takes_precedence() {
    let failure = ServiceFailure {
      message: Some("Script-thrown exception".into()),
      ..ServiceFailure::server(500, Some("Daily quota exhausted".into()))
    };
    assert_eq!(failure.user_message(), "Daily quota exhausted");
  }

  #[test]
  fn generic_message_is_second_choice() {
    let failure =
      ServiceFailure::with_message(FailureKind::Network, "connection reset");
    assert_eq!(failure.user_message(), "connection reset");

    let blank_body = ServiceFailure {
      message: Some("read timed out".into()),
      ..ServiceFailure::server(504, Some("  ".into()))
    };
    assert_eq!(blank_body.user_message(), "read timed out");
  }

  #[test]
  fn fallback_when_nothing_usable() {
    assert_eq!(
      ServiceFailure::bare(FailureKind::Other).user_message(),
      FALLBACK_FAILURE_MESSAGE
    );
    let empty = ServiceFailure::with_message(FailureKind::Timeout, "");
    assert_eq!(empty.user_message(), FALLBACK_FAILURE_MESSAGE);
  }

  #[test]
  fn failure_display_names_the_kind() {
    let failure = ServiceFailure::bare(FailureKind::QuotaExceeded);
    assert_eq!(failure.to_string(), "quota exceeded failure");
  }

  #[test]
  fn latest_result_copies_outcome() {
    let latest = LatestResult::from(CheckOutcome::failed("Provider unavailable"));
    assert!(!latest.success);
    assert_eq!(latest.risk_level, None);
    assert_eq!(latest.error_message.as_deref(), Some("Provider unavailable"));
  }

  #[test]
  fn outcome_uses_camel_case_wire_names() {
    let outcome: CheckOutcome = serde_json::from_str(
      r#"{"success":true,"riskLevel":"Low"}"#,
    )
    .unwrap();
    assert_eq!(outcome, CheckOutcome::succeeded(RiskLevel::Low));
  }
}
