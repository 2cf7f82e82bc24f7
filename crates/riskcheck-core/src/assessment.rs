//! Assessment history records — one entry per remote risk check attempt.
//!
//! Entries are owned and persisted by the external assessment store; the
//! panel only ever reads them through a
//! [`HistorySource`](crate::service::HistorySource).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

// ─── Risk level ──────────────────────────────────────────────────────────────

/// The closed set of risk classifications the remote API can report.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RiskLevel {
  High,
  Low,
  Unknown,
}

impl RiskLevel {
  /// Parse a provider string, mapping failures to [`crate::Error`].
  pub fn parse(s: &str) -> crate::Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| crate::Error::UnknownRiskLevel(s.to_string()))
  }
}

// ─── Log entry ───────────────────────────────────────────────────────────────

/// One historical record of a single remote check attempt.
///
/// `success` and `error_message` are expected to agree (a failed attempt
/// should carry a message) but nothing relies on it: a failure without a
/// message is displayed with an empty error column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentLogEntry {
  /// Unique, stable record id assigned by the store.
  pub id:            String,
  /// The moment the assessment was made.
  pub assessed_at:   DateTime<Utc>,
  #[serde(default)]
  pub risk_level:    Option<RiskLevel>,
  /// Raw answer text returned by the provider.
  #[serde(default)]
  pub api_answer:    Option<String>,
  #[serde(default)]
  pub http_status:   Option<u16>,
  pub success:       bool,
  #[serde(default)]
  pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn risk_level_parses_case_insensitively() {
    assert_eq!(RiskLevel::parse("high").unwrap(), RiskLevel::High);
    assert_eq!(RiskLevel::parse(" LOW ").unwrap(), RiskLevel::Low);
    assert!(matches!(
      RiskLevel::parse("medium"),
      Err(crate::Error::UnknownRiskLevel(s)) if s == "medium"
    ));
  }

  #[test]
  fn entry_tolerates_missing_optional_fields() {
    let raw = r#"{
      "id": "a0B1",
      "assessedAt": "2026-03-01T10:00:00Z",
      "success": false
    }"#;
    let entry: AssessmentLogEntry = serde_json::from_str(raw).unwrap();
    assert_eq!(entry.id, "a0B1");
    assert!(!entry.success);
    assert_eq!(entry.risk_level, None);
    assert_eq!(entry.api_answer, None);
    assert_eq!(entry.http_status, None);
    assert_eq!(entry.error_message, None);
  }

  #[test]
  fn entry_reads_full_record() {
    let raw = r#"{
      "id": "a0B2",
      "assessedAt": "2026-03-02T08:30:00Z",
      "riskLevel": "High",
      "apiAnswer": "{\"score\":91}",
      "httpStatus": 200,
      "success": true,
      "errorMessage": null
    }"#;
    let entry: AssessmentLogEntry = serde_json::from_str(raw).unwrap();
    assert_eq!(entry.risk_level, Some(RiskLevel::High));
    assert_eq!(entry.http_status, Some(200));
    assert!(entry.success);
  }
}
