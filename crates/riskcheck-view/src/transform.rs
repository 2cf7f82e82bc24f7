//! Raw history entries → display-ready rows.
//!
//! The transformation is pure and total: every optional field has a defined
//! rendering, so a half-filled record can never break the view.

use chrono::{DateTime, SecondsFormat, Utc};
use riskcheck_core::assessment::{AssessmentLogEntry, RiskLevel};
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::sort::{SortField, SortKey};

/// Rendered in place of an absent risk level or API answer.
pub const PLACEHOLDER: &str = "—";

pub const STATUS_SUCCESS: &str = "Success";
pub const STATUS_FAILED: &str = "Failed";

/// Two-valued icon token derived from the success flag.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusIcon {
  Success,
  Error,
}

/// A read-only projection of an [`AssessmentLogEntry`] for the history table.
///
/// The raw optional values are kept next to their rendered labels so the
/// sort engine can order by the underlying value rather than the glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
  pub id:               String,
  pub assessed_at:      DateTime<Utc>,
  pub risk_level:       Option<RiskLevel>,
  /// `risk_level` as text, or [`PLACEHOLDER`].
  pub risk_label:       String,
  pub api_answer:       Option<String>,
  /// `api_answer`, or [`PLACEHOLDER`].
  pub api_answer_label: String,
  pub http_status:      Option<u16>,
  pub success:          bool,
  pub status_label:     &'static str,
  pub status_icon:      StatusIcon,
  /// Empty when the record carries no message.
  pub error_message:    String,
}

impl DisplayEntry {
  pub fn from_entry(entry: &AssessmentLogEntry) -> Self {
    let (status_label, status_icon) = if entry.success {
      (STATUS_SUCCESS, StatusIcon::Success)
    } else {
      (STATUS_FAILED, StatusIcon::Error)
    };

    let api_answer = entry
      .api_answer
      .clone()
      .filter(|answer| !answer.trim().is_empty());

    Self {
      id: entry.id.clone(),
      assessed_at: entry.assessed_at,
      risk_level: entry.risk_level,
      risk_label: entry
        .risk_level
        .map(|level| level.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string()),
      api_answer_label: api_answer
        .clone()
        .unwrap_or_else(|| PLACEHOLDER.to_string()),
      api_answer,
      http_status: entry.http_status,
      success: entry.success,
      status_label,
      status_icon,
      error_message: entry.error_message.clone().unwrap_or_default(),
    }
  }

  /// The text a table cell shows for `field`, placeholders applied.
  pub fn display_value(&self, field: SortField) -> String {
    match field {
      SortField::Id => self.id.clone(),
      SortField::Timestamp => self
        .assessed_at
        .to_rfc3339_opts(SecondsFormat::Secs, true),
      SortField::RiskLevel => self.risk_label.clone(),
      SortField::ApiAnswer => self.api_answer_label.clone(),
      SortField::HttpStatus => self
        .http_status
        .map(|status| status.to_string())
        .unwrap_or_default(),
      SortField::Success => self.success.to_string(),
      SortField::Status => self.status_label.to_string(),
      SortField::ErrorMessage => self.error_message.clone(),
    }
  }

  /// The comparable value behind `field`. Unknown fields (`None`) and
  /// missing values both yield [`SortKey::Absent`].
  pub fn sort_key(&self, field: Option<SortField>) -> SortKey<'_> {
    let Some(field) = field else {
      return SortKey::Absent;
    };
    match field {
      SortField::Id => SortKey::Text(&self.id),
      SortField::Timestamp => SortKey::Instant(self.assessed_at),
      SortField::RiskLevel => self
        .risk_level
        .map_or(SortKey::Absent, |level| SortKey::Text(level.into())),
      SortField::ApiAnswer => self
        .api_answer
        .as_deref()
        .map_or(SortKey::Absent, SortKey::Text),
      SortField::HttpStatus => self
        .http_status
        .map_or(SortKey::Absent, |status| SortKey::Number(i64::from(status))),
      SortField::Success => SortKey::Flag(self.success),
      SortField::Status => SortKey::Text(self.status_label),
      SortField::ErrorMessage if self.error_message.is_empty() => {
        SortKey::Absent
      }
      SortField::ErrorMessage => SortKey::Text(&self.error_message),
    }
  }
}

/// Project `entries` into display rows, preserving length and order.
pub fn transform(entries: &[AssessmentLogEntry]) -> Vec<DisplayEntry> {
  entries.iter().map(DisplayEntry::from_entry).collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn entry(id: &str, success: bool) -> AssessmentLogEntry {
    AssessmentLogEntry {
      id:            id.into(),
      assessed_at:   Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
      risk_level:    None,
      api_answer:    None,
      http_status:   None,
      success,
      error_message: None,
    }
  }

  #[test]
  fn success_maps_to_success_label_and_icon() {
    let rows = transform(&[entry("a", true)]);
    assert_eq!(rows[0].status_label, "Success");
    assert_eq!(rows[0].status_icon, StatusIcon::Success);
  }

  #[test]
  fn failure_maps_to_failed_label_and_error_icon() {
    let rows = transform(&[entry("a", false)]);
    assert_eq!(rows[0].status_label, "Failed");
    assert_eq!(rows[0].status_icon, StatusIcon::Error);
    // Missing message on a failure is tolerated and rendered empty.
    assert_eq!(rows[0].error_message, "");
  }

  #[test]
  fn absent_fields_render_as_placeholder() {
    let mut blank_answer = entry("b", true);
    blank_answer.api_answer = Some("   ".into());
    let rows = transform(&[entry("a", true), blank_answer]);
    for row in &rows {
      assert_eq!(row.risk_label, PLACEHOLDER);
      assert_eq!(row.api_answer_label, PLACEHOLDER);
      assert_eq!(row.display_value(SortField::RiskLevel), PLACEHOLDER);
      assert_eq!(row.display_value(SortField::ApiAnswer), PLACEHOLDER);
    }
  }

  #[test]
  fn present_fields_are_carried_through() {
    let mut raw = entry("a", true);
    raw.risk_level = Some(RiskLevel::High);
    raw.api_answer = Some("{\"score\":88}".into());
    raw.http_status = Some(200);
    let rows = transform(&[raw]);
    assert_eq!(rows[0].risk_label, "High");
    assert_eq!(rows[0].api_answer_label, "{\"score\":88}");
    assert_eq!(rows[0].display_value(SortField::HttpStatus), "200");
    assert_eq!(
      rows[0].display_value(SortField::Timestamp),
      "2026-01-05T09:00:00Z"
    );
  }

  #[test]
  fn preserves_length_order_and_input() {
    let input = vec![entry("c", true), entry("a", false), entry("b", true)];
    let before = input.clone();
    let rows = transform(&input);
    assert_eq!(input, before);
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
    assert!(transform(&[]).is_empty());
  }
}
