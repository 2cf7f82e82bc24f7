//! Stable, field-driven ordering of display rows.
//!
//! Sorting never fails. A field name that matches no column orders every row
//! as [`SortKey::Absent`], which leaves the prior order untouched.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

use crate::transform::DisplayEntry;

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The sortable columns of the history table.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
  Id,
  Timestamp,
  RiskLevel,
  ApiAnswer,
  HttpStatus,
  Success,
  Status,
  ErrorMessage,
}

impl SortField {
  /// Lenient lookup: case, `_`, `-` and spaces are ignored, and a few
  /// column-header aliases are accepted. Returns `None` for anything else.
  pub fn parse(name: &str) -> Option<Self> {
    let key: String = name
      .chars()
      .filter(|c| !matches!(c, '_' | '-' | ' '))
      .flat_map(char::to_lowercase)
      .collect();
    let field = match key.as_str() {
      "id" => Self::Id,
      "timestamp" | "assessedat" | "assessmentdate" | "date" => {
        Self::Timestamp
      }
      "risklevel" | "risk" => Self::RiskLevel,
      "apianswer" | "answer" => Self::ApiAnswer,
      "httpstatus" | "httpstatuscode" | "statuscode" => Self::HttpStatus,
      "success" => Self::Success,
      "status" | "statuslabel" => Self::Status,
      "errormessage" | "error" => Self::ErrorMessage,
      _ => return None,
    };
    Some(field)
  }
}

// ─── Direction ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum SortDirection {
  #[serde(rename = "asc", alias = "ascending")]
  Ascending,
  #[default]
  #[serde(rename = "desc", alias = "descending")]
  Descending,
}

impl SortDirection {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "asc" | "ascending" => Some(Self::Ascending),
      "desc" | "descending" => Some(Self::Descending),
      _ => None,
    }
  }

  pub fn reversed(self) -> Self {
    match self {
      Self::Ascending => Self::Descending,
      Self::Descending => Self::Ascending,
    }
  }
}

// ─── Specification ───────────────────────────────────────────────────────────

/// The current (field, direction) pair of the history table.
///
/// The field is kept as the caller spelled it, so a misconfigured column
/// survives round trips and simply sorts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
  pub field:     String,
  #[serde(default)]
  pub direction: SortDirection,
}

impl SortSpec {
  pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
    Self {
      field: field.into(),
      direction,
    }
  }

  pub fn field(&self) -> Option<SortField> { SortField::parse(&self.field) }
}

impl Default for SortSpec {
  fn default() -> Self {
    Self::new(SortField::Timestamp.as_ref(), SortDirection::Descending)
  }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A comparable cell value.
///
/// The derived ordering ranks variants top to bottom, so `Absent` sorts
/// before every present value in ascending order. Within a variant the
/// natural order applies: chronological, numeric, `false < true`, lexical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey<'a> {
  Absent,
  Flag(bool),
  Number(i64),
  Instant(DateTime<Utc>),
  Text(&'a str),
}

// ─── Sort ────────────────────────────────────────────────────────────────────

/// Return `entries` ordered by `field` in `direction`.
///
/// Stable in both directions: rows with equal keys keep their relative
/// order.
pub fn sort_by_field(
  mut entries: Vec<DisplayEntry>,
  field: &str,
  direction: SortDirection,
) -> Vec<DisplayEntry> {
  let field = SortField::parse(field);
  entries.sort_by(|a, b| compare(a, b, field, direction));
  entries
}

/// Return `entries` ordered by `spec`.
pub fn sort_by_spec(
  entries: Vec<DisplayEntry>,
  spec: &SortSpec,
) -> Vec<DisplayEntry> {
  sort_by_field(entries, &spec.field, spec.direction)
}

fn compare(
  a: &DisplayEntry,
  b: &DisplayEntry,
  field: Option<SortField>,
  direction: SortDirection,
) -> Ordering {
  let ordering = a.sort_key(field).cmp(&b.sort_key(field));
  match direction {
    SortDirection::Ascending => ordering,
    SortDirection::Descending => ordering.reverse(),
  }
}
