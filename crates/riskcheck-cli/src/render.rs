//! Plain-text rendering of the panel's view state.

use std::fmt::Write;

use riskcheck_core::subject::SubjectRef;
use riskcheck_view::{Phase, SortDirection, SortField, ViewState, transform::PLACEHOLDER};

/// Columns shown in the history table, in order.
const COLUMNS: [(SortField, &str); 6] = [
  (SortField::Timestamp, "Assessed"),
  (SortField::RiskLevel, "Risk"),
  (SortField::Status, "Status"),
  (SortField::HttpStatus, "HTTP"),
  (SortField::ApiAnswer, "API answer"),
  (SortField::ErrorMessage, "Error"),
];

/// Longest cell rendered before truncation.
const MAX_CELL: usize = 40;

/// Render the summary block followed by the history table.
pub fn render(subject: &SubjectRef, phase: Phase, view: &ViewState) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "subject: {subject}  ({phase})");

  if view.loading {
    let _ = writeln!(out, "checking…");
  }
  if let Some(latest) = &view.latest {
    let level = latest
      .risk_level
      .map(|level| level.to_string())
      .unwrap_or_else(|| PLACEHOLDER.to_string());
    let status = if latest.success { "success" } else { "failed" };
    let _ = writeln!(out, "latest: {level} ({status})");
  }
  if let Some(error) = &view.error {
    let _ = writeln!(out, "error: {error}");
  }
  out.push('\n');

  if view.entries.is_empty() {
    out.push_str("no assessments yet\n");
    return out;
  }

  let sorted = view.sort.field();
  let header: Vec<String> = COLUMNS
    .iter()
    .map(|(field, title)| {
      if Some(*field) != sorted {
        return (*title).to_string();
      }
      let arrow = match view.sort.direction {
        SortDirection::Ascending => '▲',
        SortDirection::Descending => '▼',
      };
      format!("{title} {arrow}")
    })
    .collect();

  let rows: Vec<Vec<String>> = view
    .entries
    .iter()
    .map(|entry| {
      COLUMNS
        .iter()
        .map(|(field, _)| truncate(&entry.display_value(*field)))
        .collect()
    })
    .collect();

  let widths: Vec<usize> = (0..COLUMNS.len())
    .map(|i| {
      rows
        .iter()
        .map(|row| row[i].chars().count())
        .chain(std::iter::once(header[i].chars().count()))
        .max()
        .unwrap_or(0)
    })
    .collect();

  write_row(&mut out, &header, &widths);
  let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
  write_row(&mut out, &rule, &widths);
  for row in &rows {
    write_row(&mut out, row, &widths);
  }
  out
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
  let line = cells
    .iter()
    .zip(widths)
    .map(|(cell, width)| {
      let pad = width.saturating_sub(cell.chars().count());
      format!("{cell}{}", " ".repeat(pad))
    })
    .collect::<Vec<_>>()
    .join("  ");
  out.push_str(line.trim_end());
  out.push('\n');
}

fn truncate(value: &str) -> String {
  let single_line = value.replace(['\n', '\r'], " ");
  if single_line.chars().count() <= MAX_CELL {
    return single_line;
  }
  let mut cut: String = single_line.chars().take(MAX_CELL - 1).collect();
  cut.push('…');
  cut
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use riskcheck_core::{
    assessment::{AssessmentLogEntry, RiskLevel},
    outcome::LatestResult,
  };
  use riskcheck_view::{SortSpec, transform::transform};

  use super::*;

  fn entry(id: &str, day: u32, risk: Option<RiskLevel>) -> AssessmentLogEntry {
    AssessmentLogEntry {
      id:            id.into(),
      assessed_at:   Utc.with_ymd_and_hms(2026, 4, day, 9, 30, 0).unwrap(),
      risk_level:    risk,
      api_answer:    None,
      http_status:   Some(200),
      success:       risk.is_some(),
      error_message: None,
    }
  }

  fn subject() -> SubjectRef { SubjectRef::new("003").unwrap() }

  #[test]
  fn empty_view_says_so() {
    let text = render(&subject(), Phase::Idle, &ViewState::default());
    assert!(text.contains("subject: 003"));
    assert!(text.contains("no assessments yet"));
  }

  #[test]
  fn table_marks_sorted_column_and_placeholders() {
    let view = ViewState {
      entries: transform(&[entry("a", 1, Some(RiskLevel::High)), entry("b", 2, None)]),
      sort: SortSpec::new("risk_level", SortDirection::Ascending),
      ..ViewState::default()
    };
    let text = render(&subject(), Phase::Idle, &view);
    assert!(text.contains("Risk ▲"));
    assert!(text.contains("High"));
    assert!(text.contains(PLACEHOLDER));
  }

  #[test]
  fn summary_shows_latest_and_error() {
    let view = ViewState {
      loading: true,
      error: Some("API responded with an error: quota".into()),
      latest: Some(LatestResult {
        success:       false,
        risk_level:    None,
        error_message: Some("quota".into()),
      }),
      ..ViewState::default()
    };
    let text = render(&subject(), Phase::Triggering, &view);
    assert!(text.contains("checking…"));
    assert!(text.contains("latest: — (failed)"));
    assert!(text.contains("error: API responded with an error: quota"));
  }

  #[test]
  fn long_cells_are_truncated() {
    let long = "x".repeat(100);
    let cut = truncate(&long);
    assert_eq!(cut.chars().count(), MAX_CELL);
    assert!(cut.ends_with('…'));
    assert_eq!(truncate("a\nb"), "a b");
  }
}
