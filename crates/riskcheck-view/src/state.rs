//! View state — the observable aggregate the presentation layer reads.
//!
//! [`ViewStore`] publishes a [`ViewState`] through a `watch` channel. Every
//! mutation is a single `send_modify`, so readers never observe half of an
//! operation. The orchestrator owns `loading` and `latest`; the history
//! pipeline owns `entries`; both write `error`.

use std::sync::atomic::{AtomicBool, Ordering};

use riskcheck_core::outcome::LatestResult;
use serde::Serialize;
use tokio::sync::watch;

use crate::{
  sort::{SortDirection, SortSpec, sort_by_spec},
  subscription::Snapshot,
  transform::{DisplayEntry, transform},
};

/// Shown when the history subscription delivers an error.
pub const HISTORY_LOAD_FAILED: &str =
  "Unable to load assessment history. Please refresh the page.";

/// Which writer produced the current error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
  /// The last trigger failed (domain or transport failure).
  Action,
  /// The history subscription failed to deliver.
  History,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
  pub loading:      bool,
  pub error:        Option<String>,
  pub error_origin: Option<ErrorOrigin>,
  pub latest:       Option<LatestResult>,
  pub entries:      Vec<DisplayEntry>,
  pub sort:         SortSpec,
}

impl ViewState {
  fn new(sort: SortSpec) -> Self {
    Self {
      loading: false,
      error: None,
      error_origin: None,
      latest: None,
      entries: Vec::new(),
      sort,
    }
  }

  fn set_error(&mut self, origin: ErrorOrigin, message: String) {
    self.error = Some(message);
    self.error_origin = Some(origin);
  }

  fn clear_error(&mut self) {
    self.error = None;
    self.error_origin = None;
  }
}

impl Default for ViewState {
  fn default() -> Self { Self::new(SortSpec::default()) }
}

/// Owner of the published [`ViewState`].
///
/// Once [`detach`](Self::detach)ed every write is a no-op, so continuations
/// that outlive their component cannot touch it.
pub struct ViewStore {
  state:    watch::Sender<ViewState>,
  detached: AtomicBool,
}

impl ViewStore {
  pub fn new(sort: SortSpec) -> Self {
    let (state, _) = watch::channel(ViewState::new(sort));
    Self {
      state,
      detached: AtomicBool::new(false),
    }
  }

  /// A copy of the current state.
  pub fn snapshot(&self) -> ViewState { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<ViewState> {
    self.state.subscribe()
  }

  pub fn detach(&self) { self.detached.store(true, Ordering::Release); }

  pub fn is_detached(&self) -> bool { self.detached.load(Ordering::Acquire) }

  fn modify(&self, f: impl FnOnce(&mut ViewState)) {
    if self.is_detached() {
      tracing::debug!("dropping write to a detached view");
      return;
    }
    self.state.send_modify(f);
  }

  // ── Commands ──────────────────────────────────────────────────────────

  /// Replace the sort specification and re-sort the held rows. Never
  /// fetches.
  pub fn request_sort(&self, field: &str, direction: SortDirection) {
    self.modify(|state| {
      state.sort = SortSpec::new(field, direction);
      let entries = std::mem::take(&mut state.entries);
      state.entries = sort_by_spec(entries, &state.sort);
    });
  }

  // ── History pipeline ──────────────────────────────────────────────────

  /// Fold a subscription snapshot into the view. Safe to call repeatedly
  /// with the same snapshot.
  ///
  /// - `Data` replaces the rows (transformed, then sorted by the current
  ///   sort) and clears an error raised by an earlier read failure.
  /// - `Error` sets [`HISTORY_LOAD_FAILED`] unless the last trigger failed,
  ///   whose message stays until the next trigger. Rows are kept.
  /// - `Pending` changes nothing.
  pub fn apply_snapshot(&self, snapshot: &Snapshot) {
    match snapshot {
      Snapshot::Pending => {}
      Snapshot::Data(raw) => {
        let rows = transform(raw);
        self.modify(|state| {
          state.entries = sort_by_spec(rows, &state.sort);
          if state.error_origin == Some(ErrorOrigin::History) {
            state.clear_error();
          }
        });
      }
      Snapshot::Error(_) => self.modify(|state| {
        if state.error_origin != Some(ErrorOrigin::Action) {
          state.set_error(ErrorOrigin::History, HISTORY_LOAD_FAILED.to_string());
        }
      }),
    }
  }

  /// Forget everything shown for a previous subject: rows, latest result
  /// and error. The sort is kept.
  pub fn reset_subject(&self) {
    self.modify(|state| {
      state.entries.clear();
      state.latest = None;
      state.clear_error();
    });
  }

  // ── Orchestrator writes ───────────────────────────────────────────────

  pub(crate) fn begin_action(&self) {
    self.modify(|state| {
      state.clear_error();
      state.loading = true;
    });
  }

  /// Record a structured outcome, with the error message it implies.
  pub(crate) fn record_outcome(
    &self,
    latest: LatestResult,
    error: Option<String>,
  ) {
    self.modify(|state| {
      state.latest = Some(latest);
      if let Some(message) = error {
        state.set_error(ErrorOrigin::Action, message);
      }
    });
  }

  /// Record a transport failure; `latest` is left as it was.
  pub(crate) fn record_action_error(&self, message: String) {
    self.modify(|state| state.set_error(ErrorOrigin::Action, message));
  }

  pub(crate) fn end_action(&self) {
    self.modify(|state| state.loading = false);
  }
}

impl Default for ViewStore {
  fn default() -> Self { Self::new(SortSpec::default()) }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use riskcheck_core::assessment::AssessmentLogEntry;

  use super::*;

  fn raw(id: &str, day: u32) -> AssessmentLogEntry {
    AssessmentLogEntry {
      id:            id.into(),
      assessed_at:   Utc.with_ymd_and_hms(2026, 4, day, 0, 0, 0).unwrap(),
      risk_level:    None,
      api_answer:    None,
      http_status:   Some(200),
      success:       true,
      error_message: None,
    }
  }

  fn ids(state: &ViewState) -> Vec<&str> {
    state.entries.iter().map(|e| e.id.as_str()).collect()
  }

  #[test]
  fn data_snapshot_is_transformed_and_sorted() {
    let store = ViewStore::default();
    store.apply_snapshot(&Snapshot::Data(vec![raw("old", 1), raw("new", 3)]));
    assert_eq!(ids(&store.snapshot()), ["new", "old"]);
  }

  #[test]
  fn reapplying_a_snapshot_is_idempotent() {
    let store = ViewStore::default();
    let snapshot = Snapshot::Data(vec![raw("a", 1), raw("b", 2)]);
    store.apply_snapshot(&snapshot);
    let first = store.snapshot();
    store.apply_snapshot(&snapshot);
    assert_eq!(store.snapshot(), first);
  }

  #[test]
  fn sort_request_resorts_held_rows_and_persists() {
    let store = ViewStore::default();
    store.apply_snapshot(&Snapshot::Data(vec![raw("b", 1), raw("a", 2)]));
    store.request_sort("id", SortDirection::Ascending);
    let state = store.snapshot();
    assert_eq!(ids(&state), ["a", "b"]);
    assert_eq!(state.sort, SortSpec::new("id", SortDirection::Ascending));

    // A refresh keeps the user's choice.
    store.apply_snapshot(&Snapshot::Data(vec![
      raw("c", 5),
      raw("b", 1),
      raw("a", 2),
    ]));
    assert_eq!(ids(&store.snapshot()), ["a", "b", "c"]);
  }

  #[test]
  fn read_failure_keeps_rows_and_sets_message() {
    let store = ViewStore::default();
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    store.apply_snapshot(&Snapshot::Error("boom".into()));
    let state = store.snapshot();
    assert_eq!(state.error.as_deref(), Some(HISTORY_LOAD_FAILED));
    assert_eq!(state.error_origin, Some(ErrorOrigin::History));
    assert_eq!(ids(&state), ["a"]);

    // Recovery clears a history error.
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    assert_eq!(store.snapshot().error, None);
  }

  #[test]
  fn data_snapshot_keeps_action_errors() {
    let store = ViewStore::default();
    store.record_action_error("quota".into());
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    assert_eq!(store.snapshot().error.as_deref(), Some("quota"));
  }

  #[test]
  fn read_failure_keeps_action_errors() {
    let store = ViewStore::default();
    store.record_action_error("timed out".into());
    store.apply_snapshot(&Snapshot::Error("boom".into()));
    let state = store.snapshot();
    assert_eq!(state.error.as_deref(), Some("timed out"));
    assert_eq!(state.error_origin, Some(ErrorOrigin::Action));
  }

  #[test]
  fn reset_subject_drops_rows_latest_and_errors() {
    let store = ViewStore::default();
    store.request_sort("id", SortDirection::Ascending);
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    store.record_outcome(
      LatestResult {
        success:       false,
        risk_level:    None,
        error_message: Some("quota".into()),
      },
      Some("API responded with an error: quota".into()),
    );

    store.reset_subject();

    let state = store.snapshot();
    assert!(state.entries.is_empty());
    assert_eq!(state.latest, None);
    assert_eq!(state.error, None);
    assert_eq!(state.error_origin, None);
    assert_eq!(state.sort, SortSpec::new("id", SortDirection::Ascending));
  }

  #[test]
  fn pending_changes_nothing() {
    let store = ViewStore::default();
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    let before = store.snapshot();
    store.apply_snapshot(&Snapshot::Pending);
    assert_eq!(store.snapshot(), before);
  }

  #[test]
  fn detached_store_ignores_writes() {
    let store = ViewStore::default();
    store.detach();
    store.begin_action();
    store.apply_snapshot(&Snapshot::Data(vec![raw("a", 1)]));
    let state = store.snapshot();
    assert!(!state.loading);
    assert!(state.entries.is_empty());
  }
}
