//! Collaborator traits: the assessment service, the history source and the
//! notifier.
//!
//! The orchestration core depends on these abstractions, never on a concrete
//! transport. All async methods return `Send` futures so implementations can
//! be driven from a multi-threaded tokio runtime.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  assessment::AssessmentLogEntry,
  outcome::{CheckOutcome, ServiceFailure},
  subject::SubjectRef,
};

// ─── Assessment service ──────────────────────────────────────────────────────

/// Runs a risk check against the third-party provider and records it.
///
/// A structured `success: false` is a domain failure and comes back as
/// `Ok`; only calls that did not complete normally return `Err`.
pub trait AssessmentService: Send + Sync {
  fn check_risk<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<CheckOutcome, ServiceFailure>> + Send + 'a;
}

// ─── History source ──────────────────────────────────────────────────────────

/// Read side of the assessment store, keyed by subject.
///
/// Each call performs a fresh read; caching and invalidation are layered on
/// top by the subscription proxy.
pub trait HistorySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<Vec<AssessmentLogEntry>, Self::Error>> + Send + 'a;
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Severity class of a user notification.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Success,
  Warning,
  Error,
}

/// Fire-and-forget user notifications (toasts, status lines, logs…).
pub trait Notifier: Send + Sync {
  fn notify(&self, title: &str, message: &str, severity: Severity);
}

// ─── Shared-pointer forwarding ───────────────────────────────────────────────

impl<T: AssessmentService> AssessmentService for Arc<T> {
  fn check_risk<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<CheckOutcome, ServiceFailure>> + Send + 'a {
    (**self).check_risk(subject)
  }
}

impl<T: HistorySource> HistorySource for Arc<T> {
  type Error = T::Error;

  fn fetch<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<Vec<AssessmentLogEntry>, Self::Error>> + Send + 'a
  {
    (**self).fetch(subject)
  }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
  fn notify(&self, title: &str, message: &str, severity: Severity) {
    (**self).notify(title, message, severity)
  }
}
