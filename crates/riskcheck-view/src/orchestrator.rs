//! Action orchestrator — runs one risk check at a time and folds its result
//! into the view.
//!
//! ```text
//!   Idle ──try_begin──▶ Triggering ──service settles──▶ Settling ──invalidate resolves──▶ Idle
//! ```
//!
//! The Idle gate is checked once, at [`Orchestrator::try_begin`]. A request
//! arriving in any other phase is ignored. After the service call settles,
//! whatever its outcome, the loading flag drops and the history subscription
//! is invalidated before the orchestrator returns to `Idle`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use riskcheck_core::{
  outcome::LatestResult,
  service::{AssessmentService, HistorySource, Notifier, Severity},
  subject::SubjectRef,
};
use strum::Display;

use crate::{
  config::PanelConfig,
  state::ViewStore,
  subscription::SubscriptionProxy,
  transform::PLACEHOLDER,
};

/// Prefix of the error message shown for a domain failure.
pub const API_ERROR_PREFIX: &str = "API responded with an error: ";

/// Reason used when a domain failure carries no message of its own.
pub const UNKNOWN_API_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
  Idle,
  Triggering,
  Settling,
}

/// How an accepted trigger ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
  Assessed(LatestResult),
  DomainFailure(LatestResult),
  /// Carries the message shown to the user.
  TransportFailure(String),
}

#[derive(Debug, Clone)]
struct Titles {
  success: String,
  warning: String,
  error:   String,
}

/// Proof that the Idle gate was passed. Returns the orchestrator to `Idle`
/// when dropped, including when the running cycle is aborted.
pub struct PhaseGuard {
  phase: Arc<Mutex<Phase>>,
}

impl PhaseGuard {
  fn set(&self, next: Phase) { *lock(&self.phase) = next; }
}

impl Drop for PhaseGuard {
  fn drop(&mut self) { self.set(Phase::Idle); }
}

fn lock(phase: &Mutex<Phase>) -> MutexGuard<'_, Phase> {
  phase.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Orchestrator<S, N> {
  service:  S,
  notifier: N,
  titles:   Titles,
  phase:    Arc<Mutex<Phase>>,
}

impl<S, N> Orchestrator<S, N>
where
  S: AssessmentService,
  N: Notifier,
{
  pub fn new(service: S, notifier: N, config: &PanelConfig) -> Self {
    Self {
      service,
      notifier,
      titles: Titles {
        success: config.success_title.clone(),
        warning: config.warning_title.clone(),
        error:   config.error_title.clone(),
      },
      phase: Arc::new(Mutex::new(Phase::Idle)),
    }
  }

  pub fn phase(&self) -> Phase { *lock(&self.phase) }

  /// Pass the Idle gate, moving to `Triggering`. Returns `None` (and changes
  /// nothing) when a cycle is already running.
  pub fn try_begin(&self) -> Option<PhaseGuard> {
    let mut phase = lock(&self.phase);
    if *phase != Phase::Idle {
      tracing::debug!(phase = %*phase, "risk check already running; ignoring trigger");
      return None;
    }
    *phase = Phase::Triggering;
    Some(PhaseGuard {
      phase: Arc::clone(&self.phase),
    })
  }

  /// Run one full cycle if the orchestrator is idle.
  pub async fn trigger<H>(
    &self,
    subject: &SubjectRef,
    view: &ViewStore,
    history: Option<&SubscriptionProxy<H>>,
  ) -> Option<CycleOutcome>
  where
    H: HistorySource + 'static,
  {
    let guard = self.try_begin()?;
    Some(self.run(guard, subject, view, history).await)
  }

  /// Run the cycle admitted by `guard`: call the service, record the
  /// result, then settle.
  pub async fn run<H>(
    &self,
    guard: PhaseGuard,
    subject: &SubjectRef,
    view: &ViewStore,
    history: Option<&SubscriptionProxy<H>>,
  ) -> CycleOutcome
  where
    H: HistorySource + 'static,
  {
    view.begin_action();
    tracing::info!(subject = %subject, "risk check triggered");

    let outcome = match self.service.check_risk(subject).await {
      Ok(result) if result.success => {
        let latest = LatestResult::from(result);
        let level = latest
          .risk_level
          .map(|level| level.to_string())
          .unwrap_or_else(|| PLACEHOLDER.to_string());
        tracing::info!(subject = %subject, risk_level = %level, "risk check succeeded");
        view.record_outcome(latest.clone(), None);
        self.notify(
          view,
          &self.titles.success,
          &format!("Risk level: {level}"),
          Severity::Success,
        );
        CycleOutcome::Assessed(latest)
      }
      Ok(result) => {
        let reason = result
          .error_message
          .clone()
          .filter(|reason| !reason.trim().is_empty())
          .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string());
        tracing::warn!(subject = %subject, reason = %reason, "risk API reported a failure");
        let latest = LatestResult::from(result);
        view.record_outcome(
          latest.clone(),
          Some(format!("{API_ERROR_PREFIX}{reason}")),
        );
        self.notify(view, &self.titles.warning, &reason, Severity::Warning);
        CycleOutcome::DomainFailure(latest)
      }
      Err(failure) => {
        let message = failure.user_message();
        tracing::error!(
          subject = %subject,
          error = %failure,
          message = %message,
          "risk check call failed"
        );
        view.record_action_error(message.clone());
        self.notify(view, &self.titles.error, &message, Severity::Error);
        CycleOutcome::TransportFailure(message)
      }
    };

    guard.set(Phase::Settling);
    view.end_action();

    if let Some(history) = history.filter(|history| history.is_bound()) {
      // The check may have written a log entry; a fetch already in flight
      // could predate it.
      history.mark_stale();
      // Best effort: a failed refresh already surfaces through the
      // subscription's own error snapshot.
      if let Err(e) = history.invalidate().await {
        tracing::debug!(subject = %subject, error = %e, "post-check history refresh failed");
      }
    }

    drop(guard);
    outcome
  }

  fn notify(
    &self,
    view: &ViewStore,
    title: &str,
    message: &str,
    severity: Severity,
  ) {
    if view.is_detached() {
      return;
    }
    self.notifier.notify(title, message, severity);
  }
}
