//! `RiskPanel` — the component façade the presentation layer talks to.
//!
//! It wires the orchestrator, the history subscription and the view store
//! together for one subject, and exposes the read-only view plus the two
//! commands: [`RiskPanel::trigger_assessment`] and
//! [`RiskPanel::request_sort`].
//!
//! Dropping the panel detaches its view and aborts an in-flight trigger, so
//! no continuation writes to a torn-down component.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use riskcheck_core::{
  service::{AssessmentService, HistorySource, Notifier},
  subject::SubjectRef,
};
use tokio::{
  sync::watch,
  task::{AbortHandle, JoinHandle},
};

use crate::{
  config::PanelConfig,
  orchestrator::{CycleOutcome, Orchestrator, Phase},
  sort::SortDirection,
  state::{ViewState, ViewStore},
  subscription::{Refresh, SubscriptionProxy},
};

struct PanelInner<S, H, N> {
  subject:      Mutex<SubjectRef>,
  orchestrator: Orchestrator<S, N>,
  history:      SubscriptionProxy<H>,
  view:         Arc<ViewStore>,
}

pub struct RiskPanel<S, H, N> {
  inner:    Arc<PanelInner<S, H, N>>,
  inflight: Mutex<Option<AbortHandle>>,
}

impl<S, H, N> RiskPanel<S, H, N>
where
  S: AssessmentService + 'static,
  H: HistorySource + 'static,
  N: Notifier + 'static,
{
  /// Build a panel for `subject` and start loading its history.
  ///
  /// Must be called from within a tokio runtime.
  pub fn new(
    subject: SubjectRef,
    service: S,
    history: H,
    notifier: N,
    config: PanelConfig,
  ) -> Self {
    let view = Arc::new(ViewStore::new(config.default_sort.clone()));
    let history = SubscriptionProxy::new(history);

    let sink = Arc::downgrade(&view);
    history.on_snapshot(move |snapshot| {
      if let Some(view) = sink.upgrade() {
        view.apply_snapshot(snapshot);
      }
    });
    drop(history.rebind(subject.clone()));

    tracing::info!(subject = %subject, "risk panel created");

    Self {
      inner:    Arc::new(PanelInner {
        subject: Mutex::new(subject),
        orchestrator: Orchestrator::new(service, notifier, &config),
        history,
        view,
      }),
      inflight: Mutex::new(None),
    }
  }

  pub fn subject(&self) -> SubjectRef { self.inner.subject().clone() }

  /// Switch to another subject: the old rows, latest result and error are
  /// dropped and the subscription re-binds.
  ///
  /// Returns `None` and changes nothing if `subject` is already current or
  /// a risk check is running. The switch holds the Idle gate, so no trigger
  /// can start for either subject while it happens.
  pub fn set_subject(&self, subject: SubjectRef) -> Option<Refresh> {
    let mut current = self.inner.subject();
    if *current == subject {
      return None;
    }
    let Some(_gate) = self.inner.orchestrator.try_begin() else {
      tracing::debug!(to = %subject, "risk check running; subject switch refused");
      return None;
    };
    tracing::info!(from = %*current, to = %subject, "switching subject");
    *current = subject.clone();
    drop(current);
    self.inner.view.reset_subject();
    Some(self.inner.history.rebind(subject))
  }

  // ── Read side ─────────────────────────────────────────────────────────

  pub fn view(&self) -> ViewState { self.inner.view.snapshot() }

  pub fn subscribe(&self) -> watch::Receiver<ViewState> {
    self.inner.view.subscribe()
  }

  pub fn phase(&self) -> Phase { self.inner.orchestrator.phase() }

  /// The history subscription, for consumers that refresh it on their own.
  pub fn history(&self) -> &SubscriptionProxy<H> { &self.inner.history }

  // ── Commands ──────────────────────────────────────────────────────────

  /// Start a risk check for the current subject.
  ///
  /// Returns `None` without side effects while a check is running. The
  /// returned handle resolves after the post-check history refresh.
  pub fn trigger_assessment(&self) -> Option<JoinHandle<CycleOutcome>> {
    let guard = self.inner.orchestrator.try_begin()?;
    let inner = Arc::clone(&self.inner);
    let subject = self.subject();

    let handle = tokio::spawn(async move {
      inner
        .orchestrator
        .run(guard, &subject, &inner.view, Some(&inner.history))
        .await
    });

    *self.inflight() = Some(handle.abort_handle());
    Some(handle)
  }

  /// Re-order the rows by `field`. Synchronous; never fetches.
  pub fn request_sort(&self, field: &str, direction: SortDirection) {
    tracing::debug!(field, ?direction, "sort requested");
    self.inner.view.request_sort(field, direction);
  }

  fn inflight(&self) -> MutexGuard<'_, Option<AbortHandle>> {
    self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<S, H, N> PanelInner<S, H, N> {
  fn subject(&self) -> MutexGuard<'_, SubjectRef> {
    self.subject.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<S, H, N> Drop for RiskPanel<S, H, N> {
  fn drop(&mut self) {
    self.inner.view.detach();
    let inflight = self
      .inflight
      .get_mut()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(handle) = inflight {
      handle.abort();
    }
  }
}
