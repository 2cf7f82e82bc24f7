//! Subscription cache proxy — a cached, invalidatable read channel over a
//! [`HistorySource`], bound to one subject at a time.
//!
//! Every (re)bind and every invalidation that starts a fetch publishes
//! [`Snapshot::Pending`], followed by exactly one [`Snapshot::Data`] or
//! [`Snapshot::Error`] once the fetch resolves. Snapshots are delivered
//! through a `watch` channel (for external consumers) and synchronously to
//! the registered listeners (for the view pipeline).
//!
//! Invalidations that overlap an in-flight fetch join it instead of starting
//! another one, unless the source was marked stale after that fetch began. Fetches are driven by a spawned task, so they complete even
//! when every caller drops its [`Refresh`] handle; the proxy must therefore
//! be used from within a tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use riskcheck_core::{
  assessment::AssessmentLogEntry,
  service::HistorySource,
  subject::SubjectRef,
};
use tokio::sync::watch;

use crate::error::{Result, SubscriptionError};

/// The latest value delivered by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
  Pending,
  Data(Vec<AssessmentLogEntry>),
  Error(String),
}

/// Resolves once the snapshot produced by a fetch has been delivered, or
/// with the reason it was not. Cloneable; all clones observe one fetch.
pub type Refresh = Shared<BoxFuture<'static, Result<()>>>;

type Listener = Box<dyn Fn(&Snapshot) + Send + Sync>;

struct Binding {
  subject:    Option<SubjectRef>,
  /// Bumped on every re-bind; results of older generations are discarded.
  generation: u64,
  /// Bumped by `mark_stale`; fetches started under an older epoch are not
  /// joined.
  epoch:      u64,
  /// Sequence number of the last fetch started.
  started:    u64,
  /// Sequence number of the last fetch whose snapshot was published.
  delivered:  u64,
  inflight:   Option<Inflight>,
}

struct Inflight {
  refresh: Refresh,
  epoch:   u64,
}

struct ProxyState {
  binding:   Mutex<Binding>,
  snapshots: watch::Sender<Snapshot>,
  listeners: Mutex<Vec<Listener>>,
}

impl ProxyState {
  fn binding(&self) -> MutexGuard<'_, Binding> {
    self.binding.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn deliver(
    &self,
    generation: u64,
    seq: u64,
    snapshot: &Snapshot,
  ) -> Result<()> {
    let mut binding = self.binding();
    if binding.generation != generation {
      tracing::debug!(
        generation,
        current = binding.generation,
        "discarding history result for a previous binding"
      );
      return Err(SubscriptionError::Superseded);
    }
    if seq < binding.delivered {
      // A later fetch already published newer data.
      tracing::debug!(
        seq,
        delivered = binding.delivered,
        "discarding out-of-order history result"
      );
      return Ok(());
    }
    binding.delivered = seq;
    self.publish(snapshot);
    Ok(())
  }

  /// Listeners run before `watch` receivers are woken, so a receiver that
  /// sees a snapshot also sees its effect on the view. Callers hold the
  /// binding lock, which orders publications.
  fn publish(&self, snapshot: &Snapshot) {
    {
      let listeners =
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
      for listener in listeners.iter() {
        listener(snapshot);
      }
    }
    self.snapshots.send_replace(snapshot.clone());
  }
}

/// A cheaply cloneable handle to one cached history subscription.
pub struct SubscriptionProxy<H> {
  source: Arc<H>,
  state:  Arc<ProxyState>,
}

impl<H> Clone for SubscriptionProxy<H> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
      state:  Arc::clone(&self.state),
    }
  }
}

impl<H> SubscriptionProxy<H>
where
  H: HistorySource + 'static,
{
  /// Create an unbound proxy; its snapshot stays `Pending` until
  /// [`rebind`](Self::rebind) is called.
  pub fn new(source: H) -> Self {
    let (snapshots, _) = watch::channel(Snapshot::Pending);
    Self {
      source: Arc::new(source),
      state:  Arc::new(ProxyState {
        binding: Mutex::new(Binding {
          subject:    None,
          generation: 0,
          epoch:      0,
          started:    0,
          delivered:  0,
          inflight:   None,
        }),
        snapshots,
        listeners: Mutex::new(Vec::new()),
      }),
    }
  }

  /// Create a proxy and immediately bind it to `subject`.
  pub fn bind(source: H, subject: SubjectRef) -> Self {
    let proxy = Self::new(source);
    drop(proxy.rebind(subject));
    proxy
  }

  pub fn subject(&self) -> Option<SubjectRef> {
    self.state.binding().subject.clone()
  }

  pub fn is_bound(&self) -> bool { self.state.binding().subject.is_some() }

  /// The most recently delivered snapshot.
  pub fn current_snapshot(&self) -> Snapshot {
    self.state.snapshots.borrow().clone()
  }

  /// Observe snapshot deliveries. Intermediate values may be skipped by a
  /// slow receiver; the latest one is always visible.
  pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
    self.state.snapshots.subscribe()
  }

  /// Register a callback run synchronously on every delivery.
  ///
  /// Listeners run under the proxy's internal lock and must not call back
  /// into the proxy.
  pub fn on_snapshot<F>(&self, listener: F)
  where
    F: Fn(&Snapshot) + Send + Sync + 'static,
  {
    self
      .state
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Box::new(listener));
  }

  /// Bind to `subject`, discarding any in-flight fetch for the previous
  /// subject, and start a fresh `Pending → Data | Error` cycle.
  pub fn rebind(&self, subject: SubjectRef) -> Refresh {
    let mut binding = self.state.binding();
    binding.generation += 1;
    binding.subject = Some(subject.clone());
    tracing::debug!(
      subject = %subject,
      generation = binding.generation,
      "binding history subscription"
    );
    self.start_fetch(&mut binding, subject)
  }

  /// Record that the underlying data changed. The next
  /// [`invalidate`](Self::invalidate) starts a fresh fetch instead of
  /// joining one that may have read the data before the change.
  pub fn mark_stale(&self) {
    let mut binding = self.state.binding();
    binding.epoch += 1;
  }

  /// Discard the cached value for the current subject and re-fetch.
  ///
  /// Joins the in-flight fetch if there is one that began after the last
  /// [`mark_stale`](Self::mark_stale). The returned future fails
  /// with [`SubscriptionError::Fetch`] when the re-fetch fails, after the
  /// matching [`Snapshot::Error`] has been delivered.
  pub fn invalidate(&self) -> Refresh {
    let mut binding = self.state.binding();
    let Some(subject) = binding.subject.clone() else {
      return future::ready(Err(SubscriptionError::Unbound))
        .boxed()
        .shared();
    };
    let epoch = binding.epoch;
    if let Some(inflight) = binding.inflight.as_ref().filter(|inflight| {
      inflight.epoch == epoch && inflight.refresh.peek().is_none()
    }) {
      tracing::debug!(subject = %subject, "joining in-flight history fetch");
      return inflight.refresh.clone();
    }
    self.start_fetch(&mut binding, subject)
  }

  fn start_fetch(&self, binding: &mut Binding, subject: SubjectRef) -> Refresh {
    let generation = binding.generation;
    binding.started += 1;
    let seq = binding.started;
    let source = Arc::clone(&self.source);
    let state = Arc::downgrade(&self.state);

    let refresh = async move {
      tracing::debug!(subject = %subject, "fetching assessment history");
      let snapshot = match source.fetch(&subject).await {
        Ok(entries) => {
          tracing::debug!(
            subject = %subject,
            count = entries.len(),
            "assessment history loaded"
          );
          Snapshot::Data(entries)
        }
        Err(e) => {
          tracing::warn!(
            subject = %subject,
            error = %e,
            "assessment history fetch failed"
          );
          Snapshot::Error(e.to_string())
        }
      };

      let state = state.upgrade().ok_or(SubscriptionError::Detached)?;
      state.deliver(generation, seq, &snapshot)?;
      match snapshot {
        Snapshot::Error(reason) => Err(SubscriptionError::Fetch(reason)),
        _ => Ok(()),
      }
    }
    .boxed()
    .shared();

    binding.inflight = Some(Inflight {
      refresh: refresh.clone(),
      epoch:   binding.epoch,
    });
    self.state.publish(&Snapshot::Pending);
    tokio::spawn(refresh.clone());
    refresh
  }
}
