//! Orchestration core of the riskcheck panel.
//!
//! Raw history flows `subscription → transform → sort → state`; user
//! triggers flow `orchestrator → assessment service → state`, followed by an
//! invalidation of the subscription that feeds fresh history back through
//! the same pipeline. [`RiskPanel`] wires the pieces together for one
//! subject.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod panel;
pub mod sort;
pub mod state;
pub mod subscription;
pub mod transform;

pub use config::PanelConfig;
pub use error::SubscriptionError;
pub use orchestrator::{CycleOutcome, Orchestrator, Phase};
pub use panel::RiskPanel;
pub use sort::{SortDirection, SortField, SortSpec};
pub use state::{ViewState, ViewStore};
pub use subscription::{Snapshot, SubscriptionProxy};
