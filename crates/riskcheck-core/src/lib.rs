//! Core types and collaborator traits for the riskcheck panel.
//!
//! This crate is deliberately free of HTTP, UI and runtime dependencies.
//! The orchestration core (`riskcheck-view`) and every front end depend on
//! it; it depends on nothing proprietary.

pub mod assessment;
pub mod error;
pub mod outcome;
pub mod service;
pub mod subject;

pub use error::{Error, Result};
