//! Terminal notifier: toast-style lines on stderr, mirrored into the log.

use riskcheck_core::service::{Notifier, Severity};

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
  fn notify(&self, title: &str, message: &str, severity: Severity) {
    match severity {
      Severity::Success => tracing::info!(title, body = message, "notification"),
      Severity::Warning => tracing::warn!(title, body = message, "notification"),
      Severity::Error => tracing::error!(title, body = message, "notification"),
    }
    eprintln!("[{severity}] {title}: {message}");
  }
}
