//! Async HTTP adapters for the assessment backend.
//!
//! [`ApiClient`] implements both collaborator traits the panel needs:
//! [`AssessmentService`] (`POST …/risk-checks`) and [`HistorySource`]
//! (`GET …/risk-checks`).

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, Url};
use riskcheck_core::{
  assessment::AssessmentLogEntry,
  outcome::{CheckOutcome, FailureKind, ServiceFailure},
  service::{AssessmentService, HistorySource},
  subject::SubjectRef,
};
use serde::Deserialize;
use thiserror::Error;

/// Connection settings for the assessment backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
  pub timeout:  Duration,
}

/// Why a history read failed.
#[derive(Debug, Error)]
pub enum HistoryError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("server answered {0}")]
  Status(StatusCode),
}

/// Async HTTP client for the assessment backend.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
  config: Arc<ApiConfig>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let base = Url::parse(&config.base_url)
      .with_context(|| format!("invalid base URL {:?}", config.base_url))?;
    if base.cannot_be_a_base() {
      anyhow::bail!("base URL {:?} cannot carry a path", config.base_url);
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      base,
      config: Arc::new(config),
    })
  }

  /// `{base}/api/subjects/{subject}/risk-checks`, with the subject
  /// percent-encoded as a single path segment.
  fn checks_url(&self, subject: &SubjectRef) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .extend(["api", "subjects", subject.as_str(), "risk-checks"]);
    }
    url
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }
}

// ─── Assessment service ───────────────────────────────────────────────────────

impl AssessmentService for ApiClient {
  /// `POST /api/subjects/<id>/risk-checks`
  fn check_risk<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<CheckOutcome, ServiceFailure>> + Send + 'a {
    async move {
      let resp = self
        .auth(self.client.post(self.checks_url(subject)))
        .send()
        .await
        .map_err(request_failure)?;

      let status = resp.status();
      if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(status_failure(status, &body));
      }
      resp.json().await.map_err(|e| {
        ServiceFailure::with_message(
          FailureKind::Other,
          format!("unreadable risk check response: {e}"),
        )
      })
    }
  }
}

// ─── History source ───────────────────────────────────────────────────────────

impl HistorySource for ApiClient {
  type Error = HistoryError;

  /// `GET /api/subjects/<id>/risk-checks`
  fn fetch<'a>(
    &'a self,
    subject: &'a SubjectRef,
  ) -> impl Future<Output = Result<Vec<AssessmentLogEntry>, HistoryError>> + Send + 'a
  {
    async move {
      let resp = self
        .auth(self.client.get(self.checks_url(subject)))
        .send()
        .await?;
      if !resp.status().is_success() {
        return Err(HistoryError::Status(resp.status()));
      }
      Ok(resp.json().await?)
    }
  }
}

// ─── Failure mapping ──────────────────────────────────────────────────────────

/// Error bodies come as `{"message": …}` or `{"error": …}`.
#[derive(Deserialize)]
struct ErrorBody {
  message: Option<String>,
  error:   Option<String>,
}

fn request_failure(e: reqwest::Error) -> ServiceFailure {
  let kind = if e.is_timeout() {
    FailureKind::Timeout
  } else if e.is_connect() || e.is_request() {
    FailureKind::Network
  } else {
    FailureKind::Other
  };
  ServiceFailure::with_message(kind, e.to_string())
}

fn status_failure(status: StatusCode, body: &str) -> ServiceFailure {
  let body_message = serde_json::from_str::<ErrorBody>(body)
    .ok()
    .and_then(|body| body.message.or(body.error));
  let mut failure = ServiceFailure::server(status.as_u16(), body_message);
  if status == StatusCode::TOO_MANY_REQUESTS {
    failure.kind = FailureKind::QuotaExceeded;
  }
  failure
}

#[cfg(test)]
mod tests {
  use riskcheck_core::outcome::FALLBACK_FAILURE_MESSAGE;

  use super::*;

  fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ApiConfig {
      base_url: base_url.into(),
      username: String::new(),
      password: String::new(),
      timeout:  Duration::from_secs(5),
    })
    .unwrap()
  }

  #[test]
  fn checks_url_encodes_subject_segment() {
    let c = client("http://localhost:5232/");
    let subject = SubjectRef::new("003/ab cd").unwrap();
    assert_eq!(
      c.checks_url(&subject).as_str(),
      "http://localhost:5232/api/subjects/003%2Fab%20cd/risk-checks"
    );
  }

  #[test]
  fn checks_url_keeps_base_path() {
    let c = client("https://example.test/risk");
    let subject = SubjectRef::new("003").unwrap();
    assert_eq!(
      c.checks_url(&subject).as_str(),
      "https://example.test/risk/api/subjects/003/risk-checks"
    );
  }

  #[test]
  fn invalid_base_url_is_rejected() {
    assert!(
      ApiClient::new(ApiConfig {
        base_url: "not a url".into(),
        username: String::new(),
        password: String::new(),
        timeout:  Duration::from_secs(5),
      })
      .is_err()
    );
  }

  #[test]
  fn structured_error_body_becomes_server_message() {
    let failure = status_failure(
      StatusCode::INTERNAL_SERVER_ERROR,
      r#"{"message":"Callout limit reached"}"#,
    );
    assert_eq!(failure.kind, FailureKind::Server);
    assert_eq!(failure.status, Some(500));
    assert_eq!(failure.user_message(), "Callout limit reached");

    let api_style = status_failure(StatusCode::NOT_FOUND, r#"{"error":"no such subject"}"#);
    assert_eq!(api_style.user_message(), "no such subject");
  }

  #[test]
  fn unstructured_error_body_falls_back() {
    let failure = status_failure(StatusCode::BAD_GATEWAY, "<html>oops</html>");
    assert_eq!(failure.user_message(), FALLBACK_FAILURE_MESSAGE);
  }

  #[test]
  fn too_many_requests_is_quota() {
    let failure = status_failure(StatusCode::TOO_MANY_REQUESTS, "");
    assert_eq!(failure.kind, FailureKind::QuotaExceeded);
  }
}
