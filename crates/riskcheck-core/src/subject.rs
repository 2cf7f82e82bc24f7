//! Subject reference — the opaque id of the entity under assessment.
//!
//! The panel never looks inside the id; it only hands it to the assessment
//! service and uses it to key the history subscription.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque, non-empty identifier of an assessed entity (e.g. a contact).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectRef(String);

impl SubjectRef {
  /// Wrap `id`, rejecting blank input.
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    let trimmed = id.trim();
    if trimmed.is_empty() {
      return Err(Error::EmptySubject);
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for SubjectRef {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for SubjectRef {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<SubjectRef> for String {
  fn from(value: SubjectRef) -> Self { value.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_subject_is_rejected() {
    assert!(matches!(SubjectRef::new("   "), Err(Error::EmptySubject)));
    assert!(matches!("".parse::<SubjectRef>(), Err(Error::EmptySubject)));
  }

  #[test]
  fn subject_is_trimmed() {
    let s = SubjectRef::new("  003XX000004TmiQ ").unwrap();
    assert_eq!(s.as_str(), "003XX000004TmiQ");
    assert_eq!(s.to_string(), "003XX000004TmiQ");
  }

  #[test]
  fn subject_serialises_as_plain_string() {
    let s = SubjectRef::new("abc").unwrap();
    assert_eq!(serde_json::to_string(&s).unwrap(), "\"abc\"");
    let back: SubjectRef = serde_json::from_str("\"abc\"").unwrap();
    assert_eq!(back, s);
    assert!(serde_json::from_str::<SubjectRef>("\"\"").is_err());
  }
}
