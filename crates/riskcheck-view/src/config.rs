//! Panel configuration.
//!
//! Deserialised from the `[panel]` table of a front end's config file; every
//! field has a default so an empty table is valid.

use serde::{Deserialize, Serialize};

use crate::sort::SortSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
  /// Sort applied until the user picks another column.
  pub default_sort:  SortSpec,
  pub success_title: String,
  pub warning_title: String,
  pub error_title:   String,
}

impl Default for PanelConfig {
  fn default() -> Self {
    Self {
      default_sort:  SortSpec::default(),
      success_title: "Risk check complete".into(),
      warning_title: "Risk check warning".into(),
      error_title:   "Risk check failed".into(),
    }
  }
}
