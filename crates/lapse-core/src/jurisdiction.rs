//! Jurisdiction catalog records.
//!
//! A jurisdiction carries the standard life+N term; the exceptions to that
//! term live in owned [`CopyrightRule`] rows keyed by `rule_type`.

use serde::{Deserialize, Serialize};

/// The standard "life of the author plus N years" term applied when a
/// jurisdiction does not specify its own.
pub const DEFAULT_TERM_YEARS: i32 = 70;

/// A legal region with its own copyright-term rules.
///
/// `code` (e.g. `"US"`, `"EU"`) is unique when present and is the join key
/// used everywhere a status map crosses a component boundary; surrogate ids
/// never leave the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
  pub id:                     Option<i64>,
  pub name:                   String,
  pub code:                   Option<String>,
  pub term_years_after_death: i32,
  pub has_special_rules:      bool,
}

impl Jurisdiction {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      id:                     None,
      name:                   name.into(),
      code:                   None,
      term_years_after_death: DEFAULT_TERM_YEARS,
      has_special_rules:      false,
    }
  }

  pub fn with_code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }

  /// True when this jurisdiction's code matches `code`.
  pub fn has_code(&self, code: &str) -> bool {
    self.code.as_deref() == Some(code)
  }
}

impl std::fmt::Display for Jurisdiction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.name)
  }
}

/// Which date a special rule's term is counted from.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BaseDateType {
  #[default]
  Publication,
  Creation,
  AuthorDeath,
  FixedYear,
}

/// A jurisdiction-specific exception that overrides the standard life+N
/// calculation. At most one rule exists per `(jurisdiction, rule_type)` pair;
/// the store enforces this with upsert semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyrightRule {
  pub id:              Option<i64>,
  pub jurisdiction_id: i64,
  /// Free-form tag dispatched on by the rules engine, e.g.
  /// `"published_before_1923"`, `"anonymous_works"`, `"crown_copyright"`.
  pub rule_type:       String,
  pub term_years:      i32,
  pub base_date_type:  BaseDateType,
  pub description:     String,
}

impl CopyrightRule {
  pub fn new(
    jurisdiction_id: i64,
    rule_type: impl Into<String>,
    term_years: i32,
  ) -> Self {
    Self {
      id: None,
      jurisdiction_id,
      rule_type: rule_type.into(),
      term_years,
      base_date_type: BaseDateType::default(),
      description: String::new(),
    }
  }
}
