//! The tri-state copyright status and the per-jurisdiction status record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Copyright classification of a work. The string forms are the closed set
/// that crosses every external boundary (database rows, reports).
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
pub enum CopyrightStatus {
  #[serde(rename = "Public Domain")]
  #[strum(serialize = "Public Domain")]
  PublicDomain,
  Copyrighted,
  #[default]
  Unknown,
}

impl CopyrightStatus {
  pub fn is_known(&self) -> bool { !matches!(self, Self::Unknown) }
}

/// A work's computed status in one jurisdiction, as persisted by the
/// aggregator and read back by reporting surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionStatus {
  pub status:      CopyrightStatus,
  /// Estimated expiry underlying `status`; absent when it could not be
  /// computed.
  pub expiry_date: Option<NaiveDate>,
}
