//! The `CopyrightStore` trait — the narrow contract between the rules engine
//! and persistent storage.
//!
//! The trait is implemented by storage backends (e.g. `lapse-store-sqlite`).
//! The scheduler depends on this abstraction, not on any concrete backend.
//! Backends convert transient lookup failures into absent results where the
//! contract allows (a jurisdiction without rules behaves as "no special rule
//! applies"); the scheduler never retries.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  jurisdiction::{CopyrightRule, Jurisdiction},
  status::{CopyrightStatus, JurisdictionStatus},
  work::Work,
};

/// Abstraction over the relational store backing the scheduler.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes. The scheduler assumes single-writer access
/// per work record; callers must serialize concurrent aggregation passes
/// over the same work externally.
pub trait CopyrightStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The full jurisdiction catalog, in insertion order. That order is the
  /// tie-break for primary-jurisdiction reconciliation.
  fn list_jurisdictions(
    &self,
  ) -> impl Future<Output = Result<Vec<Jurisdiction>, Self::Error>> + Send + '_;

  /// Special rules owned by one jurisdiction. Empty when none exist.
  fn rules_for_jurisdiction(
    &self,
    jurisdiction_id: i64,
  ) -> impl Future<Output = Result<Vec<CopyrightRule>, Self::Error>> + Send + '_;

  /// The persisted per-jurisdiction status of a work, if one was recorded.
  fn get_jurisdiction_status(
    &self,
    work_id: i64,
    jurisdiction_id: i64,
  ) -> impl Future<Output = Result<Option<JurisdictionStatus>, Self::Error>> + Send + '_;

  /// Record a work's status in one jurisdiction; upsert keyed by
  /// `(work_id, jurisdiction_id)`.
  fn set_jurisdiction_status(
    &self,
    work_id: i64,
    jurisdiction_id: i64,
    status: CopyrightStatus,
    expiry_date: Option<NaiveDate>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every persisted work. Loaded works carry an *empty*
  /// `status_by_jurisdiction` map, so status queries over this listing
  /// recompute rather than trust stale rows.
  fn list_works(
    &self,
  ) -> impl Future<Output = Result<Vec<Work>, Self::Error>> + Send + '_;
}
