//! The scheduler — orchestration of the pure rules over a store and a clock.
//!
//! Calculation is pure (see [`crate::rules`]); the only side effects are the
//! documented per-jurisdiction status writes in
//! [`Scheduler::calculate_multi_jurisdiction_status`] and the in-place
//! mutation of the `Work` passed to [`Scheduler::update_work_status`] and
//! [`Scheduler::days_until_expiry`]. The split is visible in the API:
//! [`Scheduler::plan_multi_jurisdiction_status`] returns the status map plus
//! write intents without touching storage.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::{
  clock::Clock,
  jurisdiction::Jurisdiction,
  rules::{self, AuthorshipHeuristics, NameHeuristics},
  status::CopyrightStatus,
  store::CopyrightStore,
  work::Work,
};

// ─── Write intents ───────────────────────────────────────────────────────────

/// One pending per-jurisdiction status write, keyed by
/// `(work_id, jurisdiction_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrite {
  pub work_id:         i64,
  pub jurisdiction_id: i64,
  pub status:          CopyrightStatus,
  pub expiry_date:     Option<NaiveDate>,
}

/// The outcome of a multi-jurisdiction pass before any persistence: the
/// status map (keyed by jurisdiction code) and the write intents for every
/// pair of persisted ids.
#[derive(Debug, Clone, Default)]
pub struct StatusPlan {
  pub statuses: BTreeMap<String, CopyrightStatus>,
  pub writes:   Vec<StatusWrite>,
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// The copyright status/expiry scheduler.
///
/// Single-threaded and synchronous in spirit: no internal parallelism, no
/// retries. Storage failures surface as the store's error; missing data
/// surfaces as `None` or `Unknown`, never as an error.
pub struct Scheduler<S, H = NameHeuristics> {
  store:      S,
  clock:      Clock,
  heuristics: H,
}

impl<S: CopyrightStore> Scheduler<S> {
  pub fn new(store: S, clock: Clock) -> Self {
    Self { store, clock, heuristics: NameHeuristics }
  }
}

impl<S: CopyrightStore, H: AuthorshipHeuristics> Scheduler<S, H> {
  /// Build a scheduler with a substitute authorship classification scheme.
  pub fn with_heuristics(store: S, clock: Clock, heuristics: H) -> Self {
    Self { store, clock, heuristics }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn clock(&self) -> &Clock { &self.clock }

  pub fn clock_mut(&mut self) -> &mut Clock { &mut self.clock }

  // ── Expiry ────────────────────────────────────────────────────────────────

  /// Estimated expiry of `work` in `jurisdiction`.
  ///
  /// Falls back to the work's primary jurisdiction when none is supplied,
  /// else proceeds jurisdiction-less. Special rules, when the jurisdiction
  /// has them, take strict precedence over the standard calculation.
  pub async fn calculate_expiry(
    &self,
    work: &Work,
    jurisdiction: Option<&Jurisdiction>,
  ) -> Result<Option<NaiveDate>, S::Error> {
    let jurisdiction = jurisdiction.or(work.primary_jurisdiction.as_ref());

    if let Some(j) = jurisdiction {
      if j.has_special_rules {
        if let Some(expiry) = self.special_rule_expiry(work, j).await? {
          return Ok(Some(expiry));
        }
      }
    }

    Ok(rules::standard_expiry(work, jurisdiction))
  }

  /// Look up the jurisdiction's persisted rule set and apply it. Requires a
  /// persisted jurisdiction id; absent otherwise.
  async fn special_rule_expiry(
    &self,
    work: &Work,
    jurisdiction: &Jurisdiction,
  ) -> Result<Option<NaiveDate>, S::Error> {
    let Some(jurisdiction_id) = jurisdiction.id else {
      return Ok(None);
    };
    let rule_rows = self.store.rules_for_jurisdiction(jurisdiction_id).await?;
    Ok(rules::special_rule_expiry(
      work,
      jurisdiction,
      &rule_rows,
      &self.heuristics,
    ))
  }

  // ── Classification ────────────────────────────────────────────────────────

  /// Tri-state status of `work`, optionally in one jurisdiction.
  ///
  /// Previously computed results are trusted: a known global status when no
  /// jurisdiction is given, and a per-jurisdiction map entry when one is.
  /// Only on a miss is the expiry computed and classified against
  /// `current_date` (default: the scheduler's clock).
  pub async fn determine_status(
    &self,
    work: &Work,
    jurisdiction: Option<&Jurisdiction>,
    current_date: Option<NaiveDate>,
  ) -> Result<CopyrightStatus, S::Error> {
    let today = current_date.unwrap_or_else(|| self.clock.today());

    if jurisdiction.is_none() && work.status.is_known() {
      return Ok(work.status);
    }

    if let Some(code) = jurisdiction.and_then(|j| j.code.as_deref()) {
      if let Some(&cached) = work.status_by_jurisdiction.get(code) {
        return Ok(cached);
      }
    }

    let expiry = self.calculate_expiry(work, jurisdiction).await?;
    Ok(rules::classify(expiry, work, jurisdiction, today))
  }

  // ── Multi-jurisdiction aggregation ────────────────────────────────────────

  /// The pure half of the aggregator: compute the status map across
  /// `jurisdictions` (default: all known) and collect write intents for
  /// every `(persisted work, persisted jurisdiction)` pair. No storage
  /// writes happen here.
  pub async fn plan_multi_jurisdiction_status(
    &self,
    work: &Work,
    jurisdictions: Option<&[Jurisdiction]>,
  ) -> Result<StatusPlan, S::Error> {
    let fetched;
    let jurisdictions = match jurisdictions {
      Some(list) => list,
      None => {
        fetched = self.store.list_jurisdictions().await?;
        &fetched
      }
    };

    let mut plan = StatusPlan::default();
    for jurisdiction in jurisdictions {
      let Some(code) = jurisdiction.code.as_deref() else {
        continue;
      };

      let status = self.determine_status(work, Some(jurisdiction), None).await?;
      plan.statuses.insert(code.to_owned(), status);

      if let (Some(work_id), Some(jurisdiction_id)) = (work.id, jurisdiction.id)
      {
        let expiry_date =
          self.calculate_expiry(work, Some(jurisdiction)).await?;
        plan.writes.push(StatusWrite {
          work_id,
          jurisdiction_id,
          status,
          expiry_date,
        });
      }
    }

    Ok(plan)
  }

  /// Plan, then persist each write intent through the store.
  pub async fn calculate_multi_jurisdiction_status(
    &self,
    work: &Work,
    jurisdictions: Option<&[Jurisdiction]>,
  ) -> Result<BTreeMap<String, CopyrightStatus>, S::Error> {
    let plan = self.plan_multi_jurisdiction_status(work, jurisdictions).await?;

    for write in &plan.writes {
      self
        .store
        .set_jurisdiction_status(
          write.work_id,
          write.jurisdiction_id,
          write.status,
          write.expiry_date,
        )
        .await?;
    }

    Ok(plan.statuses)
  }

  // ── Orchestration entry point ─────────────────────────────────────────────

  /// Recompute everything for one work, in place:
  ///
  /// 1. the global expiry estimate — only if not already set (an existing
  ///    value, even a stale one, is never refreshed);
  /// 2. the global status;
  /// 3. the per-jurisdiction status map (with its persistence side effect);
  /// 4. the primary jurisdiction, when unset, from the first author
  ///    nationality matching a catalog code — authors in original order,
  ///    catalog in insertion order.
  ///
  /// Idempotent given unchanged inputs and an unchanged current date.
  pub async fn update_work_status(
    &self,
    work: &mut Work,
  ) -> Result<(), S::Error> {
    let jurisdictions = self.store.list_jurisdictions().await?;

    if work.copyright_expiry_date.is_none() {
      work.copyright_expiry_date = self.calculate_expiry(work, None).await?;
    }

    work.status = self.determine_status(work, None, None).await?;
    work.status_by_jurisdiction = self
      .calculate_multi_jurisdiction_status(work, Some(&jurisdictions))
      .await?;

    if work.primary_jurisdiction.is_none() {
      'authors: for author in &work.authors {
        if let Some(nationality) = author.nationality.as_deref() {
          for jurisdiction in &jurisdictions {
            if jurisdiction.has_code(nationality) {
              work.primary_jurisdiction = Some(jurisdiction.clone());
              break 'authors;
            }
          }
        }
      }
    }

    Ok(())
  }

  // ── Query helpers ─────────────────────────────────────────────────────────

  /// Days until `work`'s copyright expires in `jurisdiction`.
  ///
  /// `None` when the expiry is unknown, when the work is already public
  /// domain, or when the expiry has passed but the status disagrees. With no
  /// jurisdiction, computes and caches the global expiry on the work if
  /// unset.
  pub async fn days_until_expiry(
    &self,
    work: &mut Work,
    jurisdiction: Option<&Jurisdiction>,
    current_date: Option<NaiveDate>,
  ) -> Result<Option<i64>, S::Error> {
    let today = current_date.unwrap_or_else(|| self.clock.today());

    let expiry = match jurisdiction {
      Some(_) => self.calculate_expiry(work, jurisdiction).await?,
      None => {
        if work.copyright_expiry_date.is_none() {
          work.copyright_expiry_date =
            self.calculate_expiry(work, None).await?;
        }
        work.copyright_expiry_date
      }
    };
    let Some(expiry) = expiry else {
      return Ok(None);
    };

    let status =
      self.determine_status(work, jurisdiction, Some(today)).await?;
    if status == CopyrightStatus::PublicDomain {
      return Ok(None);
    }

    let days = (expiry - today).num_days();
    Ok((days >= 0).then_some(days))
  }

  /// All persisted works with `status` in the jurisdiction named by `code`.
  ///
  /// Recomputes per work rather than reading persisted status rows —
  /// correctness over staleness, at linear-scan cost. Unknown codes return
  /// an empty list.
  pub async fn works_by_status_in_jurisdiction(
    &self,
    code: &str,
    status: CopyrightStatus,
  ) -> Result<Vec<Work>, S::Error> {
    let jurisdictions = self.store.list_jurisdictions().await?;
    let Some(jurisdiction) =
      jurisdictions.into_iter().find(|j| j.has_code(code))
    else {
      warn!(code, "unknown jurisdiction code");
      return Ok(Vec::new());
    };

    let mut matching = Vec::new();
    for work in self.store.list_works().await? {
      let work_status =
        self.determine_status(&work, Some(&jurisdiction), None).await?;
      if work_status == status {
        matching.push(work);
      }
    }
    Ok(matching)
  }
}
