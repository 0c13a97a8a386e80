//! The pure copyright rules: expiry calculation and status classification.
//!
//! Everything here is a total function of its arguments — no storage, no
//! clock. The [`Scheduler`](crate::scheduler::Scheduler) fetches rule rows
//! and the current date, then delegates to these functions.
//!
//! All computed expiries land on December 31 of the target year, the
//! end-of-year convention used by most real copyright terms. Insufficient
//! data is `None`, never an error.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::{
  jurisdiction::{CopyrightRule, Jurisdiction, DEFAULT_TERM_YEARS},
  status::CopyrightStatus,
  work::{Author, Work},
};

/// Conservative term applied to the creation-date fallback when no
/// jurisdiction is known.
pub const FALLBACK_TERM_YEARS: i32 = 95;
/// US creation-date fallback term (corporate / pre-1978 proxy).
pub const US_FALLBACK_TERM_YEARS: i32 = 95;
/// EU creation-date fallback term (anonymous-work proxy).
pub const EU_FALLBACK_TERM_YEARS: i32 = 70;

/// Works created before this year are treated as public domain nearly
/// everywhere when no expiry can be computed.
pub const GENERAL_PUBLIC_DOMAIN_CUTOFF: i32 = 1875;
/// Narrower US-only cutoff, checked after the general one.
pub const US_PUBLIC_DOMAIN_CUTOFF: i32 = 1927;

/// December 31 of `year` — the end-of-year expiry convention.
pub fn end_of_year(year: i32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, 12, 31).expect("Dec 31 exists in every year")
}

// ─── Authorship heuristics ───────────────────────────────────────────────────

/// Pluggable classification of authors for the special-rule pattern matches.
///
/// The defaults are deliberately crude string heuristics inherited from the
/// illustrative rule set; substitute a stricter scheme without touching the
/// rule-dispatch logic.
pub trait AuthorshipHeuristics: Send + Sync {
  fn is_corporate_author(&self, author: &Author) -> bool;
  fn is_crown_author(&self, author: &Author) -> bool;
}

/// Name-suffix heuristics: `" Inc."` marks a corporate author, the literal
/// name `"Crown"` marks Crown copyright.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeuristics;

impl AuthorshipHeuristics for NameHeuristics {
  fn is_corporate_author(&self, author: &Author) -> bool {
    author.name.ends_with(" Inc.")
  }

  fn is_crown_author(&self, author: &Author) -> bool {
    author.name == "Crown"
  }
}

// ─── Standard calculation ────────────────────────────────────────────────────

/// Standard "life + N years" expiry.
///
/// Bases the term on the latest *known* author death date; authors with
/// unknown death dates are ignored as long as at least one is known. When no
/// death date is usable, falls back to the creation date with
/// per-jurisdiction fallback terms. `None` when neither basis exists.
pub fn standard_expiry(
  work: &Work,
  jurisdiction: Option<&Jurisdiction>,
) -> Option<NaiveDate> {
  let term_years = jurisdiction
    .map(|j| j.term_years_after_death)
    .unwrap_or(DEFAULT_TERM_YEARS);

  if !work.authors.is_empty() {
    let (latest_death, all_known) = work.latest_author_death();

    if let Some(death) = latest_death {
      let expiry = end_of_year(death.year() + term_years);
      info!(
        work = %work.title,
        term_years,
        jurisdiction = jurisdiction.map(|j| j.name.as_str()),
        %expiry,
        "expiry estimated from life + term"
      );
      return Some(expiry);
    }

    if !all_known && work.creation_date.is_none() {
      warn!(work = %work.title, "author death date(s) unknown, cannot estimate expiry");
      return None;
    }
  }

  if let Some(creation) = work.creation_date {
    let term_years = match jurisdiction {
      Some(j) if j.has_code("US") => US_FALLBACK_TERM_YEARS,
      Some(j) if j.has_code("EU") => EU_FALLBACK_TERM_YEARS,
      Some(j) => j.term_years_after_death,
      None => FALLBACK_TERM_YEARS,
    };
    let expiry = end_of_year(creation.year() + term_years);
    info!(
      work = %work.title,
      term_years,
      %expiry,
      "expiry estimated from creation + term"
    );
    return Some(expiry);
  }

  warn!(work = %work.title, "insufficient information to estimate expiry");
  None
}

// ─── Special rules ───────────────────────────────────────────────────────────

fn find_rule<'a>(
  rules: &'a [CopyrightRule],
  rule_type: &str,
) -> Option<&'a CopyrightRule> {
  rules.iter().find(|r| r.rule_type == rule_type)
}

/// Jurisdiction-coded exceptions that take strict precedence over
/// [`standard_expiry`]. Deliberately narrow pattern matches over the known
/// rule tags, not a general rule interpreter. `None` when no branch fires.
pub fn special_rule_expiry<H: AuthorshipHeuristics>(
  work: &Work,
  jurisdiction: &Jurisdiction,
  rules: &[CopyrightRule],
  heuristics: &H,
) -> Option<NaiveDate> {
  if rules.is_empty() {
    return None;
  }

  match jurisdiction.code.as_deref() {
    Some("US") => us_special_rules(work, rules, heuristics),
    Some("EU") => eu_special_rules(work, rules),
    Some("GB") => gb_special_rules(work, rules, heuristics),
    _ => None,
  }
}

fn us_special_rules<H: AuthorshipHeuristics>(
  work: &Work,
  rules: &[CopyrightRule],
  heuristics: &H,
) -> Option<NaiveDate> {
  // Works published before 1923 are already in the US public domain; the
  // fixed past date signals immediate expiry.
  if let Some(creation) = work.creation_date {
    if creation.year() < 1923 && find_rule(rules, "published_before_1923").is_some() {
      info!(work = %work.title, "US public domain (published before 1923)");
      return NaiveDate::from_ymd_opt(1923, 1, 1);
    }

    if (1923..=1977).contains(&creation.year()) {
      if let Some(rule) = find_rule(rules, "published_1923_to_1977") {
        let expiry = end_of_year(creation.year() + rule.term_years);
        info!(work = %work.title, %expiry, "US expiry (published 1923-1977)");
        return Some(expiry);
      }
    }
  }

  // Works made for hire, single corporate author.
  if work.authors.len() == 1 && heuristics.is_corporate_author(&work.authors[0]) {
    if let (Some(rule), Some(creation)) =
      (find_rule(rules, "corporate_works"), work.creation_date)
    {
      let expiry = end_of_year(creation.year() + rule.term_years);
      info!(work = %work.title, %expiry, "US expiry (corporate work)");
      return Some(expiry);
    }
  }

  None
}

fn eu_special_rules(work: &Work, rules: &[CopyrightRule]) -> Option<NaiveDate> {
  // Anonymous works: term runs from publication/creation, not a life.
  if work.authors.is_empty() {
    if let (Some(rule), Some(creation)) =
      (find_rule(rules, "anonymous_works"), work.creation_date)
    {
      let expiry = end_of_year(creation.year() + rule.term_years);
      info!(work = %work.title, %expiry, "EU expiry (anonymous work)");
      return Some(expiry);
    }
  }

  // Jointly authored works: strict — every author's death date must be
  // known, unlike the standard rule's latest-known policy. A single missing
  // date voids the branch.
  if work.authors.len() > 1 {
    if let Some(rule) = find_rule(rules, "collaborative_works") {
      let (latest_death, all_known) = work.latest_author_death();
      if let (Some(death), true) = (latest_death, all_known) {
        let expiry = end_of_year(death.year() + rule.term_years);
        info!(work = %work.title, %expiry, "EU expiry (collaborative work)");
        return Some(expiry);
      }
    }
  }

  None
}

fn gb_special_rules<H: AuthorshipHeuristics>(
  work: &Work,
  rules: &[CopyrightRule],
  heuristics: &H,
) -> Option<NaiveDate> {
  let crown = work.authors.iter().any(|a| heuristics.is_crown_author(a));
  if crown {
    if let (Some(rule), Some(creation)) =
      (find_rule(rules, "crown_copyright"), work.creation_date)
    {
      let expiry = end_of_year(creation.year() + rule.term_years);
      info!(work = %work.title, %expiry, "UK expiry (Crown copyright)");
      return Some(expiry);
    }
  }

  None
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Map an expiry estimate (or its absence) to the tri-state status.
///
/// With an expiry: `PublicDomain` once it has passed, else `Copyrighted`.
/// Without one: the hard historical cutoffs — pre-1875 anywhere, pre-1927 in
/// the US — before giving up with `Unknown`.
pub fn classify(
  expiry: Option<NaiveDate>,
  work: &Work,
  jurisdiction: Option<&Jurisdiction>,
  today: NaiveDate,
) -> CopyrightStatus {
  if let Some(expiry) = expiry {
    return if expiry <= today {
      CopyrightStatus::PublicDomain
    } else {
      CopyrightStatus::Copyrighted
    };
  }

  if let Some(creation) = work.creation_date {
    if creation.year() < GENERAL_PUBLIC_DOMAIN_CUTOFF {
      return CopyrightStatus::PublicDomain;
    }
    if jurisdiction.is_some_and(|j| j.has_code("US"))
      && creation.year() < US_PUBLIC_DOMAIN_CUTOFF
    {
      return CopyrightStatus::PublicDomain;
    }
  }

  debug!(work = %work.title, "status could not be determined");
  CopyrightStatus::Unknown
}
