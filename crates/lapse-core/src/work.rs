//! Work, Author, and Topic — the records the rules engine operates on.
//!
//! Every optional domain field is an explicit `Option`; partial records are
//! the normal case, produced by ingestion and enrichment with whatever data
//! was available. In-memory values are transient views; persisted rows are
//! the durable source of truth.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{jurisdiction::Jurisdiction, status::CopyrightStatus};

/// A category of work (e.g. Books, Movies, Music).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub id:   Option<i64>,
  pub name: String,
}

impl std::fmt::Display for Topic {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.name)
  }
}

/// An author of a creative work. `name` is the identity used for
/// deduplication; an author may belong to many works.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
  pub id:          Option<i64>,
  pub name:        String,
  pub birth_date:  Option<NaiveDate>,
  pub death_date:  Option<NaiveDate>,
  /// Jurisdiction code, when known (e.g. `"US"`).
  pub nationality: Option<String>,
  pub bio:         Option<String>,
}

impl Author {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  /// Merge additively: fill only fields that are currently unset. Existing
  /// data is never overwritten by later, possibly-less-reliable data.
  pub fn merge_missing(&mut self, other: &Author) {
    if self.birth_date.is_none() {
      self.birth_date = other.birth_date;
    }
    if self.death_date.is_none() {
      self.death_date = other.death_date;
    }
    if self.nationality.is_none() {
      self.nationality = other.nationality.clone();
    }
    if self.bio.is_none() {
      self.bio = other.bio.clone();
    }
  }
}

impl std::fmt::Display for Author {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.name)?;
    if self.birth_date.is_some() || self.death_date.is_some() {
      let year = |d: Option<NaiveDate>| {
        d.map(|d| format!("{}", chrono::Datelike::year(&d)))
          .unwrap_or_else(|| "?".into())
      };
      write!(f, " ({}-{})", year(self.birth_date), year(self.death_date))?;
    }
    Ok(())
  }
}

/// A creative work and its computed copyright state.
///
/// The scheduler is the sole mutator of `copyright_expiry_date`, `status`,
/// `status_by_jurisdiction`, and (conditionally) `primary_jurisdiction`.
/// `status_by_jurisdiction` is keyed by jurisdiction *code*, not id — that
/// map is the contract other components read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
  pub id:                     Option<i64>,
  pub title:                  String,
  /// Ordered; iteration order matters for the primary-jurisdiction
  /// tie-break.
  pub authors:                Vec<Author>,
  pub topic:                  Option<Topic>,
  pub creation_date:          Option<NaiveDate>,
  /// Alias of `first_publication_date`; see
  /// [`sync_publication_dates`](Self::sync_publication_dates).
  pub publication_date:       Option<NaiveDate>,
  pub first_publication_date: Option<NaiveDate>,
  pub source_url:             Option<String>,
  pub scraped_at:             DateTime<Utc>,
  /// Global (default-jurisdiction) expiry estimate.
  pub copyright_expiry_date:  Option<NaiveDate>,
  /// Weak reference: carried for lookups, never exclusively owned.
  pub primary_jurisdiction:   Option<Jurisdiction>,
  pub status:                 CopyrightStatus,
  pub status_by_jurisdiction: BTreeMap<String, CopyrightStatus>,
  pub is_collaborative:       bool,
  pub original_language:      Option<String>,
  pub original_publisher:     Option<String>,
  pub description:            Option<String>,
}

impl Work {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      id:                     None,
      title:                  title.into(),
      authors:                Vec::new(),
      topic:                  None,
      creation_date:          None,
      publication_date:       None,
      first_publication_date: None,
      source_url:             None,
      scraped_at:             Utc::now(),
      copyright_expiry_date:  None,
      primary_jurisdiction:   None,
      status:                 CopyrightStatus::Unknown,
      status_by_jurisdiction: BTreeMap::new(),
      is_collaborative:       false,
      original_language:      None,
      original_publisher:     None,
      description:            None,
    }
  }

  /// Population-fill `publication_date` and `first_publication_date` from
  /// each other when exactly one is set. Runs once at record construction or
  /// load; the fields are *not* re-synchronized on later mutation.
  pub fn sync_publication_dates(&mut self) {
    match (self.publication_date, self.first_publication_date) {
      (Some(d), None) => self.first_publication_date = Some(d),
      (None, Some(d)) => self.publication_date = Some(d),
      _ => {}
    }
  }

  /// The latest death date among authors that have one, plus whether every
  /// author has one. The second component is what distinguishes the lenient
  /// standard rule from the strict EU collaborative rule.
  pub fn latest_author_death(&self) -> (Option<NaiveDate>, bool) {
    let mut latest = None;
    let mut all_known = true;
    for author in &self.authors {
      match author.death_date {
        Some(d) => {
          if latest.is_none_or(|l| d > l) {
            latest = Some(d);
          }
        }
        None => all_known = false,
      }
    }
    (latest, all_known)
  }
}

impl std::fmt::Display for Work {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let authors = if self.authors.is_empty() {
      "Unknown Author".to_string()
    } else {
      self
        .authors
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
    };
    write!(f, "'{}' by {} [{}]", self.title, authors, self.status)
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn sync_fills_only_the_missing_side() {
    let mut work = Work::new("A");
    work.publication_date = Some(d(1950, 1, 1));
    work.sync_publication_dates();
    assert_eq!(work.first_publication_date, Some(d(1950, 1, 1)));

    let mut work = Work::new("B");
    work.first_publication_date = Some(d(1960, 6, 1));
    work.sync_publication_dates();
    assert_eq!(work.publication_date, Some(d(1960, 6, 1)));
  }

  #[test]
  fn sync_does_not_overwrite_when_both_set() {
    let mut work = Work::new("C");
    work.publication_date = Some(d(1950, 1, 1));
    work.first_publication_date = Some(d(1951, 1, 1));
    work.sync_publication_dates();
    assert_eq!(work.publication_date, Some(d(1950, 1, 1)));
    assert_eq!(work.first_publication_date, Some(d(1951, 1, 1)));
  }

  #[test]
  fn merge_missing_never_overwrites() {
    let mut a = Author::new("Bram Stoker");
    a.death_date = Some(d(1912, 4, 20));

    let mut update = Author::new("Bram Stoker");
    update.death_date = Some(d(1999, 1, 1));
    update.birth_date = Some(d(1847, 11, 8));
    update.nationality = Some("GB".into());

    a.merge_missing(&update);
    assert_eq!(a.death_date, Some(d(1912, 4, 20)));
    assert_eq!(a.birth_date, Some(d(1847, 11, 8)));
    assert_eq!(a.nationality.as_deref(), Some("GB"));
  }

  #[test]
  fn latest_author_death_tracks_unknowns() {
    let mut work = Work::new("Joint");
    let mut a = Author::new("A");
    a.death_date = Some(d(1950, 3, 1));
    let b = Author::new("B");
    work.authors = vec![a, b];

    let (latest, all_known) = work.latest_author_death();
    assert_eq!(latest, Some(d(1950, 3, 1)));
    assert!(!all_known);
  }
}
