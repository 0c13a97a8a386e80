//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339 strings,
//! and the closed enums (status, base date type) as their canonical string
//! forms.

use chrono::{DateTime, NaiveDate, Utc};
use lapse_core::{
  jurisdiction::{BaseDateType, CopyrightRule, Jurisdiction},
  status::CopyrightStatus,
  work::{Author, Topic, Work},
};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
  s.map(decode_date).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Closed enums ────────────────────────────────────────────────────────────

pub fn encode_status(status: CopyrightStatus) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<CopyrightStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown copyright status: {s:?}")))
}

pub fn encode_base_date_type(b: BaseDateType) -> String { b.to_string() }

pub fn decode_base_date_type(s: &str) -> Result<BaseDateType> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown base date type: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `jurisdictions` row.
pub struct RawJurisdiction {
  pub id:                     i64,
  pub name:                   String,
  pub code:                   Option<String>,
  pub term_years_after_death: i32,
  pub has_special_rules:      bool,
}

impl RawJurisdiction {
  pub fn into_jurisdiction(self) -> Jurisdiction {
    Jurisdiction {
      id:                     Some(self.id),
      name:                   self.name,
      code:                   self.code,
      term_years_after_death: self.term_years_after_death,
      has_special_rules:      self.has_special_rules,
    }
  }
}

/// Raw values read directly from a `copyright_rules` row.
pub struct RawRule {
  pub id:              i64,
  pub jurisdiction_id: i64,
  pub rule_type:       String,
  pub term_years:      i32,
  pub base_date_type:  String,
  pub description:     String,
}

impl RawRule {
  pub fn into_rule(self) -> Result<CopyrightRule> {
    Ok(CopyrightRule {
      id:              Some(self.id),
      jurisdiction_id: self.jurisdiction_id,
      rule_type:       self.rule_type,
      term_years:      self.term_years,
      base_date_type:  decode_base_date_type(&self.base_date_type)?,
      description:     self.description,
    })
  }
}

/// Raw values read directly from an `authors` row.
pub struct RawAuthor {
  pub id:          i64,
  pub name:        String,
  pub birth_date:  Option<String>,
  pub death_date:  Option<String>,
  pub nationality: Option<String>,
  pub bio:         Option<String>,
}

impl RawAuthor {
  pub fn into_author(self) -> Result<Author> {
    Ok(Author {
      id:          Some(self.id),
      name:        self.name,
      birth_date:  decode_date_opt(self.birth_date.as_deref())?,
      death_date:  decode_date_opt(self.death_date.as_deref())?,
      nationality: self.nationality,
      bio:         self.bio,
    })
  }
}

/// Raw values read from a `works` row joined with its topic and primary
/// jurisdiction.
pub struct RawWork {
  pub id:                     i64,
  pub title:                  String,
  pub creation_date:          Option<String>,
  pub first_publication_date: Option<String>,
  pub source_url:             Option<String>,
  pub scraped_at:             String,
  pub copyright_expiry_date:  Option<String>,
  pub status:                 String,
  pub is_collaborative:       bool,
  pub original_language:      Option<String>,
  pub original_publisher:     Option<String>,
  pub description:            Option<String>,
  // topics join
  pub topic_id:               Option<i64>,
  pub topic_name:             Option<String>,
  // jurisdictions join
  pub jurisdiction:           Option<RawJurisdiction>,
}

impl RawWork {
  /// Assemble the in-memory `Work`. The per-jurisdiction status map is
  /// loaded separately and left empty here, so status queries over listed
  /// works recompute rather than trust stale rows.
  pub fn into_work(self, authors: Vec<Author>) -> Result<Work> {
    let topic = match (self.topic_id, self.topic_name) {
      (Some(id), Some(name)) => Some(Topic { id: Some(id), name }),
      _ => None,
    };

    let mut work = Work::new(self.title);
    work.id = Some(self.id);
    work.authors = authors;
    work.topic = topic;
    work.creation_date = decode_date_opt(self.creation_date.as_deref())?;
    work.first_publication_date =
      decode_date_opt(self.first_publication_date.as_deref())?;
    work.source_url = self.source_url;
    work.scraped_at = decode_dt(&self.scraped_at)?;
    work.copyright_expiry_date =
      decode_date_opt(self.copyright_expiry_date.as_deref())?;
    work.primary_jurisdiction =
      self.jurisdiction.map(RawJurisdiction::into_jurisdiction);
    work.status = decode_status(&self.status)?;
    work.is_collaborative = self.is_collaborative;
    work.original_language = self.original_language;
    work.original_publisher = self.original_publisher;
    work.description = self.description;
    work.sync_publication_dates();
    Ok(work)
  }
}
