//! [`SqliteStore`] — the SQLite implementation of [`CopyrightStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::info;

use chrono::NaiveDate;
use lapse_core::{
  jurisdiction::{BaseDateType, CopyrightRule, Jurisdiction},
  status::{CopyrightStatus, JurisdictionStatus},
  store::CopyrightStore,
  work::{Author, Work},
};

use crate::{
  encode::{
    decode_date_opt, decode_status, encode_base_date_type, encode_date,
    encode_dt, encode_status, RawAuthor, RawJurisdiction, RawRule, RawWork,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Row mapping ─────────────────────────────────────────────────────────────

const WORK_SELECT: &str = "
  SELECT
    w.id, w.title, w.creation_date, w.first_publication_date, w.source_url,
    w.scraped_at, w.copyright_expiry_date, w.status, w.is_collaborative,
    w.original_language, w.original_publisher, w.description,
    t.id, t.name,
    j.id, j.name, j.code, j.term_years_after_death, j.has_special_rules
  FROM works w
  LEFT JOIN topics        t ON t.id = w.topic_id
  LEFT JOIN jurisdictions j ON j.id = w.primary_jurisdiction_id";

fn raw_jurisdiction_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawJurisdiction> {
  Ok(RawJurisdiction {
    id:                     row.get(0)?,
    name:                   row.get(1)?,
    code:                   row.get(2)?,
    term_years_after_death: row.get(3)?,
    has_special_rules:      row.get(4)?,
  })
}

fn raw_author_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAuthor> {
  Ok(RawAuthor {
    id:          row.get(0)?,
    name:        row.get(1)?,
    birth_date:  row.get(2)?,
    death_date:  row.get(3)?,
    nationality: row.get(4)?,
    bio:         row.get(5)?,
  })
}

fn raw_work_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawWork> {
  let jurisdiction = match row.get::<_, Option<i64>>(14)? {
    Some(id) => Some(RawJurisdiction {
      id,
      name:                   row.get(15)?,
      code:                   row.get(16)?,
      term_years_after_death: row.get(17)?,
      has_special_rules:      row.get(18)?,
    }),
    None => None,
  };

  Ok(RawWork {
    id:                     row.get(0)?,
    title:                  row.get(1)?,
    creation_date:          row.get(2)?,
    first_publication_date: row.get(3)?,
    source_url:             row.get(4)?,
    scraped_at:             row.get(5)?,
    copyright_expiry_date:  row.get(6)?,
    status:                 row.get(7)?,
    is_collaborative:       row.get(8)?,
    original_language:      row.get(9)?,
    original_publisher:     row.get(10)?,
    description:            row.get(11)?,
    topic_id:               row.get(12)?,
    topic_name:             row.get(13)?,
    jurisdiction,
  })
}

/// Authors of one work, in their recorded order.
fn load_authors(
  conn: &rusqlite::Connection,
  work_id: i64,
) -> rusqlite::Result<Vec<RawAuthor>> {
  let mut stmt = conn.prepare(
    "SELECT a.id, a.name, a.birth_date, a.death_date, a.nationality, a.bio
     FROM authors a
     JOIN work_authors wa ON wa.author_id = a.id
     WHERE wa.work_id = ?1
     ORDER BY wa.position",
  )?;
  stmt
    .query_map(rusqlite::params![work_id], raw_author_from_row)?
    .collect()
}

/// Insert an author or additively update the existing row of the same name:
/// only NULL columns are filled, existing data is never overwritten.
fn upsert_author(
  conn: &rusqlite::Connection,
  author: &Author,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO authors (name, birth_date, death_date, nationality, bio)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (name) DO UPDATE SET
       birth_date  = COALESCE(authors.birth_date,  excluded.birth_date),
       death_date  = COALESCE(authors.death_date,  excluded.death_date),
       nationality = COALESCE(authors.nationality, excluded.nationality),
       bio         = COALESCE(authors.bio,         excluded.bio)",
    rusqlite::params![
      author.name,
      author.birth_date.map(encode_date),
      author.death_date.map(encode_date),
      author.nationality,
      author.bio,
    ],
  )?;
  conn.query_row(
    "SELECT id FROM authors WHERE name = ?1",
    rusqlite::params![author.name],
    |row| row.get(0),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lapse copyright store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Jurisdiction catalog ──────────────────────────────────────────────────

  /// Insert or update a jurisdiction, keyed by `code` when present, else by
  /// `name`. Returns the persisted record with its id set.
  pub async fn upsert_jurisdiction(
    &self,
    jurisdiction: &Jurisdiction,
  ) -> Result<Jurisdiction> {
    let j = jurisdiction.clone();
    let id = self
      .conn
      .call(move |conn| {
        let existing: Option<i64> = match j.code.as_deref() {
          Some(code) => conn
            .query_row(
              "SELECT id FROM jurisdictions WHERE code = ?1",
              rusqlite::params![code],
              |row| row.get(0),
            )
            .optional()?,
          None => conn
            .query_row(
              "SELECT id FROM jurisdictions WHERE name = ?1",
              rusqlite::params![j.name],
              |row| row.get(0),
            )
            .optional()?,
        };

        match existing {
          Some(id) => {
            conn.execute(
              "UPDATE jurisdictions SET
                 name = ?2, code = ?3,
                 term_years_after_death = ?4, has_special_rules = ?5
               WHERE id = ?1",
              rusqlite::params![
                id,
                j.name,
                j.code,
                j.term_years_after_death,
                j.has_special_rules,
              ],
            )?;
            Ok(id)
          }
          None => {
            conn.execute(
              "INSERT INTO jurisdictions
                 (name, code, term_years_after_death, has_special_rules)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![
                j.name,
                j.code,
                j.term_years_after_death,
                j.has_special_rules,
              ],
            )?;
            Ok(conn.last_insert_rowid())
          }
        }
      })
      .await?;

    let mut saved = jurisdiction.clone();
    saved.id = Some(id);
    Ok(saved)
  }

  /// Insert or update a special rule; upsert keyed by
  /// `(jurisdiction_id, rule_type)`.
  pub async fn upsert_rule(
    &self,
    rule: &CopyrightRule,
  ) -> Result<CopyrightRule> {
    let r = rule.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO copyright_rules
             (jurisdiction_id, rule_type, term_years, base_date_type, description)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (jurisdiction_id, rule_type) DO UPDATE SET
             term_years     = excluded.term_years,
             base_date_type = excluded.base_date_type,
             description    = excluded.description",
          rusqlite::params![
            r.jurisdiction_id,
            r.rule_type,
            r.term_years,
            encode_base_date_type(r.base_date_type),
            r.description,
          ],
        )?;
        let id = conn.query_row(
          "SELECT id FROM copyright_rules
           WHERE jurisdiction_id = ?1 AND rule_type = ?2",
          rusqlite::params![r.jurisdiction_id, r.rule_type],
          |row| row.get(0),
        )?;
        Ok(id)
      })
      .await?;

    let mut saved = rule.clone();
    saved.id = Some(id);
    Ok(saved)
  }

  pub async fn jurisdiction_by_code(
    &self,
    code: &str,
  ) -> Result<Option<Jurisdiction>> {
    let code = code.to_owned();
    let raw: Option<RawJurisdiction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, code, term_years_after_death, has_special_rules
               FROM jurisdictions WHERE code = ?1",
              rusqlite::params![code],
              raw_jurisdiction_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(RawJurisdiction::into_jurisdiction))
  }

  /// Seed the default jurisdiction catalog and its special rules. Idempotent
  /// thanks to the upsert semantics.
  pub async fn seed_default_jurisdictions(&self) -> Result<()> {
    type SeedRule = (&'static str, i32, BaseDateType, &'static str);
    let catalog: [(&str, &str, i32, &[SeedRule]); 6] = [
      ("United States", "US", 70, &[
        (
          "published_before_1923",
          0,
          BaseDateType::FixedYear,
          "Works published before 1923 are in the public domain",
        ),
        (
          "published_1923_to_1977",
          95,
          BaseDateType::Publication,
          "Works published 1923-1977 with copyright notice: 95 years from publication",
        ),
        (
          "corporate_works",
          95,
          BaseDateType::Publication,
          "Works made for hire: 95 years from publication",
        ),
      ]),
      ("European Union", "EU", 70, &[
        (
          "anonymous_works",
          70,
          BaseDateType::Publication,
          "Anonymous or pseudonymous works: 70 years after publication",
        ),
        (
          "collaborative_works",
          70,
          BaseDateType::AuthorDeath,
          "Jointly authored works: 70 years after death of the last surviving author",
        ),
      ]),
      // Pre-2023 term; the 2022 Canadian extension to 70 is not modeled.
      ("Canada", "CA", 50, &[]),
      ("United Kingdom", "GB", 70, &[(
        "crown_copyright",
        50,
        BaseDateType::Publication,
        "Crown copyright: 50 years from publication",
      )]),
      ("Japan", "JP", 70, &[]),
      ("Mexico", "MX", 100, &[]),
    ];

    for (name, code, term_years, rules) in catalog {
      let mut jurisdiction = Jurisdiction::new(name).with_code(code);
      jurisdiction.term_years_after_death = term_years;
      jurisdiction.has_special_rules = !rules.is_empty();

      let saved = self.upsert_jurisdiction(&jurisdiction).await?;
      if let Some(jurisdiction_id) = saved.id {
        for (rule_type, term_years, base_date_type, description) in rules {
          let mut rule =
            CopyrightRule::new(jurisdiction_id, *rule_type, *term_years);
          rule.base_date_type = *base_date_type;
          rule.description = (*description).to_owned();
          self.upsert_rule(&rule).await?;
        }
      }
    }

    info!("default jurisdiction catalog initialised");
    Ok(())
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  pub async fn add_topic(
    &self,
    name: &str,
  ) -> Result<lapse_core::work::Topic> {
    let name = name.to_owned();
    let (id, name) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO topics (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        let id = conn.query_row(
          "SELECT id FROM topics WHERE name = ?1",
          rusqlite::params![name],
          |row| row.get(0),
        )?;
        Ok((id, name))
      })
      .await?;
    Ok(lapse_core::work::Topic { id: Some(id), name })
  }

  // ── Authors ───────────────────────────────────────────────────────────────

  /// Persist an author, merging additively into any existing row of the same
  /// name (fill only nulls). Returns the merged record.
  pub async fn get_or_save_author(&self, author: &Author) -> Result<Author> {
    let a = author.clone();
    let raw = self
      .conn
      .call(move |conn| {
        let id = upsert_author(conn, &a)?;
        let raw = conn.query_row(
          "SELECT id, name, birth_date, death_date, nationality, bio
           FROM authors WHERE id = ?1",
          rusqlite::params![id],
          raw_author_from_row,
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_author()
  }

  // ── Works ─────────────────────────────────────────────────────────────────

  /// Persist a work, upserting by title. Optional columns update with
  /// `COALESCE(new, old)` — a null in the incoming record never erases
  /// stored data. Author links are rewritten in order; any in-memory status
  /// map is flushed (the aggregator writes per-jurisdiction expiry dates
  /// separately). Sets the ids on `work` and its authors.
  pub async fn save_work(&self, work: &mut Work) -> Result<()> {
    work.sync_publication_dates();
    work.is_collaborative = work.authors.len() > 1;

    let w = work.clone();
    let (work_id, author_ids) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let topic_id: Option<i64> = match &w.topic {
          Some(topic) => match topic.id {
            Some(id) => Some(id),
            None => {
              tx.execute(
                "INSERT OR IGNORE INTO topics (name) VALUES (?1)",
                rusqlite::params![topic.name],
              )?;
              Some(tx.query_row(
                "SELECT id FROM topics WHERE name = ?1",
                rusqlite::params![topic.name],
                |row| row.get(0),
              )?)
            }
          },
          None => None,
        };

        // Resolve the weak primary-jurisdiction reference: a known-valid id,
        // else the catalog row matching the code, else the name.
        let primary_jurisdiction_id: Option<i64> =
          match &w.primary_jurisdiction {
            Some(j) => {
              let by_id: Option<i64> = match j.id {
                Some(id) => tx
                  .query_row(
                    "SELECT id FROM jurisdictions WHERE id = ?1",
                    rusqlite::params![id],
                    |row| row.get(0),
                  )
                  .optional()?,
                None => None,
              };
              match (by_id, j.code.as_deref()) {
                (Some(id), _) => Some(id),
                (None, Some(code)) => tx
                  .query_row(
                    "SELECT id FROM jurisdictions WHERE code = ?1",
                    rusqlite::params![code],
                    |row| row.get(0),
                  )
                  .optional()?,
                (None, None) => tx
                  .query_row(
                    "SELECT id FROM jurisdictions WHERE name = ?1",
                    rusqlite::params![j.name],
                    |row| row.get(0),
                  )
                  .optional()?,
              }
            }
            None => None,
          };

        let creation = w.creation_date.map(encode_date);
        let first_publication = w.first_publication_date.map(encode_date);
        let expiry = w.copyright_expiry_date.map(encode_date);
        let scraped_at = encode_dt(w.scraped_at);
        let status = encode_status(w.status);

        let existing: Option<i64> = tx
          .query_row(
            "SELECT id FROM works WHERE title = ?1",
            rusqlite::params![w.title],
            |row| row.get(0),
          )
          .optional()?;

        let work_id = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE works SET
                 topic_id                = COALESCE(?2, topic_id),
                 creation_date           = COALESCE(?3, creation_date),
                 first_publication_date  = COALESCE(?4, first_publication_date),
                 source_url              = COALESCE(?5, source_url),
                 copyright_expiry_date   = COALESCE(?6, copyright_expiry_date),
                 primary_jurisdiction_id = COALESCE(?7, primary_jurisdiction_id),
                 status                  = ?8,
                 is_collaborative        = ?9,
                 original_language       = COALESCE(?10, original_language),
                 original_publisher      = COALESCE(?11, original_publisher),
                 description             = COALESCE(?12, description)
               WHERE id = ?1",
              rusqlite::params![
                id,
                topic_id,
                creation,
                first_publication,
                w.source_url,
                expiry,
                primary_jurisdiction_id,
                status,
                w.is_collaborative,
                w.original_language,
                w.original_publisher,
                w.description,
              ],
            )?;
            id
          }
          None => {
            tx.execute(
              "INSERT INTO works
                 (title, topic_id, creation_date, first_publication_date,
                  source_url, scraped_at, copyright_expiry_date,
                  primary_jurisdiction_id, status, is_collaborative,
                  original_language, original_publisher, description)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
              rusqlite::params![
                w.title,
                topic_id,
                creation,
                first_publication,
                w.source_url,
                scraped_at,
                expiry,
                primary_jurisdiction_id,
                status,
                w.is_collaborative,
                w.original_language,
                w.original_publisher,
                w.description,
              ],
            )?;
            tx.last_insert_rowid()
          }
        };

        tx.execute(
          "DELETE FROM work_authors WHERE work_id = ?1",
          rusqlite::params![work_id],
        )?;
        let mut author_ids = Vec::with_capacity(w.authors.len());
        for (position, author) in w.authors.iter().enumerate() {
          let author_id = upsert_author(&tx, author)?;
          tx.execute(
            "INSERT INTO work_authors (work_id, author_id, position)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![work_id, author_id, position as i64],
          )?;
          author_ids.push(author_id);
        }

        for (code, status) in &w.status_by_jurisdiction {
          let jurisdiction_id: Option<i64> = tx
            .query_row(
              "SELECT id FROM jurisdictions WHERE code = ?1",
              rusqlite::params![code],
              |row| row.get(0),
            )
            .optional()?;
          if let Some(jurisdiction_id) = jurisdiction_id {
            tx.execute(
              "INSERT INTO work_jurisdiction_status
                 (work_id, jurisdiction_id, status, expiry_date)
               VALUES (?1, ?2, ?3, NULL)
               ON CONFLICT (work_id, jurisdiction_id)
               DO UPDATE SET status = excluded.status",
              rusqlite::params![
                work_id,
                jurisdiction_id,
                encode_status(*status),
              ],
            )?;
          }
        }

        tx.commit()?;
        Ok((work_id, author_ids))
      })
      .await?;

    work.id = Some(work_id);
    for (author, id) in work.authors.iter_mut().zip(author_ids) {
      author.id = Some(id);
    }
    Ok(())
  }

  pub async fn get_work_by_id(&self, id: i64) -> Result<Option<Work>> {
    let loaded: Option<(RawWork, Vec<RawAuthor>)> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("{WORK_SELECT} WHERE w.id = ?1"),
            rusqlite::params![id],
            raw_work_from_row,
          )
          .optional()?;
        match raw {
          Some(raw) => {
            let authors = load_authors(conn, raw.id)?;
            Ok(Some((raw, authors)))
          }
          None => Ok(None),
        }
      })
      .await?;

    loaded.map(decode_work).transpose()
  }

  pub async fn get_work_by_title(&self, title: &str) -> Result<Option<Work>> {
    let title = title.to_owned();
    let loaded: Option<(RawWork, Vec<RawAuthor>)> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("{WORK_SELECT} WHERE w.title = ?1"),
            rusqlite::params![title],
            raw_work_from_row,
          )
          .optional()?;
        match raw {
          Some(raw) => {
            let authors = load_authors(conn, raw.id)?;
            Ok(Some((raw, authors)))
          }
          None => Ok(None),
        }
      })
      .await?;

    loaded.map(decode_work).transpose()
  }
}

fn decode_work((raw, authors): (RawWork, Vec<RawAuthor>)) -> Result<Work> {
  let authors = authors
    .into_iter()
    .map(RawAuthor::into_author)
    .collect::<Result<Vec<_>>>()?;
  raw.into_work(authors)
}

// ─── CopyrightStore impl ─────────────────────────────────────────────────────

impl CopyrightStore for SqliteStore {
  type Error = Error;

  async fn list_jurisdictions(&self) -> Result<Vec<Jurisdiction>> {
    let raws: Vec<RawJurisdiction> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, code, term_years_after_death, has_special_rules
           FROM jurisdictions ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], raw_jurisdiction_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawJurisdiction::into_jurisdiction).collect())
  }

  async fn rules_for_jurisdiction(
    &self,
    jurisdiction_id: i64,
  ) -> Result<Vec<CopyrightRule>> {
    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, jurisdiction_id, rule_type, term_years,
                  base_date_type, description
           FROM copyright_rules WHERE jurisdiction_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![jurisdiction_id], |row| {
            Ok(RawRule {
              id:              row.get(0)?,
              jurisdiction_id: row.get(1)?,
              rule_type:       row.get(2)?,
              term_years:      row.get(3)?,
              base_date_type:  row.get(4)?,
              description:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRule::into_rule).collect()
  }

  async fn get_jurisdiction_status(
    &self,
    work_id: i64,
    jurisdiction_id: i64,
  ) -> Result<Option<JurisdictionStatus>> {
    let raw: Option<(String, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT status, expiry_date FROM work_jurisdiction_status
               WHERE work_id = ?1 AND jurisdiction_id = ?2",
              rusqlite::params![work_id, jurisdiction_id],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some((status, expiry)) => Ok(Some(JurisdictionStatus {
        status:      decode_status(&status)?,
        expiry_date: decode_date_opt(expiry.as_deref())?,
      })),
      None => Ok(None),
    }
  }

  async fn set_jurisdiction_status(
    &self,
    work_id: i64,
    jurisdiction_id: i64,
    status: CopyrightStatus,
    expiry_date: Option<NaiveDate>,
  ) -> Result<()> {
    let status = encode_status(status);
    let expiry = expiry_date.map(encode_date);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO work_jurisdiction_status
             (work_id, jurisdiction_id, status, expiry_date)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (work_id, jurisdiction_id) DO UPDATE SET
             status      = excluded.status,
             expiry_date = excluded.expiry_date",
          rusqlite::params![work_id, jurisdiction_id, status, expiry],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_works(&self) -> Result<Vec<Work>> {
    let loaded: Vec<(RawWork, Vec<RawAuthor>)> = self
      .conn
      .call(|conn| {
        let raws = {
          let mut stmt =
            conn.prepare(&format!("{WORK_SELECT} ORDER BY w.id"))?;
          let rows = stmt
            .query_map([], raw_work_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let mut out = Vec::with_capacity(raws.len());
        for raw in raws {
          let authors = load_authors(conn, raw.id)?;
          out.push((raw, authors));
        }
        Ok(out)
      })
      .await?;

    loaded.into_iter().map(decode_work).collect()
  }
}
