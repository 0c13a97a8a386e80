//! Integration tests for `SqliteStore` against an in-memory database, plus
//! end-to-end scheduler runs over the seeded default catalog.

use chrono::NaiveDate;
use lapse_core::{
  clock::Clock,
  jurisdiction::{BaseDateType, CopyrightRule, Jurisdiction},
  status::CopyrightStatus,
  store::CopyrightStore,
  work::{Author, Work},
  Scheduler,
};

use crate::SqliteStore;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn seeded() -> SqliteStore {
  let s = store().await;
  s.seed_default_jurisdictions().await.unwrap();
  s
}

fn scheduler(s: &SqliteStore) -> Scheduler<SqliteStore> {
  Scheduler::new(s.clone(), Clock::fixed(d(2025, 4, 30)))
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn seed_is_idempotent_and_ordered() {
  let s = seeded().await;
  s.seed_default_jurisdictions().await.unwrap();

  let all = s.list_jurisdictions().await.unwrap();
  assert_eq!(all.len(), 6);

  let codes: Vec<_> =
    all.iter().filter_map(|j| j.code.as_deref()).collect();
  assert_eq!(codes, ["US", "EU", "CA", "GB", "JP", "MX"]);

  let mx = all.last().unwrap();
  assert_eq!(mx.term_years_after_death, 100);
  assert!(!mx.has_special_rules);
}

#[tokio::test]
async fn upsert_jurisdiction_updates_by_code() {
  let s = store().await;

  let mut j = Jurisdiction::new("United States").with_code("US");
  let saved = s.upsert_jurisdiction(&j).await.unwrap();
  let id = saved.id.unwrap();

  j.term_years_after_death = 95;
  let again = s.upsert_jurisdiction(&j).await.unwrap();
  assert_eq!(again.id, Some(id));

  let fetched = s.jurisdiction_by_code("US").await.unwrap().unwrap();
  assert_eq!(fetched.term_years_after_death, 95);
}

#[tokio::test]
async fn rule_upsert_replaces_term_and_base() {
  let s = store().await;
  let j = s
    .upsert_jurisdiction(&Jurisdiction::new("Testland").with_code("TL"))
    .await
    .unwrap();
  let jid = j.id.unwrap();

  let rule = CopyrightRule::new(jid, "anonymous_works", 50);
  let saved = s.upsert_rule(&rule).await.unwrap();

  let mut updated = rule.clone();
  updated.term_years = 70;
  updated.base_date_type = BaseDateType::AuthorDeath;
  let again = s.upsert_rule(&updated).await.unwrap();
  assert_eq!(again.id, saved.id);

  let rules = s.rules_for_jurisdiction(jid).await.unwrap();
  assert_eq!(rules.len(), 1);
  assert_eq!(rules[0].term_years, 70);
  assert_eq!(rules[0].base_date_type, BaseDateType::AuthorDeath);
}

// ─── Authors ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn author_upsert_fills_only_nulls() {
  let s = store().await;

  let mut stoker = Author::new("Bram Stoker");
  stoker.death_date = Some(d(1912, 4, 20));
  let first = s.get_or_save_author(&stoker).await.unwrap();

  let mut update = Author::new("Bram Stoker");
  update.death_date = Some(d(1999, 1, 1));
  update.birth_date = Some(d(1847, 11, 8));
  update.nationality = Some("GB".into());
  let merged = s.get_or_save_author(&update).await.unwrap();

  assert_eq!(merged.id, first.id);
  assert_eq!(merged.death_date, Some(d(1912, 4, 20)));
  assert_eq!(merged.birth_date, Some(d(1847, 11, 8)));
  assert_eq!(merged.nationality.as_deref(), Some("GB"));
}

// ─── Works ───────────────────────────────────────────────────────────────────

fn dracula() -> Work {
  let mut stoker = Author::new("Bram Stoker");
  stoker.death_date = Some(d(1912, 4, 20));
  stoker.nationality = Some("GB".into());

  let mut work = Work::new("Dracula");
  work.authors = vec![stoker];
  work.creation_date = Some(d(1897, 5, 26));
  work.first_publication_date = Some(d(1897, 5, 26));
  work
}

#[tokio::test]
async fn save_work_roundtrip_preserves_authors_in_order() {
  let s = seeded().await;

  let mut work = Work::new("Joint Novel");
  work.authors = vec![Author::new("Second Billing"), Author::new("A First")];
  s.save_work(&mut work).await.unwrap();
  assert!(work.id.is_some());

  let loaded = s.get_work_by_title("Joint Novel").await.unwrap().unwrap();
  let names: Vec<_> =
    loaded.authors.iter().map(|a| a.name.as_str()).collect();
  assert_eq!(names, ["Second Billing", "A First"]);
  assert!(loaded.is_collaborative);
}

#[tokio::test]
async fn save_work_upsert_never_erases_with_null() {
  let s = seeded().await;

  let mut work = Work::new("Dracula");
  work.first_publication_date = Some(d(1897, 5, 26));
  s.save_work(&mut work).await.unwrap();
  let id = work.id.unwrap();

  // A later, sparser record for the same title.
  let mut sparse = Work::new("Dracula");
  sparse.description = Some("Epistolary gothic novel".into());
  s.save_work(&mut sparse).await.unwrap();
  assert_eq!(sparse.id, Some(id));

  let loaded = s.get_work_by_id(id).await.unwrap().unwrap();
  assert_eq!(loaded.first_publication_date, Some(d(1897, 5, 26)));
  assert_eq!(loaded.description.as_deref(), Some("Epistolary gothic novel"));
}

#[tokio::test]
async fn get_work_missing_returns_none() {
  let s = store().await;
  assert!(s.get_work_by_id(42).await.unwrap().is_none());
  assert!(s.get_work_by_title("Nothing").await.unwrap().is_none());
}

// ─── Scheduler end to end ────────────────────────────────────────────────────

#[tokio::test]
async fn dracula_is_public_domain_everywhere() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = dracula();
  s.save_work(&mut work).await.unwrap();
  sched.update_work_status(&mut work).await.unwrap();

  // Standard term, latest death 1912 + 70, end of year.
  assert_eq!(work.copyright_expiry_date, Some(d(1982, 12, 31)));
  assert_eq!(work.status, CopyrightStatus::PublicDomain);

  assert_eq!(work.status_by_jurisdiction.len(), 6);
  assert!(work
    .status_by_jurisdiction
    .values()
    .all(|&s| s == CopyrightStatus::PublicDomain));

  // Author nationality resolves the primary jurisdiction.
  let primary = work.primary_jurisdiction.as_ref().unwrap();
  assert_eq!(primary.code.as_deref(), Some("GB"));
}

#[tokio::test]
async fn update_work_status_persists_per_jurisdiction_rows() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = dracula();
  s.save_work(&mut work).await.unwrap();
  sched.update_work_status(&mut work).await.unwrap();

  let us = s.jurisdiction_by_code("US").await.unwrap().unwrap();
  let row = s
    .get_jurisdiction_status(work.id.unwrap(), us.id.unwrap())
    .await
    .unwrap()
    .unwrap();

  // Pre-1923 US publication: the fixed-year rule pins expiry at 1923-01-01.
  assert_eq!(row.status, CopyrightStatus::PublicDomain);
  assert_eq!(row.expiry_date, Some(d(1923, 1, 1)));
}

#[tokio::test]
async fn us_publication_window_rule_beats_standard_term() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut author = Author::new("Mid Century");
  author.death_date = Some(d(1960, 1, 1));
  let mut work = Work::new("Notice Given");
  work.authors = vec![author];
  work.creation_date = Some(d(1930, 6, 1));
  work.first_publication_date = Some(d(1930, 6, 1));

  let us = s.jurisdiction_by_code("US").await.unwrap().unwrap();
  let expiry = sched.calculate_expiry(&work, Some(&us)).await.unwrap();

  // 1930 + 95 from publication, not 1960 + 70 after death.
  assert_eq!(expiry, Some(d(2025, 12, 31)));

  let status =
    sched.determine_status(&work, Some(&us), None).await.unwrap();
  assert_eq!(status, CopyrightStatus::Copyrighted);
}

#[tokio::test]
async fn eu_anonymous_work_runs_from_publication() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = Work::new("By Nobody");
  work.creation_date = Some(d(1950, 3, 1));
  work.first_publication_date = Some(d(1950, 3, 1));

  let eu = s.jurisdiction_by_code("EU").await.unwrap().unwrap();
  let expiry = sched.calculate_expiry(&work, Some(&eu)).await.unwrap();
  assert_eq!(expiry, Some(d(2020, 12, 31)));

  let status =
    sched.determine_status(&work, Some(&eu), None).await.unwrap();
  assert_eq!(status, CopyrightStatus::PublicDomain);
}

#[tokio::test]
async fn eu_collaborative_rule_requires_every_death_date() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut known = Author::new("Known");
  known.death_date = Some(d(1940, 1, 1));
  let unknown = Author::new("Lost to History");

  let mut work = Work::new("Joint Effort");
  work.authors = vec![known, unknown];
  work.first_publication_date = Some(d(1935, 1, 1));

  let eu = s.jurisdiction_by_code("EU").await.unwrap().unwrap();
  let expiry = sched.calculate_expiry(&work, Some(&eu)).await.unwrap();

  // The strict collaborative rule declines; the lenient standard term over
  // the latest known death applies instead.
  assert_eq!(expiry, Some(d(2010, 12, 31)));
}

#[tokio::test]
async fn determine_status_trusts_known_global_status() {
  let s = seeded().await;
  let sched = scheduler(&s);

  // A fresh computation would say public domain...
  let mut work = dracula();
  let computed = sched.determine_status(&work, None, None).await.unwrap();
  assert_eq!(computed, CopyrightStatus::PublicDomain);

  // ...but a previously recorded non-Unknown status wins as-is.
  work.status = CopyrightStatus::Copyrighted;
  let cached = sched.determine_status(&work, None, None).await.unwrap();
  assert_eq!(cached, CopyrightStatus::Copyrighted);
}

#[tokio::test]
async fn determine_status_returns_cached_map_entry_without_recomputing() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = dracula();
  let us = s.jurisdiction_by_code("US").await.unwrap().unwrap();

  // Contradicts what the pre-1923 rule would compute.
  work
    .status_by_jurisdiction
    .insert("US".into(), CopyrightStatus::Copyrighted);

  let status =
    sched.determine_status(&work, Some(&us), None).await.unwrap();
  assert_eq!(status, CopyrightStatus::Copyrighted);

  // Other jurisdictions have no entry and still compute fresh.
  let eu = s.jurisdiction_by_code("EU").await.unwrap().unwrap();
  let status =
    sched.determine_status(&work, Some(&eu), None).await.unwrap();
  assert_eq!(status, CopyrightStatus::PublicDomain);
}

#[tokio::test]
async fn update_work_status_is_idempotent() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = dracula();
  s.save_work(&mut work).await.unwrap();
  sched.update_work_status(&mut work).await.unwrap();
  let first = work.clone();

  sched.update_work_status(&mut work).await.unwrap();
  assert_eq!(work, first);
}

#[tokio::test]
async fn days_until_expiry_is_none_for_public_domain() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut work = dracula();
  let days = sched.days_until_expiry(&mut work, None, None).await.unwrap();
  assert_eq!(days, None);
  // The global expiry gets cached on the way.
  assert_eq!(work.copyright_expiry_date, Some(d(1982, 12, 31)));
}

#[tokio::test]
async fn days_until_expiry_counts_down_for_copyrighted() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut author = Author::new("Recent");
  author.death_date = Some(d(2000, 1, 1));
  let mut work = Work::new("Still In Term");
  work.authors = vec![author];

  let days = sched.days_until_expiry(&mut work, None, None).await.unwrap();
  // 2025-04-30 to 2070-12-31.
  assert_eq!(days, Some((d(2070, 12, 31) - d(2025, 4, 30)).num_days()));
}

#[tokio::test]
async fn works_by_status_recomputes_per_jurisdiction() {
  let s = seeded().await;
  let sched = scheduler(&s);

  let mut old = dracula();
  s.save_work(&mut old).await.unwrap();

  let mut author = Author::new("Recent");
  author.death_date = Some(d(2000, 1, 1));
  let mut recent = Work::new("Still In Term");
  recent.authors = vec![author];
  s.save_work(&mut recent).await.unwrap();

  let pd = sched
    .works_by_status_in_jurisdiction("US", CopyrightStatus::PublicDomain)
    .await
    .unwrap();
  assert_eq!(pd.len(), 1);
  assert_eq!(pd[0].title, "Dracula");

  let copyrighted = sched
    .works_by_status_in_jurisdiction("US", CopyrightStatus::Copyrighted)
    .await
    .unwrap();
  assert_eq!(copyrighted.len(), 1);
  assert_eq!(copyrighted[0].title, "Still In Term");

  let none = sched
    .works_by_status_in_jurisdiction("ZZ", CopyrightStatus::PublicDomain)
    .await
    .unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn topics_deduplicate_by_name() {
  let s = store().await;
  let a = s.add_topic("Books").await.unwrap();
  let b = s.add_topic("Books").await.unwrap();
  assert_eq!(a.id, b.id);
}
