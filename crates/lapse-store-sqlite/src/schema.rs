//! SQL schema for the Lapse SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS jurisdictions (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    name                   TEXT NOT NULL UNIQUE,
    code                   TEXT UNIQUE,     -- cross-system join key, e.g. 'US'
    term_years_after_death INTEGER NOT NULL DEFAULT 70,
    has_special_rules      INTEGER NOT NULL DEFAULT 0
);

-- One rule per (jurisdiction, rule_type); writes upsert on that pair.
CREATE TABLE IF NOT EXISTS copyright_rules (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    jurisdiction_id INTEGER NOT NULL REFERENCES jurisdictions(id),
    rule_type       TEXT NOT NULL,
    term_years      INTEGER NOT NULL,
    base_date_type  TEXT NOT NULL DEFAULT 'publication',
    description     TEXT NOT NULL DEFAULT '',
    UNIQUE (jurisdiction_id, rule_type)
);

CREATE TABLE IF NOT EXISTS topics (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Author updates fill only NULL columns; existing data is never overwritten.
CREATE TABLE IF NOT EXISTS authors (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    birth_date  TEXT,               -- ISO 8601 calendar date
    death_date  TEXT,
    nationality TEXT,               -- jurisdiction code
    bio         TEXT
);

CREATE TABLE IF NOT EXISTS works (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    title                   TEXT NOT NULL UNIQUE,
    topic_id                INTEGER REFERENCES topics(id),
    creation_date           TEXT,
    first_publication_date  TEXT,
    source_url              TEXT,
    scraped_at              TEXT NOT NULL,  -- ISO 8601 UTC
    copyright_expiry_date   TEXT,
    primary_jurisdiction_id INTEGER REFERENCES jurisdictions(id),
    status                  TEXT NOT NULL DEFAULT 'Unknown',
    is_collaborative        INTEGER NOT NULL DEFAULT 0,
    original_language       TEXT,
    original_publisher      TEXT,
    description             TEXT
);

-- Ordered many-to-many; author order carries through to the tie-breaks.
CREATE TABLE IF NOT EXISTS work_authors (
    work_id   INTEGER NOT NULL REFERENCES works(id),
    author_id INTEGER NOT NULL REFERENCES authors(id),
    position  INTEGER NOT NULL,
    PRIMARY KEY (work_id, author_id)
);

-- The authoritative per-jurisdiction status record.
CREATE TABLE IF NOT EXISTS work_jurisdiction_status (
    work_id         INTEGER NOT NULL REFERENCES works(id),
    jurisdiction_id INTEGER NOT NULL REFERENCES jurisdictions(id),
    status          TEXT NOT NULL,
    expiry_date     TEXT,
    PRIMARY KEY (work_id, jurisdiction_id)
);

CREATE INDEX IF NOT EXISTS works_status_idx       ON works(status);
CREATE INDEX IF NOT EXISTS works_jurisdiction_idx ON works(primary_jurisdiction_id);
CREATE INDEX IF NOT EXISTS wjs_jurisdiction_idx   ON work_jurisdiction_status(jurisdiction_id, status);

PRAGMA user_version = 1;
";
