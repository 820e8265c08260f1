//! SQL schema for the Arbor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! The `connections` table deliberately carries no foreign keys: dangling
//! endpoints and carrier references are real data errors that the maintenance
//! engine must be able to observe and repair, so the schema must be able to
//! hold them.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS spans (
    span_id    TEXT PRIMARY KEY,
    kind       TEXT NOT NULL,   -- 'person' | 'place' | ... | 'connection'
    name       TEXT NOT NULL,
    start_date TEXT,            -- JSON-encoded FuzzyDate or NULL
    end_date   TEXT,            -- JSON-encoded FuzzyDate or NULL
    access     TEXT NOT NULL DEFAULT 'public',
    owner_id   TEXT,
    metadata   TEXT NOT NULL DEFAULT '{\"kind\":\"none\"}',
    created_at TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS connections (
    connection_id      TEXT PRIMARY KEY,
    kind               TEXT NOT NULL,  -- 'family' | 'relationship' | ...
    subject_id         TEXT NOT NULL,
    object_id          TEXT NOT NULL,
    connection_span_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS spans_kind_idx         ON spans(kind);
CREATE INDEX IF NOT EXISTS spans_name_idx         ON spans(name);
CREATE INDEX IF NOT EXISTS connections_subj_idx   ON connections(subject_id);
CREATE INDEX IF NOT EXISTS connections_obj_idx    ON connections(object_id);
CREATE INDEX IF NOT EXISTS connections_kind_idx   ON connections(kind);
CREATE INDEX IF NOT EXISTS connections_carrier_idx ON connections(connection_span_id);

PRAGMA user_version = 1;
";
