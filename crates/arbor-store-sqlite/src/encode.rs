//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields
//! (FuzzyDate, SpanMetadata) are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings. Kind and access enums are stored as their
//! serde discriminant strings.

use arbor_core::{
  connection::{Connection, ConnectionKind},
  date::FuzzyDate,
  span::{AccessLevel, Span, SpanKind, SpanMetadata},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp: {e}")))
}

// ─── SpanKind ────────────────────────────────────────────────────────────────

pub fn encode_span_kind(k: SpanKind) -> &'static str {
  match k {
    SpanKind::Person => "person",
    SpanKind::Place => "place",
    SpanKind::Organisation => "organisation",
    SpanKind::Event => "event",
    SpanKind::Thing => "thing",
    SpanKind::Role => "role",
    SpanKind::Band => "band",
    SpanKind::Connection => "connection",
    SpanKind::Set => "set",
  }
}

pub fn decode_span_kind(s: &str) -> Result<SpanKind> {
  match s {
    "person" => Ok(SpanKind::Person),
    "place" => Ok(SpanKind::Place),
    "organisation" => Ok(SpanKind::Organisation),
    "event" => Ok(SpanKind::Event),
    "thing" => Ok(SpanKind::Thing),
    "role" => Ok(SpanKind::Role),
    "band" => Ok(SpanKind::Band),
    "connection" => Ok(SpanKind::Connection),
    "set" => Ok(SpanKind::Set),
    other => Err(Error::Decode(format!("unknown span kind: {other:?}"))),
  }
}

// ─── ConnectionKind ──────────────────────────────────────────────────────────

pub fn encode_connection_kind(k: ConnectionKind) -> &'static str {
  match k {
    ConnectionKind::Family => "family",
    ConnectionKind::Relationship => "relationship",
    ConnectionKind::Residence => "residence",
    ConnectionKind::Education => "education",
    ConnectionKind::Employment => "employment",
    ConnectionKind::Membership => "membership",
    ConnectionKind::Features => "features",
    ConnectionKind::Located => "located",
    ConnectionKind::Created => "created",
  }
}

pub fn decode_connection_kind(s: &str) -> Result<ConnectionKind> {
  match s {
    "family" => Ok(ConnectionKind::Family),
    "relationship" => Ok(ConnectionKind::Relationship),
    "residence" => Ok(ConnectionKind::Residence),
    "education" => Ok(ConnectionKind::Education),
    "employment" => Ok(ConnectionKind::Employment),
    "membership" => Ok(ConnectionKind::Membership),
    "features" => Ok(ConnectionKind::Features),
    "located" => Ok(ConnectionKind::Located),
    "created" => Ok(ConnectionKind::Created),
    other => Err(Error::Decode(format!("unknown connection kind: {other:?}"))),
  }
}

// ─── AccessLevel ─────────────────────────────────────────────────────────────

pub fn encode_access(a: AccessLevel) -> &'static str {
  match a {
    AccessLevel::Public => "public",
    AccessLevel::Private => "private",
  }
}

pub fn decode_access(s: &str) -> Result<AccessLevel> {
  match s {
    "public" => Ok(AccessLevel::Public),
    "private" => Ok(AccessLevel::Private),
    other => Err(Error::Decode(format!("unknown access level: {other:?}"))),
  }
}

// ─── FuzzyDate ───────────────────────────────────────────────────────────────

pub fn encode_fuzzy_date(d: &FuzzyDate) -> Result<String> {
  Ok(serde_json::to_string(d)?)
}

pub fn decode_fuzzy_date(s: &str) -> Result<FuzzyDate> {
  Ok(serde_json::from_str(s)?)
}

// ─── SpanMetadata ────────────────────────────────────────────────────────────

pub fn encode_metadata(m: &SpanMetadata) -> Result<String> {
  Ok(serde_json::to_string(m)?)
}

pub fn decode_metadata(s: &str) -> Result<SpanMetadata> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `spans` row.
pub struct RawSpan {
  pub span_id:    String,
  pub kind:       String,
  pub name:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub access:     String,
  pub owner_id:   Option<String>,
  pub metadata:   String,
  pub created_at: String,
}

impl RawSpan {
  /// Decode, validating the metadata variant against the span kind — the
  /// storage boundary is where mistyped payloads are caught.
  pub fn into_span(self) -> Result<Span> {
    let span = Span {
      span_id:    decode_uuid(&self.span_id)?,
      kind:       decode_span_kind(&self.kind)?,
      name:       self.name,
      start:      self.start_date.as_deref().map(decode_fuzzy_date).transpose()?,
      end:        self.end_date.as_deref().map(decode_fuzzy_date).transpose()?,
      access:     decode_access(&self.access)?,
      owner_id:   self.owner_id.as_deref().map(decode_uuid).transpose()?,
      metadata:   decode_metadata(&self.metadata)?,
      created_at: decode_dt(&self.created_at)?,
    };
    span.validate().map_err(Error::Core)?;
    Ok(span)
  }
}

/// Raw strings read directly from a `connections` row.
pub struct RawConnection {
  pub connection_id:      String,
  pub kind:               String,
  pub subject_id:         String,
  pub object_id:          String,
  pub connection_span_id: String,
}

impl RawConnection {
  pub fn into_connection(self) -> Result<Connection> {
    Ok(Connection {
      connection_id:      decode_uuid(&self.connection_id)?,
      kind:               decode_connection_kind(&self.kind)?,
      subject_id:         decode_uuid(&self.subject_id)?,
      object_id:          decode_uuid(&self.object_id)?,
      connection_span_id: decode_uuid(&self.connection_span_id)?,
    })
  }
}
