//! Span — the dated entity node of the graph.
//!
//! Everything in the store is a span: people, places, events, and the carrier
//! records that hold a connection's own dates. A span's meaningful attributes
//! beyond name and dates live in a kind-tagged metadata payload with a
//! declared field set per kind — not a free-form map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  date::FuzzyDate,
  overlap::TemporalRange,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of entity a span represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
  Person,
  Place,
  Organisation,
  Event,
  Thing,
  Role,
  Band,
  /// Carrier for exactly one connection edge's dates and metadata; never an
  /// endpoint of any other edge.
  Connection,
  Set,
}

// ─── Access ──────────────────────────────────────────────────────────────────

/// Visibility of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
  Public,
  /// Visible only to the owning principal.
  Private,
}

/// The caller's identity for access filtering, applied by every store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
  /// Public spans only.
  Anonymous,
  /// Public spans plus private spans owned by this principal.
  Principal(Uuid),
  /// No filtering. Reserved for maintenance operations, which must see the
  /// whole graph to repair it.
  Unrestricted,
}

impl AccessScope {
  /// Whether a span is visible under this scope.
  pub fn allows(&self, span: &Span) -> bool {
    match self {
      AccessScope::Unrestricted => true,
      _ if span.access == AccessLevel::Public => true,
      AccessScope::Principal(principal) => span.owner_id == Some(*principal),
      AccessScope::Anonymous => false,
    }
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Kind-specific attributes with a declared optional-field set per kind.
///
/// The variant must agree with the span's [`SpanKind`]; the storage boundary
/// validates this on read and write (see [`Span::validate`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SpanMetadata {
  Person {
    #[serde(default)]
    gender:        Option<String>,
    #[serde(default)]
    occupation:    Option<String>,
    #[serde(default)]
    birthplace_id: Option<Uuid>,
  },
  Place {
    #[serde(default)]
    place_type: Option<String>,
  },
  Organisation {
    #[serde(default)]
    org_type: Option<String>,
  },
  Event {
    #[serde(default)]
    event_type: Option<String>,
  },
  Thing {
    #[serde(default)]
    medium:     Option<String>,
    #[serde(default)]
    creator_id: Option<Uuid>,
  },
  Role {
    #[serde(default)]
    description: Option<String>,
  },
  Band {
    #[serde(default)]
    genre: Option<String>,
  },
  Connection {
    #[serde(default)]
    note: Option<String>,
  },
  Set {
    #[serde(default)]
    description: Option<String>,
  },
  /// A span with no recorded attributes yet.
  #[default]
  None,
}

impl SpanMetadata {
  /// The span kind this payload belongs to; `None` for the empty payload,
  /// which is valid for every kind.
  pub fn kind(&self) -> Option<SpanKind> {
    match self {
      SpanMetadata::Person { .. } => Some(SpanKind::Person),
      SpanMetadata::Place { .. } => Some(SpanKind::Place),
      SpanMetadata::Organisation { .. } => Some(SpanKind::Organisation),
      SpanMetadata::Event { .. } => Some(SpanKind::Event),
      SpanMetadata::Thing { .. } => Some(SpanKind::Thing),
      SpanMetadata::Role { .. } => Some(SpanKind::Role),
      SpanMetadata::Band { .. } => Some(SpanKind::Band),
      SpanMetadata::Connection { .. } => Some(SpanKind::Connection),
      SpanMetadata::Set { .. } => Some(SpanKind::Set),
      SpanMetadata::None => None,
    }
  }

  /// An empty payload of the right variant for `kind`.
  pub fn empty_for(kind: SpanKind) -> Self {
    match kind {
      SpanKind::Person => SpanMetadata::Person {
        gender: None, occupation: None, birthplace_id: None,
      },
      SpanKind::Place => SpanMetadata::Place { place_type: None },
      SpanKind::Organisation => SpanMetadata::Organisation { org_type: None },
      SpanKind::Event => SpanMetadata::Event { event_type: None },
      SpanKind::Thing => SpanMetadata::Thing { medium: None, creator_id: None },
      SpanKind::Role => SpanMetadata::Role { description: None },
      SpanKind::Band => SpanMetadata::Band { genre: None },
      SpanKind::Connection => SpanMetadata::Connection { note: None },
      SpanKind::Set => SpanMetadata::Set { description: None },
    }
  }
}

// ─── Span ────────────────────────────────────────────────────────────────────

/// A dated entity. `start = None` means unknown; `end = None` means unknown
/// or ongoing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
  pub span_id:    Uuid,
  pub kind:       SpanKind,
  pub name:       String,
  pub start:      Option<FuzzyDate>,
  pub end:        Option<FuzzyDate>,
  pub access:     AccessLevel,
  pub owner_id:   Option<Uuid>,
  pub metadata:   SpanMetadata,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
}

impl Span {
  /// The span's temporal extent as a range.
  pub fn range(&self) -> TemporalRange {
    TemporalRange::new(self.start, self.end)
  }

  /// Whether this person-like span has a recorded end (death) date.
  pub fn has_ended(&self) -> bool {
    self.end.is_some()
  }

  /// Check that the metadata variant agrees with the span kind.
  pub fn validate(&self) -> Result<()> {
    match self.metadata.kind() {
      None => Ok(()),
      Some(kind) if kind == self.kind => Ok(()),
      Some(kind) => Err(Error::MetadataKindMismatch {
        span_id: self.span_id,
        span_kind: self.kind,
        metadata_kind: kind,
      }),
    }
  }
}

// ─── NewSpan ─────────────────────────────────────────────────────────────────

/// Input to span creation; ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSpan {
  pub kind:     SpanKind,
  pub name:     String,
  pub start:    Option<FuzzyDate>,
  pub end:      Option<FuzzyDate>,
  pub access:   AccessLevel,
  pub owner_id: Option<Uuid>,
  pub metadata: SpanMetadata,
}

impl NewSpan {
  /// Convenience constructor: public, unowned, empty metadata of the right
  /// variant.
  pub fn new(kind: SpanKind, name: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
      start: None,
      end: None,
      access: AccessLevel::Public,
      owner_id: None,
      metadata: SpanMetadata::empty_for(kind),
    }
  }

  pub fn with_dates(mut self, start: Option<FuzzyDate>, end: Option<FuzzyDate>) -> Self {
    self.start = start;
    self.end = end;
    self
  }

  pub fn private(mut self, owner: Uuid) -> Self {
    self.access = AccessLevel::Private;
    self.owner_id = Some(owner);
    self
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn span(kind: SpanKind, metadata: SpanMetadata) -> Span {
    Span {
      span_id: Uuid::new_v4(),
      kind,
      name: "test".into(),
      start: None,
      end: None,
      access: AccessLevel::Public,
      owner_id: None,
      metadata,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn metadata_variant_must_match_kind() {
    let ok = span(SpanKind::Person, SpanMetadata::empty_for(SpanKind::Person));
    assert!(ok.validate().is_ok());

    let bad = span(SpanKind::Place, SpanMetadata::empty_for(SpanKind::Person));
    assert!(matches!(
      bad.validate(),
      Err(Error::MetadataKindMismatch { .. })
    ));
  }

  #[test]
  fn empty_metadata_is_valid_for_any_kind() {
    let s = span(SpanKind::Event, SpanMetadata::None);
    assert!(s.validate().is_ok());
  }

  #[test]
  fn access_scope_gating() {
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let mut s = span(SpanKind::Person, SpanMetadata::None);
    assert!(AccessScope::Anonymous.allows(&s));

    s.access = AccessLevel::Private;
    s.owner_id = Some(owner);
    assert!(!AccessScope::Anonymous.allows(&s));
    assert!(!AccessScope::Principal(stranger).allows(&s));
    assert!(AccessScope::Principal(owner).allows(&s));
    assert!(AccessScope::Unrestricted.allows(&s));
  }
}
