//! Connection — a directed, typed edge between two spans.
//!
//! A connection carries no dates of its own: its temporal extent and metadata
//! live on a dedicated carrier span ([`crate::span::SpanKind::Connection`])
//! referenced by `connection_span_id`. Carrier spans are created and deleted
//! in lock-step with their edge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{date::FuzzyDate, span::AccessLevel};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The semantic type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
  /// Directed parent → child. A person may carry any number of parent and
  /// child edges (blended families).
  Family,
  /// Partner/spouse bond. Storage direction is arbitrary; inference treats
  /// the edge as undirected.
  Relationship,
  Residence,
  Education,
  Employment,
  Membership,
  Features,
  Located,
  Created,
}

impl ConnectionKind {
  /// Whether the edge direction carries no meaning.
  pub fn is_symmetric(&self) -> bool {
    matches!(self, ConnectionKind::Relationship)
  }

  /// Kinds whose endpoints' lifetimes constrain the edge's dates.
  pub fn is_kinship(&self) -> bool {
    matches!(self, ConnectionKind::Family | ConnectionKind::Relationship)
  }
}

// ─── Connection ──────────────────────────────────────────────────────────────

/// A directed, typed edge. Subject is the source (parent, resident, employee,
/// …); object is the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub connection_id:      Uuid,
  pub kind:               ConnectionKind,
  pub subject_id:         Uuid,
  pub object_id:          Uuid,
  /// The carrier span holding this edge's own start/end dates and metadata.
  /// Must reference a span of kind `connection`; violations are consistency
  /// errors detected by maintenance, not enforced by storage.
  pub connection_span_id: Uuid,
}

impl Connection {
  /// The endpoint opposite `span_id`, if `span_id` is an endpoint at all.
  pub fn other_endpoint(&self, span_id: Uuid) -> Option<Uuid> {
    if self.subject_id == span_id {
      Some(self.object_id)
    } else if self.object_id == span_id {
      Some(self.subject_id)
    } else {
      None
    }
  }

  /// The (subject, object, kind) identity used for duplicate-edge detection.
  pub fn edge_key(&self) -> (Uuid, Uuid, ConnectionKind) {
    (self.subject_id, self.object_id, self.kind)
  }
}

// ─── NewConnection ───────────────────────────────────────────────────────────

/// Input to connection creation. The carrier span is created by the store in
/// the same transaction, named after the endpoints, and inherits the access
/// level given here.
#[derive(Debug, Clone)]
pub struct NewConnection {
  pub kind:       ConnectionKind,
  pub subject_id: Uuid,
  pub object_id:  Uuid,
  pub start:      Option<FuzzyDate>,
  pub end:        Option<FuzzyDate>,
  pub access:     AccessLevel,
  pub owner_id:   Option<Uuid>,
}

impl NewConnection {
  pub fn new(kind: ConnectionKind, subject_id: Uuid, object_id: Uuid) -> Self {
    Self {
      kind,
      subject_id,
      object_id,
      start: None,
      end: None,
      access: AccessLevel::Public,
      owner_id: None,
    }
  }

  pub fn with_dates(mut self, start: Option<FuzzyDate>, end: Option<FuzzyDate>) -> Self {
    self.start = start;
    self.end = end;
    self
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn other_endpoint_resolves_both_directions() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let edge = Connection {
      connection_id: Uuid::new_v4(),
      kind: ConnectionKind::Family,
      subject_id: a,
      object_id: b,
      connection_span_id: Uuid::new_v4(),
    };
    assert_eq!(edge.other_endpoint(a), Some(b));
    assert_eq!(edge.other_endpoint(b), Some(a));
    assert_eq!(edge.other_endpoint(Uuid::new_v4()), None);
  }

  #[test]
  fn only_relationship_is_symmetric() {
    assert!(ConnectionKind::Relationship.is_symmetric());
    assert!(!ConnectionKind::Family.is_symmetric());
    assert!(!ConnectionKind::Residence.is_symmetric());
  }
}
