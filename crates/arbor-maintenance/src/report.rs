//! Maintenance reports and the consistency-issue taxonomy.
//!
//! Issues are data, not control flow: scans collect them into a report
//! instead of throwing. Only genuine storage failures surface as errors, and
//! during the apply phase even those are accumulated per batch so one bad
//! batch cannot undo or abort the others.

use serde::Serialize;
use uuid::Uuid;

use arbor_core::{date::FuzzyDate, span::SpanKind};

// ─── Issue taxonomy ──────────────────────────────────────────────────────────

/// Which reference of an edge is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRole {
  Subject,
  Object,
  /// The `connection_span_id` reference to the carrier span.
  Carrier,
}

/// Which date field of a carrier span an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
  Start,
  End,
}

/// A consistency problem found by a scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
  /// An edge references a span that no longer exists.
  DanglingReference {
    connection_id: Uuid,
    missing_id:    Uuid,
    role:          EdgeRole,
  },

  /// An edge's carrier reference resolves to a span of the wrong kind.
  TypeMismatch {
    connection_id:      Uuid,
    connection_span_id: Uuid,
    found:              SpanKind,
  },

  /// A carrier date disagrees with what the endpoints' lifetimes imply.
  /// `suggested = None` means the problem is reportable but no repair is
  /// computable (e.g. an inverted range).
  TemporalInconsistency {
    connection_id: Uuid,
    field:         DateField,
    current:       Option<FuzzyDate>,
    suggested:     Option<FuzzyDate>,
  },

  /// An edge that would duplicate another (same subject, object, kind) and
  /// was (or would be) dropped. `kept = None` for degenerate self-loops
  /// produced by a merge.
  DuplicateEdge {
    dropped: Uuid,
    kept:    Option<Uuid>,
  },

  /// A family edge whose parent/child direction cannot be inferred from
  /// birth order. Never repaired automatically.
  AmbiguousDirection {
    connection_id: Uuid,
  },

  /// A group of same-named spans collapsed (or proposed to collapse) into a
  /// survivor.
  DuplicateSpan {
    survivor:   Uuid,
    duplicates: Vec<Uuid>,
    name:       String,
  },

  /// A carrier span whose owning edge no longer exists.
  OrphanedConnectionSpan {
    span_id: Uuid,
  },

  /// A private span one hop from a public span; the access cascade makes it
  /// public.
  PrivateNeighbor {
    span_id:        Uuid,
    via_connection: Uuid,
  },
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// The outcome of one maintenance operation.
///
/// `fixed` counts applied writes; a dry run always reports `fixed = 0` while
/// producing the same `issues`. `errors` holds per-batch storage failures —
/// a failed batch rolls back alone and never disturbs committed batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
  pub scanned: usize,
  pub issues:  Vec<Issue>,
  pub fixed:   usize,
  pub errors:  Vec<String>,
}

impl MaintenanceReport {
  pub fn issues_found(&self) -> usize {
    self.issues.len()
  }
}
