//! Date consistency: the after-death check and the date synchronizer.

use arbor_core::{
  connection::{Connection, ConnectionKind},
  context::MaintenanceContext,
  date::{DateOrdering, FuzzyDate, earlier_of, later_of},
  span::{Span, SpanKind},
  store::{GraphStore, WriteOp},
};
use uuid::Uuid;

use crate::{
  report::{DateField, Issue, MaintenanceReport},
  runner::apply_chunked,
};

// ─── Direction heuristic ─────────────────────────────────────────────────────

/// How a family edge's stored direction relates to the inferred one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyDirection {
  /// The stored subject is the parent.
  AsStored,
  /// Birth order says the stored object is the parent.
  Reversed,
}

/// Guess the parent of a family edge: the earlier-born endpoint.
///
/// Deliberately weak by design review: twins, year-only birth dates in the
/// same year, or missing births all return `None`, which the caller reports
/// as [`Issue::AmbiguousDirection`] rather than guessing harder.
pub fn infer_family_direction(subject: &Span, object: &Span) -> Option<FamilyDirection> {
  let subject_birth = subject.start?.sort_key()?;
  let object_birth = object.start?.sort_key()?;
  if subject_birth < object_birth {
    Some(FamilyDirection::AsStored)
  } else if object_birth < subject_birth {
    Some(FamilyDirection::Reversed)
  } else {
    None
  }
}

// ─── Shared scan plumbing ────────────────────────────────────────────────────

/// A kinship edge with both endpoints and carrier resolved. Edges that don't
/// fully resolve are skipped here; the orphan cleanup reports them.
struct ResolvedEdge {
  connection: Connection,
  subject:    Span,
  object:     Span,
  carrier:    Span,
}

async fn resolve_kinship_edges<S: GraphStore>(
  store: &S,
  kind: ConnectionKind,
  ctx: &MaintenanceContext,
  scanned: &mut usize,
) -> Result<Vec<ResolvedEdge>, S::Error> {
  let edges = store.list_connections(Some(kind), ctx.limit).await?;

  let mut resolved = Vec::new();
  for connection in edges {
    *scanned += 1;
    let Some(subject) = store.find_span(connection.subject_id).await? else {
      tracing::debug!(connection = %connection.connection_id, "subject missing; skipping");
      continue;
    };
    let Some(object) = store.find_span(connection.object_id).await? else {
      tracing::debug!(connection = %connection.connection_id, "object missing; skipping");
      continue;
    };
    let Some(carrier) = store.find_span(connection.connection_span_id).await? else {
      continue;
    };
    if carrier.kind != SpanKind::Connection {
      continue;
    }
    resolved.push(ResolvedEdge { connection, subject, object, carrier });
  }
  Ok(resolved)
}

/// Whether `suggested` differs from `current` enough to propose a change.
/// A precision refinement (1980 vs 1980-03-05) counts as a difference.
fn differs(current: Option<FuzzyDate>, suggested: FuzzyDate) -> bool {
  match current {
    None => true,
    Some(current) => current.compare(&suggested) != DateOrdering::Equal,
  }
}

// ─── Date-after-death check ──────────────────────────────────────────────────

/// For family/relationship edges where an endpoint has died: the edge must
/// have an end date, and it must not exceed the later known death. Fix mode
/// sets the end to that maximum. Inverted carrier ranges are reported with no
/// computable repair.
pub(crate) async fn check_family_dates<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
) -> Result<MaintenanceReport, S::Error> {
  let mut report = MaintenanceReport::default();
  let mut ops: Vec<WriteOp> = Vec::new();

  for kind in [ConnectionKind::Family, ConnectionKind::Relationship] {
    let edges = resolve_kinship_edges(store, kind, ctx, &mut report.scanned).await?;

    for edge in edges {
      if edge.carrier.range().end_before_start() {
        report.issues.push(Issue::TemporalInconsistency {
          connection_id: edge.connection.connection_id,
          field:         DateField::End,
          current:       edge.carrier.end,
          suggested:     None,
        });
        continue;
      }

      let Some(latest_death) = later_of(edge.subject.end, edge.object.end) else {
        continue; // both endpoints still living (or deaths unknown)
      };

      let out_of_bounds = match edge.carrier.end {
        None => true, // a death means the bond has ended
        Some(end) => match (end.sort_key(), latest_death.sort_key()) {
          (Some(end_key), Some(death_key)) => end_key > death_key,
          _ => false,
        },
      };

      if out_of_bounds {
        report.issues.push(Issue::TemporalInconsistency {
          connection_id: edge.connection.connection_id,
          field:         DateField::End,
          current:       edge.carrier.end,
          suggested:     Some(latest_death),
        });
        ops.push(WriteOp::SetSpanDates {
          span_id: edge.carrier.span_id,
          start:   edge.carrier.start,
          end:     Some(latest_death),
        });
      }
    }
  }

  apply_chunked(store, ctx, ops, &mut report).await;
  Ok(report)
}

// ─── Date synchronizer ───────────────────────────────────────────────────────

/// Suggested dates for one carrier, with the issues backing them.
struct Proposal {
  carrier_id: Uuid,
  start:      Option<FuzzyDate>,
  end:        Option<FuzzyDate>,
  changed:    bool,
}

impl Proposal {
  fn new(carrier: &Span) -> Self {
    Self {
      carrier_id: carrier.span_id,
      start:      carrier.start,
      end:        carrier.end,
      changed:    false,
    }
  }

  fn suggest(
    &mut self,
    field: DateField,
    suggested: Option<FuzzyDate>,
    edge: &Connection,
    report: &mut MaintenanceReport,
  ) {
    let Some(suggested) = suggested else { return };
    let current = match field {
      DateField::Start => self.start,
      DateField::End => self.end,
    };
    if !differs(current, suggested) {
      return;
    }
    report.issues.push(Issue::TemporalInconsistency {
      connection_id: edge.connection_id,
      field,
      current,
      suggested: Some(suggested),
    });
    match field {
      DateField::Start => self.start = Some(suggested),
      DateField::End => self.end = Some(suggested),
    }
    self.changed = true;
  }
}

/// Propose carrier dates from the endpoints' lifetimes.
///
/// Family: start = child's birth; end = parent's death, or the child's death
/// when the parent outlives the child. Parent/child comes from
/// [`infer_family_direction`]; ambiguous edges are reported and left alone.
///
/// Relationship: start = the later birth, end = the earlier death, each
/// proposed only when both sides are known.
pub(crate) async fn sync_family_dates<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
) -> Result<MaintenanceReport, S::Error> {
  let mut report = MaintenanceReport::default();
  let mut ops: Vec<WriteOp> = Vec::new();

  let family =
    resolve_kinship_edges(store, ConnectionKind::Family, ctx, &mut report.scanned)
      .await?;
  for edge in family {
    let (parent, child) = match infer_family_direction(&edge.subject, &edge.object) {
      Some(FamilyDirection::AsStored) => (&edge.subject, &edge.object),
      Some(FamilyDirection::Reversed) => (&edge.object, &edge.subject),
      None => {
        report.issues.push(Issue::AmbiguousDirection {
          connection_id: edge.connection.connection_id,
        });
        continue;
      }
    };

    let mut proposal = Proposal::new(&edge.carrier);
    proposal.suggest(DateField::Start, child.start, &edge.connection, &mut report);
    let end = match (parent.end, child.end) {
      (Some(parent_death), _) => Some(parent_death),
      (None, Some(child_death)) => Some(child_death),
      (None, None) => None, // both living: stays open-ended
    };
    proposal.suggest(DateField::End, end, &edge.connection, &mut report);

    if proposal.changed {
      ops.push(WriteOp::SetSpanDates {
        span_id: proposal.carrier_id,
        start:   proposal.start,
        end:     proposal.end,
      });
    }
  }

  let partnerships = resolve_kinship_edges(
    store,
    ConnectionKind::Relationship,
    ctx,
    &mut report.scanned,
  )
  .await?;
  for edge in partnerships {
    let mut proposal = Proposal::new(&edge.carrier);

    if edge.subject.start.is_some() && edge.object.start.is_some() {
      let start = later_of(edge.subject.start, edge.object.start);
      proposal.suggest(DateField::Start, start, &edge.connection, &mut report);
    }
    if edge.subject.end.is_some() && edge.object.end.is_some() {
      let end = earlier_of(edge.subject.end, edge.object.end);
      proposal.suggest(DateField::End, end, &edge.connection, &mut report);
    }

    if proposal.changed {
      ops.push(WriteOp::SetSpanDates {
        span_id: proposal.carrier_id,
        start:   proposal.start,
        end:     proposal.end,
      });
    }
  }

  apply_chunked(store, ctx, ops, &mut report).await;
  Ok(report)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use arbor_core::span::{AccessLevel, SpanMetadata};
  use chrono::Utc;

  use super::*;

  fn person(birth: Option<i32>) -> Span {
    Span {
      span_id: Uuid::new_v4(),
      kind: SpanKind::Person,
      name: "p".into(),
      start: birth.map(FuzzyDate::year),
      end: None,
      access: AccessLevel::Public,
      owner_id: None,
      metadata: SpanMetadata::None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn earlier_born_is_parent() {
    let older = person(Some(1900));
    let younger = person(Some(1930));
    assert_eq!(
      infer_family_direction(&older, &younger),
      Some(FamilyDirection::AsStored)
    );
    assert_eq!(
      infer_family_direction(&younger, &older),
      Some(FamilyDirection::Reversed)
    );
  }

  #[test]
  fn same_year_or_unknown_birth_is_ambiguous() {
    let a = person(Some(1930));
    let b = person(Some(1930));
    assert_eq!(infer_family_direction(&a, &b), None);

    let unknown = person(None);
    assert_eq!(infer_family_direction(&a, &unknown), None);
    assert_eq!(infer_family_direction(&unknown, &a), None);
  }

  #[test]
  fn precision_refinement_counts_as_difference() {
    assert!(differs(
      Some(FuzzyDate::year(1980)),
      FuzzyDate::ymd(1980, 3, 5).unwrap()
    ));
    assert!(!differs(Some(FuzzyDate::year(1980)), FuzzyDate::year(1980)));
    assert!(differs(None, FuzzyDate::year(1980)));
  }
}
