//! Duplicate-span merge.
//!
//! Spans with the same kind and (case-insensitive) name collapse into one
//! survivor. Each group is merged in a single transaction so a crash can
//! never leave a half-repointed group; cancellation takes effect between
//! groups.

use std::collections::{HashMap, HashSet};

use arbor_core::{
  connection::{Connection, ConnectionKind},
  context::MaintenanceContext,
  span::{AccessScope, Span, SpanKind},
  store::{GraphStore, SpanFilter, WriteBatch, WriteOp},
};
use uuid::Uuid;

use crate::report::{Issue, MaintenanceReport};

/// A group of same-identity spans with their edge counts, survivor first.
struct DuplicateGroup {
  members: Vec<(Span, Vec<Connection>)>,
}

impl DuplicateGroup {
  fn survivor(&self) -> &Span {
    &self.members[0].0
  }

  fn losers(&self) -> &[(Span, Vec<Connection>)] {
    &self.members[1..]
  }
}

/// Pick the survivor: the span with the most edges, ties broken by earliest
/// `created_at` (the record others have had longest to link to). Carrier
/// spans invert the tiebreak — the newest carrier reflects the latest edit.
fn rank(a: &(Span, Vec<Connection>), b: &(Span, Vec<Connection>)) -> std::cmp::Ordering {
  b.1
    .len()
    .cmp(&a.1.len())
    .then_with(|| {
      if a.0.kind == SpanKind::Connection {
        b.0.created_at.cmp(&a.0.created_at)
      } else {
        a.0.created_at.cmp(&b.0.created_at)
      }
    })
}

async fn collect_groups<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
  scanned: &mut usize,
) -> Result<Vec<DuplicateGroup>, S::Error> {
  let spans = store
    .list_spans(SpanFilter { limit: ctx.limit, ..SpanFilter::default() })
    .await?;
  *scanned += spans.len();

  let mut by_identity: HashMap<(SpanKind, String), Vec<Span>> = HashMap::new();
  for span in spans {
    by_identity
      .entry((span.kind, span.name.to_lowercase()))
      .or_default()
      .push(span);
  }

  let mut groups = Vec::new();
  for (_, members) in by_identity {
    if members.len() < 2 {
      continue;
    }
    let mut with_edges = Vec::with_capacity(members.len());
    for span in members {
      let edges = store
        .connections_touching(span.span_id, AccessScope::Unrestricted)
        .await?;
      with_edges.push((span, edges));
    }
    with_edges.sort_by(rank);
    groups.push(DuplicateGroup { members: with_edges });
  }
  // Deterministic run order regardless of hash iteration.
  groups.sort_by(|a, b| a.survivor().span_id.cmp(&b.survivor().span_id));
  Ok(groups)
}

/// Merge one group into a batch: re-point edges touching a loser onto the
/// survivor, dropping self-loops and edges that would duplicate one already
/// kept, then delete the losers. Survivor edges are claimed first so loser
/// edges collapse into them and not the other way round.
fn merge_group(group: &DuplicateGroup, report: &mut MaintenanceReport) -> WriteBatch {
  let survivor_id = group.survivor().span_id;
  let loser_ids: HashSet<Uuid> =
    group.losers().iter().map(|(span, _)| span.span_id).collect();
  let remap = |id: Uuid| if loser_ids.contains(&id) { survivor_id } else { id };

  let mut kept_by_key: HashMap<(Uuid, Uuid, ConnectionKind), Uuid> = HashMap::new();
  // An edge between two group members appears in both edge lists.
  let mut handled: HashSet<Uuid> = HashSet::new();
  let mut batch = WriteBatch::new();

  for (_, edges) in &group.members {
    for edge in edges {
      if !handled.insert(edge.connection_id) {
        continue;
      }

      let subject_id = remap(edge.subject_id);
      let object_id = remap(edge.object_id);

      if subject_id == object_id {
        report.issues.push(Issue::DuplicateEdge {
          dropped: edge.connection_id,
          kept:    None,
        });
        batch.push(WriteOp::DeleteConnection(edge.connection_id));
        continue;
      }

      let key = (subject_id, object_id, edge.kind);
      match kept_by_key.get(&key) {
        Some(kept) => {
          report.issues.push(Issue::DuplicateEdge {
            dropped: edge.connection_id,
            kept:    Some(*kept),
          });
          batch.push(WriteOp::DeleteConnection(edge.connection_id));
        }
        None => {
          kept_by_key.insert(key, edge.connection_id);
          if subject_id != edge.subject_id || object_id != edge.object_id {
            batch.push(WriteOp::UpsertConnection(Connection {
              subject_id,
              object_id,
              ..edge.clone()
            }));
          }
        }
      }
    }
  }

  for (span, _) in group.losers() {
    batch.push(WriteOp::DeleteSpan(span.span_id));
  }

  report.issues.push(Issue::DuplicateSpan {
    survivor:   survivor_id,
    duplicates: group.losers().iter().map(|(span, _)| span.span_id).collect(),
    name:       group.survivor().name.clone(),
  });

  batch
}

/// Find and merge duplicate spans. Fix mode applies one transaction per
/// group; `fixed` counts merged-away spans, not individual writes.
pub(crate) async fn dedupe_spans<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
) -> Result<MaintenanceReport, S::Error> {
  let mut report = MaintenanceReport::default();
  let groups = collect_groups(store, ctx, &mut report.scanned).await?;

  for group in &groups {
    if ctx.cancel.is_cancelled() {
      tracing::info!(merged = report.fixed, "dedupe cancelled between groups");
      break;
    }

    let batch = merge_group(group, &mut report);
    if ctx.dry_run {
      continue;
    }

    let merged = group.losers().len();
    match store.apply(batch).await {
      Ok(()) => report.fixed += merged,
      Err(e) => {
        tracing::warn!(
          survivor = %group.survivor().span_id,
          error = %e,
          "merge failed; group left untouched"
        );
        report.errors.push(e.to_string());
      }
    }
  }

  Ok(report)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
