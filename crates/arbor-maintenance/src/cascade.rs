//! Access cascade: private spans adjacent to public spans become public.
//!
//! A connection is only visible when both endpoints are; a public span linked
//! to a private one therefore has an edge nobody but the owner can see. The
//! cascade resolves this one hop at a time, publishing the private neighbor
//! and the edge's carrier. It never runs the other way (public spans are
//! never made private).

use std::collections::HashSet;

use arbor_core::{
  context::MaintenanceContext,
  span::{AccessLevel, AccessScope},
  store::{GraphStore, SpanFilter, WriteOp},
};
use uuid::Uuid;

use crate::{
  report::{Issue, MaintenanceReport},
  runner::apply_chunked,
};

pub(crate) async fn cascade_access<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
) -> Result<MaintenanceReport, S::Error> {
  let mut report = MaintenanceReport::default();
  let mut ops: Vec<WriteOp> = Vec::new();
  let mut seen: HashSet<Uuid> = HashSet::new();

  let public = store
    .list_spans(SpanFilter {
      access: Some(AccessLevel::Public),
      limit: ctx.limit,
      ..SpanFilter::default()
    })
    .await?;

  for span in public {
    report.scanned += 1;
    let edges = store
      .connections_touching(span.span_id, AccessScope::Unrestricted)
      .await?;

    for edge in edges {
      let Some(neighbor_id) = edge.other_endpoint(span.span_id) else {
        continue;
      };
      // The carrier rides along with its edge's visibility.
      for candidate in [neighbor_id, edge.connection_span_id] {
        if !seen.insert(candidate) {
          continue;
        }
        let Some(neighbor) = store.find_span(candidate).await? else {
          continue; // dangling; the orphan cleanup owns that
        };
        if neighbor.access != AccessLevel::Private {
          continue;
        }
        report.issues.push(Issue::PrivateNeighbor {
          span_id:        neighbor.span_id,
          via_connection: edge.connection_id,
        });
        ops.push(WriteOp::SetAccessLevel {
          span_id: neighbor.span_id,
          access:  AccessLevel::Public,
        });
      }
    }
  }

  apply_chunked(store, ctx, ops, &mut report).await;
  Ok(report)
}
