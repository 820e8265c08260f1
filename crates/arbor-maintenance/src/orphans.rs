//! Referential cleanup: dangling edges, miswired carriers, orphaned carrier
//! spans.
//!
//! Storage deliberately does not enforce these references, so a deleted span
//! can leave edges pointing at nothing and carrier spans owned by no edge.
//! This scan finds and (in fix mode) removes them. Deleting a dangling edge
//! also deletes its carrier, which the next run then no longer sees: repeated
//! runs converge to a clean graph.

use arbor_core::{
  context::MaintenanceContext,
  span::SpanKind,
  store::{GraphStore, SpanFilter, WriteOp},
};

use crate::{
  report::{EdgeRole, Issue, MaintenanceReport},
  runner::apply_chunked,
};

pub(crate) async fn clean_orphans<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
) -> Result<MaintenanceReport, S::Error> {
  let mut report = MaintenanceReport::default();
  let mut ops: Vec<WriteOp> = Vec::new();

  // Pass 1: edges with a missing endpoint or a missing/miswired carrier.
  let edges = store.list_connections(None, ctx.limit).await?;
  for edge in edges {
    report.scanned += 1;
    let mut broken = false;

    for (id, role) in [
      (edge.subject_id, EdgeRole::Subject),
      (edge.object_id, EdgeRole::Object),
      (edge.connection_span_id, EdgeRole::Carrier),
    ] {
      match store.find_span(id).await? {
        None => {
          report.issues.push(Issue::DanglingReference {
            connection_id: edge.connection_id,
            missing_id:    id,
            role,
          });
          broken = true;
        }
        Some(span) if role == EdgeRole::Carrier && span.kind != SpanKind::Connection => {
          report.issues.push(Issue::TypeMismatch {
            connection_id:      edge.connection_id,
            connection_span_id: edge.connection_span_id,
            found:              span.kind,
          });
          broken = true;
        }
        Some(_) => {}
      }
    }

    if broken {
      ops.push(WriteOp::DeleteConnection(edge.connection_id));
    }
  }

  // Pass 2: carrier spans no edge claims.
  let carriers = store
    .list_spans(SpanFilter { limit: ctx.limit, ..SpanFilter::kind(SpanKind::Connection) })
    .await?;
  for carrier in carriers {
    report.scanned += 1;
    if store.find_connection_by_span(carrier.span_id).await?.is_none() {
      report.issues.push(Issue::OrphanedConnectionSpan { span_id: carrier.span_id });
      ops.push(WriteOp::DeleteSpan(carrier.span_id));
    }
  }

  apply_chunked(store, ctx, ops, &mut report).await;
  Ok(report)
}
