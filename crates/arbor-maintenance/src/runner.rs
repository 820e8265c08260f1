//! Chunked application of repair writes.
//!
//! One chunk is one transaction. A failed chunk rolls back alone, lands in
//! the report's error list, and the run continues — prior chunks stay
//! committed. Cancellation is checked between chunks only.

use arbor_core::{
  context::MaintenanceContext,
  store::{GraphStore, WriteBatch, WriteOp},
};

use crate::report::MaintenanceReport;

/// Apply `ops` in `ctx.batch_size` chunks, recording successes in
/// `report.fixed` and failures in `report.errors`. A no-op under dry-run.
pub(crate) async fn apply_chunked<S: GraphStore>(
  store: &S,
  ctx: &MaintenanceContext,
  ops: Vec<WriteOp>,
  report: &mut MaintenanceReport,
) {
  if ctx.dry_run || ops.is_empty() {
    return;
  }

  for chunk in ops.chunks(ctx.batch_size) {
    if ctx.cancel.is_cancelled() {
      tracing::info!(
        applied = report.fixed,
        "maintenance cancelled between batches"
      );
      break;
    }

    let mut batch = WriteBatch::new();
    for op in chunk {
      batch.push(op.clone());
    }

    match store.apply(batch).await {
      Ok(()) => report.fixed += chunk.len(),
      Err(e) => {
        tracing::warn!(error = %e, batch_len = chunk.len(), "batch failed; continuing");
        report.errors.push(e.to_string());
      }
    }
  }
}
