//! Subcommand implementations. Results go to stdout as JSON lines so the
//! output composes with `jq` and friends.

use anyhow::Context as _;
use arbor_core::{context::MaintenanceContext, span::AccessScope};
use arbor_graph::{FamilyGraph, Relative, activity::activity_by_year};
use arbor_maintenance::Maintenance;
use arbor_store_sqlite::SqliteStore;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Relation {
  Ancestors,
  Descendants,
  Siblings,
  UnclesAunts,
  Cousins,
  NephewsNieces,
  StepParents,
  InLaws,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum MaintainOp {
  CheckDates,
  SyncDates,
  Dedupe,
  Orphans,
  Cascade,
}

pub async fn tree(
  store: &SqliteStore,
  scope: AccessScope,
  relation: Relation,
  span_id: Uuid,
  generations: u32,
) -> anyhow::Result<()> {
  let graph = FamilyGraph::new(store, scope);

  let relatives = match relation {
    Relation::Ancestors => graph.ancestors(span_id, generations).await?,
    Relation::Descendants => graph.descendants(span_id, generations).await?,
    Relation::Siblings => graph.siblings(span_id).await?,
    Relation::UnclesAunts => graph.uncles_and_aunts(span_id).await?,
    Relation::Cousins => graph.cousins(span_id).await?,
    Relation::NephewsNieces => {
      let mut blood = graph.nephews_and_nieces(span_id).await?;
      blood.extend(graph.extra_nephews_and_nieces(span_id).await?);
      blood
    }
    Relation::StepParents => graph.step_parents(span_id).await?,
    Relation::InLaws => {
      let mut laws = graph.in_laws_and_out_laws(span_id).await?;
      laws.extend(graph.children_in_laws_and_out_laws(span_id).await?);
      laws.extend(graph.grandchildren_in_laws_and_out_laws(span_id).await?);
      laws
    }
  };

  for relative in &relatives {
    println!("{}", serde_json::to_string(&line(relative))?);
  }
  Ok(())
}

fn line(relative: &Relative) -> serde_json::Value {
  serde_json::json!({
    "span_id":    relative.span.span_id,
    "name":       relative.span.name,
    "label":      relative.label,
    "generation": relative.generation,
  })
}

pub async fn activity(
  store: &SqliteStore,
  scope: AccessScope,
  span_id: Uuid,
  from: i32,
  to: i32,
) -> anyhow::Result<()> {
  let buckets = activity_by_year(store, span_id, scope, from, to)
    .await
    .context("activity query failed")?;
  for bucket in &buckets {
    println!("{}", serde_json::to_string(bucket)?);
  }
  Ok(())
}

pub async fn maintain(
  store: &SqliteStore,
  op: MaintainOp,
  apply: bool,
  limit: Option<usize>,
  batch_size: Option<usize>,
) -> anyhow::Result<()> {
  let mut ctx = if apply {
    MaintenanceContext::apply()
  } else {
    MaintenanceContext::dry_run()
  };
  ctx.limit = limit;
  if let Some(size) = batch_size {
    ctx = ctx.with_batch_size(size);
  }

  // Ctrl-C stops the run between batches; committed batches stay.
  let cancel = ctx.cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::info!("interrupt received; finishing current batch");
      cancel.cancel();
    }
  });

  let maintenance = Maintenance::new(store);
  let report = match op {
    MaintainOp::CheckDates => maintenance.check_family_dates(&ctx).await,
    MaintainOp::SyncDates => maintenance.sync_family_dates(&ctx).await,
    MaintainOp::Dedupe => maintenance.cleanup_duplicate_spans(&ctx).await,
    MaintainOp::Orphans => maintenance.cleanup_orphaned_connections(&ctx).await,
    MaintainOp::Cascade => maintenance.cascade_public_spans(&ctx).await,
  }
  .context("maintenance scan failed")?;

  for issue in &report.issues {
    println!("{}", serde_json::to_string(issue)?);
  }
  println!(
    "{}",
    serde_json::json!({
      "scanned":      report.scanned,
      "issues_found": report.issues_found(),
      "fixed":        report.fixed,
      "errors":       report.errors,
      "dry_run":      ctx.dry_run,
    })
  );

  if !report.errors.is_empty() {
    std::process::exit(1);
  }
  Ok(())
}
