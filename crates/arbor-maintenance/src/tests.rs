//! Integration tests for the maintenance engine against an in-memory store.

use arbor_core::{
  connection::{Connection, ConnectionKind, NewConnection},
  context::MaintenanceContext,
  date::FuzzyDate,
  span::{AccessLevel, NewSpan, Span, SpanKind},
  store::{GraphStore, SpanFilter, WriteBatch, WriteOp},
};
use arbor_store_sqlite::SqliteStore;

use crate::{Issue, Maintenance};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn person(s: &SqliteStore, name: &str, birth: i32, death: Option<i32>) -> Span {
  s.create_span(
    NewSpan::new(SpanKind::Person, name)
      .with_dates(Some(FuzzyDate::year(birth)), death.map(FuzzyDate::year)),
  )
  .await
  .unwrap()
}

async fn family(s: &SqliteStore, parent: &Span, child: &Span) -> (Connection, Span) {
  s.create_connection(NewConnection::new(
    ConnectionKind::Family,
    parent.span_id,
    child.span_id,
  ))
  .await
  .unwrap()
}

async fn carrier_of(s: &SqliteStore, edge: &Connection) -> Span {
  s.find_span(edge.connection_span_id).await.unwrap().unwrap()
}

// ─── Date checks ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_anchors_family_edge_to_birth_and_death() {
  let s = store().await;
  let parent = person(&s, "Xavier", 1900, Some(1980)).await;
  let child = person(&s, "Yolanda", 1930, Some(2000)).await;
  let (edge, _) = family(&s, &parent, &child).await;

  let report = Maintenance::new(&s)
    .sync_family_dates(&MaintenanceContext::apply())
    .await
    .unwrap();

  // start and end both proposed and written.
  assert_eq!(report.issues_found(), 2);
  assert_eq!(report.fixed, 1);
  assert!(report.errors.is_empty());

  let carrier = carrier_of(&s, &edge).await;
  assert_eq!(carrier.start, Some(FuzzyDate::year(1930)));
  assert_eq!(carrier.end, Some(FuzzyDate::year(1980)));
}

#[tokio::test]
async fn check_caps_end_date_at_latest_death() {
  let s = store().await;
  let parent = person(&s, "Xavier", 1900, Some(1980)).await;
  let child = person(&s, "Yolanda", 1930, Some(2000)).await;
  let (edge, _) = family(&s, &parent, &child).await;

  // An end date ten years past the last death.
  let mut batch = WriteBatch::new();
  batch.push(WriteOp::SetSpanDates {
    span_id: edge.connection_span_id,
    start:   Some(FuzzyDate::year(1930)),
    end:     Some(FuzzyDate::year(2010)),
  });
  s.apply(batch).await.unwrap();

  let report = Maintenance::new(&s)
    .check_family_dates(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert_eq!(report.fixed, 1);

  let carrier = carrier_of(&s, &edge).await;
  assert_eq!(carrier.end, Some(FuzzyDate::year(2000)));
  assert_eq!(carrier.start, Some(FuzzyDate::year(1930)), "start preserved");
}

#[tokio::test]
async fn dry_run_reports_without_mutating() {
  let s = store().await;
  let parent = person(&s, "Xavier", 1900, Some(1980)).await;
  let child = person(&s, "Yolanda", 1930, None).await;
  let (edge, _) = family(&s, &parent, &child).await;

  let maintenance = Maintenance::new(&s);
  let dry = maintenance
    .sync_family_dates(&MaintenanceContext::dry_run())
    .await
    .unwrap();
  assert!(dry.issues_found() > 0);
  assert_eq!(dry.fixed, 0);

  let carrier = carrier_of(&s, &edge).await;
  assert_eq!(carrier.start, None, "dry run must not write");

  // The same run with apply finds the same issues and fixes them.
  let wet = maintenance
    .sync_family_dates(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert_eq!(wet.issues_found(), dry.issues_found());
  assert_eq!(wet.fixed, 1);
}

#[tokio::test]
async fn ambiguous_direction_is_reported_not_repaired() {
  let s = store().await;
  let a = person(&s, "Twin A", 1950, None).await;
  let b = person(&s, "Twin B", 1950, None).await;
  let (edge, _) = family(&s, &a, &b).await;

  let report = Maintenance::new(&s)
    .sync_family_dates(&MaintenanceContext::apply())
    .await
    .unwrap();

  assert!(report.issues.iter().any(|issue| matches!(
    issue,
    Issue::AmbiguousDirection { connection_id } if *connection_id == edge.connection_id
  )));
  assert_eq!(report.fixed, 0);

  let carrier = carrier_of(&s, &edge).await;
  assert_eq!(carrier.start, None);
  assert_eq!(carrier.end, None);
}

#[tokio::test]
async fn cancelled_run_scans_but_writes_nothing() {
  let s = store().await;
  let parent = person(&s, "Xavier", 1900, Some(1980)).await;
  let child = person(&s, "Yolanda", 1930, None).await;
  family(&s, &parent, &child).await;

  let ctx = MaintenanceContext::apply();
  ctx.cancel.cancel();

  let report = Maintenance::new(&s)
    .sync_family_dates(&ctx)
    .await
    .unwrap();
  assert!(report.issues_found() > 0, "scan still runs");
  assert_eq!(report.fixed, 0, "cancellation stops before the first batch");
}

// ─── Dedupe ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dedupe_keeps_most_connected_span_and_repoints_edges() {
  let s = store().await;
  let sparse = person(&s, "Ada Lovelace", 1815, None).await;
  let busy = person(&s, "ada lovelace", 1815, None).await;

  let friend = person(&s, "Friend", 1820, None).await;
  let colleague = person(&s, "Colleague", 1821, None).await;
  family(&s, &sparse, &friend).await;
  family(&s, &sparse, &colleague).await;
  for i in 0..5 {
    let other = person(&s, &format!("Relative {i}"), 1840 + i, None).await;
    family(&s, &busy, &other).await;
  }

  let report = Maintenance::new(&s)
    .cleanup_duplicate_spans(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert_eq!(report.fixed, 1, "one span merged away");
  assert!(report.issues.iter().any(|issue| matches!(
    issue,
    Issue::DuplicateSpan { survivor, duplicates, .. }
      if *survivor == busy.span_id && duplicates == &[sparse.span_id]
  )));

  assert!(s.find_span(sparse.span_id).await.unwrap().is_none());

  // The sparse span's edges now hang off the survivor: no edge lost, no
  // duplicate created.
  let edges = s
    .connections_touching(busy.span_id, arbor_core::span::AccessScope::Unrestricted)
    .await
    .unwrap();
  assert!((5..=7).contains(&edges.len()), "edge count {}", edges.len());
  assert!(edges.iter().any(|e| e.object_id == friend.span_id));
}

#[tokio::test]
async fn dedupe_drops_edges_that_collapse_into_duplicates() {
  let s = store().await;
  let first = person(&s, "Ada", 1815, None).await;
  let second = person(&s, "Ada", 1815, None).await;
  let child = person(&s, "Child", 1840, None).await;

  // Both copies parent the same child; the merge keeps only one edge. Also
  // an edge between the copies, which becomes a self-loop.
  family(&s, &first, &child).await;
  family(&s, &second, &child).await;
  family(&s, &first, &second).await;

  let report = Maintenance::new(&s)
    .cleanup_duplicate_spans(&MaintenanceContext::apply())
    .await
    .unwrap();

  let dropped = report
    .issues
    .iter()
    .filter(|issue| matches!(issue, Issue::DuplicateEdge { .. }))
    .count();
  assert_eq!(dropped, 2, "one collapsed duplicate, one self-loop");

  let survivors = s
    .list_spans(SpanFilter { name: Some("Ada".into()), ..SpanFilter::default() })
    .await
    .unwrap();
  assert_eq!(survivors.len(), 1);
  let edges = s
    .connections_touching(
      survivors[0].span_id,
      arbor_core::span::AccessScope::Unrestricted,
    )
    .await
    .unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!(edges[0].object_id, child.span_id);
}

// ─── Orphans ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn orphan_cleanup_converges() {
  let s = store().await;
  let a = person(&s, "A", 1900, None).await;
  let b = person(&s, "B", 1930, None).await;
  let (edge, _) = family(&s, &a, &b).await;

  // Deleting an endpoint leaves the edge dangling; deleting a carrier
  // directly leaves the edge without dates.
  let mut batch = WriteBatch::new();
  batch.push(WriteOp::DeleteSpan(b.span_id));
  s.apply(batch).await.unwrap();

  let maintenance = Maintenance::new(&s);
  let first = maintenance
    .cleanup_orphaned_connections(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert!(first.issues.iter().any(|issue| matches!(
    issue,
    Issue::DanglingReference { connection_id, .. }
      if *connection_id == edge.connection_id
  )));
  assert_eq!(first.fixed, 1);

  // The edge and its carrier are both gone; a second run finds nothing.
  assert!(s.find_connection(edge.connection_id).await.unwrap().is_none());
  assert!(s.find_span(edge.connection_span_id).await.unwrap().is_none());

  let second = maintenance
    .cleanup_orphaned_connections(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert_eq!(second.issues_found(), 0);
  assert_eq!(second.fixed, 0);
}

#[tokio::test]
async fn orphaned_carrier_span_is_removed() {
  let s = store().await;

  // A connection-kind span that no edge references.
  let stray = s
    .create_span(NewSpan::new(SpanKind::Connection, "stray carrier"))
    .await
    .unwrap();

  let report = Maintenance::new(&s)
    .cleanup_orphaned_connections(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert!(report.issues.iter().any(|issue| matches!(
    issue,
    Issue::OrphanedConnectionSpan { span_id } if *span_id == stray.span_id
  )));
  assert!(s.find_span(stray.span_id).await.unwrap().is_none());
}

#[tokio::test]
async fn miswired_carrier_does_not_take_entity_down() {
  let s = store().await;
  let a = person(&s, "A", 1900, None).await;
  let b = person(&s, "B", 1930, None).await;
  let bystander = person(&s, "Bystander", 1950, None).await;
  let (edge, _) = family(&s, &a, &b).await;

  // Re-point the edge's carrier reference at a person span.
  let mut batch = WriteBatch::new();
  batch.push(WriteOp::UpsertConnection(Connection {
    connection_span_id: bystander.span_id,
    ..edge.clone()
  }));
  s.apply(batch).await.unwrap();

  let report = Maintenance::new(&s)
    .cleanup_orphaned_connections(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert!(report.issues.iter().any(|issue| matches!(
    issue,
    Issue::TypeMismatch { connection_id, .. } if *connection_id == edge.connection_id
  )));

  assert!(s.find_connection(edge.connection_id).await.unwrap().is_none());
  assert!(
    s.find_span(bystander.span_id).await.unwrap().is_some(),
    "the person wrongly referenced as carrier must survive"
  );
}

// ─── Access cascade ──────────────────────────────────────────────────────────

#[tokio::test]
async fn cascade_publishes_private_neighbors_and_is_idempotent() {
  let s = store().await;
  let owner = uuid::Uuid::new_v4();
  let public = person(&s, "Public", 1900, None).await;
  let private = s
    .create_span(NewSpan::new(SpanKind::Person, "Private").private(owner))
    .await
    .unwrap();
  let (edge, _) = family(&s, &public, &private).await;

  let maintenance = Maintenance::new(&s);
  let first = maintenance
    .cascade_public_spans(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert!(first.issues.iter().any(|issue| matches!(
    issue,
    Issue::PrivateNeighbor { span_id, .. } if *span_id == private.span_id
  )));
  assert!(first.fixed >= 1);

  let republished = s.find_span(private.span_id).await.unwrap().unwrap();
  assert_eq!(republished.access, AccessLevel::Public);
  let carrier = carrier_of(&s, &edge).await;
  assert_eq!(carrier.access, AccessLevel::Public);

  let second = maintenance
    .cascade_public_spans(&MaintenanceContext::apply())
    .await
    .unwrap();
  assert_eq!(second.issues_found(), 0);
  assert_eq!(second.fixed, 0);
}
