//! The `GraphStore` trait and supporting query/write types.
//!
//! Implemented by storage backends (e.g. `arbor-store-sqlite`). The inference
//! and maintenance engines depend on this abstraction, not on any concrete
//! backend.
//!
//! The store offers no cross-call transactions. Callers that need atomicity
//! collect their writes into a [`WriteBatch`] and submit it through
//! [`GraphStore::apply`], which commits all ops or none.

use std::future::Future;

use uuid::Uuid;

use crate::{
  connection::{Connection, ConnectionKind, NewConnection},
  date::FuzzyDate,
  span::{AccessLevel, AccessScope, NewSpan, Span, SpanKind},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`GraphStore::list_spans`].
#[derive(Debug, Clone, Default)]
pub struct SpanFilter {
  pub kind:   Option<SpanKind>,
  /// Exact name match, case-insensitive.
  pub name:   Option<String>,
  pub access: Option<AccessLevel>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl SpanFilter {
  pub fn kind(kind: SpanKind) -> Self {
    Self { kind: Some(kind), ..Self::default() }
  }
}

// ─── Write batch ─────────────────────────────────────────────────────────────

/// A single mutation. Deleting a connection also deletes its carrier span in
/// the same transaction (lock-step lifecycle); deleting a span deletes only
/// the span row — dangling edges are the maintenance engine's concern.
#[derive(Debug, Clone)]
pub enum WriteOp {
  /// Insert or replace an edge by `connection_id`. Used by duplicate-span
  /// merge to re-point edges.
  UpsertConnection(Connection),
  DeleteConnection(Uuid),
  DeleteSpan(Uuid),
  SetSpanDates {
    span_id: Uuid,
    start:   Option<FuzzyDate>,
    end:     Option<FuzzyDate>,
  },
  SetAccessLevel {
    span_id: Uuid,
    access:  AccessLevel,
  },
}

/// An ordered set of writes applied in one transaction: all commit or none,
/// and the transaction is released on every exit path.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
  pub ops: Vec<WriteOp>,
}

impl WriteBatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, op: WriteOp) {
    self.ops.push(op);
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Arbor graph store backend.
///
/// Every read takes an [`AccessScope`]; a connection is visible only when
/// both of its endpoint spans are visible under the scope. Maintenance
/// operations pass [`AccessScope::Unrestricted`].
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait GraphStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Spans ─────────────────────────────────────────────────────────────

  /// Create and persist a span; id and `created_at` are store-assigned.
  fn create_span(
    &self,
    input: NewSpan,
  ) -> impl Future<Output = Result<Span, Self::Error>> + Send + '_;

  /// Retrieve a span by id, unfiltered. Returns `None` if not found.
  fn find_span(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Span>, Self::Error>> + Send + '_;

  /// List spans matching `filter`.
  fn list_spans(
    &self,
    filter: SpanFilter,
  ) -> impl Future<Output = Result<Vec<Span>, Self::Error>> + Send + '_;

  // ── Connections ───────────────────────────────────────────────────────

  /// Create an edge together with its carrier span, atomically. The carrier
  /// span takes the edge's dates and access level and is named after the
  /// endpoints. Errors if either endpoint does not exist.
  fn create_connection(
    &self,
    input: NewConnection,
  ) -> impl Future<Output = Result<(Connection, Span), Self::Error>> + Send + '_;

  /// Retrieve a connection by id, unfiltered.
  fn find_connection(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// The connection owning `connection_span_id`, if any. Used by orphan
  /// cleanup to find carrier spans whose edge is gone.
  fn find_connection_by_span(
    &self,
    connection_span_id: Uuid,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// Edges whose subject is `span_id`, optionally restricted by kind,
  /// access-filtered by `scope`.
  fn connections_where_subject(
    &self,
    span_id: Uuid,
    kind: Option<ConnectionKind>,
    scope: AccessScope,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  /// Edges whose object is `span_id`.
  fn connections_where_object(
    &self,
    span_id: Uuid,
    kind: Option<ConnectionKind>,
    scope: AccessScope,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  /// Edges touching `span_id` in either direction.
  fn connections_touching(
    &self,
    span_id: Uuid,
    scope: AccessScope,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  /// List connections, optionally by kind, for maintenance scans.
  fn list_connections(
    &self,
    kind: Option<ConnectionKind>,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Apply a batch of writes in a single transaction.
  fn apply(
    &self,
    batch: WriteBatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
