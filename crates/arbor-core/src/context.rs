//! Execution context for maintenance operations.
//!
//! Every engine call receives a context explicitly — there is no process-wide
//! toggle for dry-run mode or batch sizing.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Cooperative cancellation flag, checked between batches only — never
/// mid-batch, so an interrupted run leaves whole batches committed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

// ─── MaintenanceContext ──────────────────────────────────────────────────────

/// Batch size bounds; one batch is one transaction, kept small so rollback is
/// cheap and interruption loses little work.
const MIN_BATCH: usize = 5;
const MAX_BATCH: usize = 500;
const DEFAULT_BATCH: usize = 100;

/// Flags carried into every maintenance call.
#[derive(Debug, Clone)]
pub struct MaintenanceContext {
  /// Scan and report without mutating. The default — mutation is opt-in.
  pub dry_run:    bool,
  /// Cap on the number of records scanned.
  pub limit:      Option<usize>,
  /// Writes per transaction, clamped to 5..=500.
  pub batch_size: usize,
  pub cancel:     CancelFlag,
  /// Suppress side-effectful notifications in surrounding tooling (bulk
  /// imports). The core itself sends none; the flag travels with the
  /// context so collaborators see a consistent setting.
  pub suppress_notifications: bool,
}

impl Default for MaintenanceContext {
  fn default() -> Self {
    Self {
      dry_run: true,
      limit: None,
      batch_size: DEFAULT_BATCH,
      cancel: CancelFlag::new(),
      suppress_notifications: false,
    }
  }
}

impl MaintenanceContext {
  /// A read-only scan context.
  pub fn dry_run() -> Self {
    Self::default()
  }

  /// A mutating context. Still honours `limit` and cancellation.
  pub fn apply() -> Self {
    Self { dry_run: false, ..Self::default() }
  }

  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn with_batch_size(mut self, size: usize) -> Self {
    self.batch_size = size.clamp(MIN_BATCH, MAX_BATCH);
    self
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
