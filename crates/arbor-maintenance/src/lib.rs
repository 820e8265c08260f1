//! Consistency checking and repair for the Arbor temporal graph.
//!
//! Every operation runs against any [`arbor_core::store::GraphStore`] with
//! [`AccessScope::Unrestricted`](arbor_core::span::AccessScope) and follows
//! the same contract: scan the graph, collect [`Issue`]s into a
//! [`MaintenanceReport`], and — only when the
//! [`MaintenanceContext`](arbor_core::context::MaintenanceContext) says
//! `apply` — write the repairs back in bounded transactional batches. Dry
//! run is the default; a dry run produces the same issues with `fixed = 0`.

mod cascade;
mod dates;
mod dedupe;
mod orphans;
pub mod report;
mod runner;

pub use dates::{FamilyDirection, infer_family_direction};
pub use report::{DateField, EdgeRole, Issue, MaintenanceReport};

use arbor_core::{context::MaintenanceContext, store::GraphStore};

/// The maintenance engine: five scan/repair operations over one store.
pub struct Maintenance<'a, S: GraphStore> {
  store: &'a S,
}

impl<'a, S: GraphStore> Maintenance<'a, S> {
  pub fn new(store: &'a S) -> Self {
    Self { store }
  }

  /// Flag (and in fix mode cap) family/relationship edges whose end date is
  /// missing or later than the last surviving endpoint's death.
  pub async fn check_family_dates(
    &self,
    ctx: &MaintenanceContext,
  ) -> Result<MaintenanceReport, S::Error> {
    dates::check_family_dates(self.store, ctx).await
  }

  /// Propose (and in fix mode write) carrier dates derived from endpoint
  /// lifetimes: birth-anchored starts, death-anchored ends.
  pub async fn sync_family_dates(
    &self,
    ctx: &MaintenanceContext,
  ) -> Result<MaintenanceReport, S::Error> {
    dates::sync_family_dates(self.store, ctx).await
  }

  /// Merge spans sharing a kind and case-insensitive name, re-pointing edges
  /// onto the survivor. One transaction per duplicate group.
  pub async fn cleanup_duplicate_spans(
    &self,
    ctx: &MaintenanceContext,
  ) -> Result<MaintenanceReport, S::Error> {
    dedupe::dedupe_spans(self.store, ctx).await
  }

  /// Remove edges with missing endpoints or a missing/miswired carrier, and
  /// carrier spans no edge claims. Converges over repeated runs.
  pub async fn cleanup_orphaned_connections(
    &self,
    ctx: &MaintenanceContext,
  ) -> Result<MaintenanceReport, S::Error> {
    orphans::clean_orphans(self.store, ctx).await
  }

  /// Publish private spans (and carriers) one hop from a public span.
  /// Idempotent; never narrows access.
  pub async fn cascade_public_spans(
    &self,
    ctx: &MaintenanceContext,
  ) -> Result<MaintenanceReport, S::Error> {
    cascade::cascade_access(self.store, ctx).await
  }
}

#[cfg(test)]
mod tests;
