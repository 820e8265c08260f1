//! Period-activity aggregation: how many of a span's connections were active
//! in each yearly bucket.
//!
//! Uses [`TemporalRange::overlaps`] with a horizon policy so open-ended facts
//! count as "ongoing" rather than flooding the far future.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use arbor_core::{
  date::FuzzyDate,
  overlap::{OpenEndPolicy, TemporalRange},
  span::{AccessScope, SpanKind},
  store::GraphStore,
};

use crate::{Result, error::Error};

/// Connection count for one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityBucket {
  pub year:   i32,
  pub active: usize,
}

/// An open end means "ongoing"; cap it this many years past today so the
/// buckets stay meaningful.
const OPEN_END_YEARS: i32 = 100;

fn default_horizon() -> NaiveDate {
  let today = Utc::now().date_naive();
  NaiveDate::from_ymd_opt(today.year() + OPEN_END_YEARS, 1, 1)
    .unwrap_or(NaiveDate::MAX)
}

/// Count the connections touching `span_id` that were active in each year of
/// `from_year..=to_year`.
///
/// A connection's activity window is its carrier span's date range; edges
/// with a missing or mistyped carrier are skipped (maintenance reports
/// those).
pub async fn activity_by_year<S: GraphStore>(
  store: &S,
  span_id: Uuid,
  scope: AccessScope,
  from_year: i32,
  to_year: i32,
) -> Result<Vec<ActivityBucket>, S::Error> {
  let policy = OpenEndPolicy::Horizon(default_horizon());
  let edges = store
    .connections_touching(span_id, scope)
    .await
    .map_err(Error::Store)?;

  let mut windows: Vec<TemporalRange> = Vec::with_capacity(edges.len());
  for edge in &edges {
    match store
      .find_span(edge.connection_span_id)
      .await
      .map_err(Error::Store)?
    {
      Some(carrier) if carrier.kind == SpanKind::Connection => {
        windows.push(carrier.range());
      }
      _ => tracing::debug!(
        connection = %edge.connection_id,
        "connection has no usable carrier span; skipping in activity counts"
      ),
    }
  }

  let mut buckets = Vec::new();
  for year in from_year..=to_year {
    let bucket = TemporalRange::new(
      Some(FuzzyDate::year(year)),
      Some(FuzzyDate::year(year)),
    );
    let active = windows.iter().filter(|w| w.overlaps(&bucket, policy)).count();
    buckets.push(ActivityBucket { year, active });
  }
  Ok(buckets)
}
