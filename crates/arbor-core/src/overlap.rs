//! Temporal ranges and open-ended overlap.
//!
//! A range is a pair of optional [`FuzzyDate`]s. A missing start means
//! "since forever"; a missing end means "ongoing" — and what "ongoing"
//! resolves to is the caller's explicit choice via [`OpenEndPolicy`], never a
//! silent default.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::{DateBound, FuzzyDate};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// What a missing end date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenEndPolicy {
  /// Positive infinity — consistency checks use this.
  Unbounded,
  /// A concrete far-future cutoff (e.g. now + 100 years) so open-ended facts
  /// do not flood far-future activity buckets.
  Horizon(NaiveDate),
}

// ─── TemporalRange ───────────────────────────────────────────────────────────

/// A possibly open-ended span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRange {
  pub start: Option<FuzzyDate>,
  pub end:   Option<FuzzyDate>,
}

impl TemporalRange {
  pub fn new(start: Option<FuzzyDate>, end: Option<FuzzyDate>) -> Self {
    Self { start, end }
  }

  /// The concrete lower edge; `None` is negative infinity. A start date with
  /// an unknown year also resolves to negative infinity.
  fn lower(&self) -> Option<NaiveDate> {
    self.start.and_then(|d| d.to_approximate_date(DateBound::Lower))
  }

  /// The concrete upper edge under `policy`; `None` is positive infinity.
  fn upper(&self, policy: OpenEndPolicy) -> Option<NaiveDate> {
    match self.end.and_then(|d| d.to_approximate_date(DateBound::Upper)) {
      Some(date) => Some(date),
      None => match policy {
        OpenEndPolicy::Unbounded => None,
        OpenEndPolicy::Horizon(cutoff) => Some(cutoff),
      },
    }
  }

  /// Whether two ranges share at least one day.
  ///
  /// Partial dates expand to the full interval they name, so a year-only
  /// range `(1990, 1990)` overlaps anything touching that calendar year.
  pub fn overlaps(&self, other: &TemporalRange, policy: OpenEndPolicy) -> bool {
    let a_starts_before_b_ends = match (self.lower(), other.upper(policy)) {
      (Some(a), Some(b)) => a <= b,
      _ => true, // an infinite edge can't exclude overlap on this side
    };
    let b_starts_before_a_ends = match (other.lower(), self.upper(policy)) {
      (Some(b), Some(a)) => b <= a,
      _ => true,
    };
    a_starts_before_b_ends && b_starts_before_a_ends
  }

  /// Whether `date` falls inside the range.
  pub fn contains_date(&self, date: NaiveDate, policy: OpenEndPolicy) -> bool {
    let after_start = self.lower().is_none_or(|lo| lo <= date);
    let before_end = self.upper(policy).is_none_or(|hi| date <= hi);
    after_start && before_end
  }

  /// A range whose end resolves before its start — a data error the
  /// maintenance engine reports as a temporal inconsistency.
  pub fn end_before_start(&self) -> bool {
    match (self.lower(), self.end.and_then(|d| d.to_approximate_date(DateBound::Upper))) {
      (Some(lo), Some(hi)) => hi < lo,
      _ => false,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn range(start: Option<i32>, end: Option<i32>) -> TemporalRange {
    TemporalRange::new(start.map(FuzzyDate::year), end.map(FuzzyDate::year))
  }

  #[test]
  fn open_start_overlaps_open_end() {
    // (1990, ∞) vs (-∞, 1995)
    assert!(range(Some(1990), None)
      .overlaps(&range(None, Some(1995)), OpenEndPolicy::Unbounded));
  }

  #[test]
  fn disjoint_open_ranges_do_not_overlap() {
    // (2000, ∞) vs (-∞, 1995)
    assert!(!range(Some(2000), None)
      .overlaps(&range(None, Some(1995)), OpenEndPolicy::Unbounded));
  }

  #[test]
  fn fully_open_range_overlaps_everything() {
    assert!(range(None, None)
      .overlaps(&range(Some(1900), Some(1905)), OpenEndPolicy::Unbounded));
  }

  #[test]
  fn year_precision_ranges_touch_on_shared_year() {
    // (…-1990) and (1990-…) share the whole of 1990.
    assert!(range(Some(1980), Some(1990))
      .overlaps(&range(Some(1990), Some(2000)), OpenEndPolicy::Unbounded));
  }

  #[test]
  fn horizon_caps_open_ends() {
    let horizon = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
    let ongoing = range(Some(1990), None);
    let far_future = range(Some(2200), Some(2300));
    assert!(!ongoing.overlaps(&far_future, OpenEndPolicy::Horizon(horizon)));
    assert!(ongoing.overlaps(&far_future, OpenEndPolicy::Unbounded));
  }

  #[test]
  fn contains_date_respects_bounds() {
    let r = range(Some(1950), Some(1960));
    let inside = NaiveDate::from_ymd_opt(1955, 6, 1).unwrap();
    let outside = NaiveDate::from_ymd_opt(1961, 1, 1).unwrap();
    assert!(r.contains_date(inside, OpenEndPolicy::Unbounded));
    assert!(!r.contains_date(outside, OpenEndPolicy::Unbounded));
  }

  #[test]
  fn end_before_start_detected() {
    assert!(range(Some(1990), Some(1980)).end_before_start());
    assert!(!range(Some(1980), Some(1990)).end_before_start());
    assert!(!range(None, Some(1980)).end_before_start());
    // Same year at different precisions is not an inversion: the year-only
    // end expands to Dec 31.
    assert!(!range(Some(1980), Some(1980)).end_before_start());
  }
}
