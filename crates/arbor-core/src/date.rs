//! Fuzzy dates — calendar dates with optional month and day components and an
//! explicit precision level.
//!
//! Historical records rarely come with full dates. A fuzzy date knows exactly
//! which components it carries and refuses to invent the rest: comparison uses
//! only the fields both sides specify, and a concrete [`chrono::NaiveDate`] is
//! produced only when the caller names a bound.
//!
//! # Bound policy
//!
//! One policy, applied uniformly everywhere:
//!
//! - *Ordering* (sort keys, min/max selection) resolves a partial date to its
//!   **lower bound** — January 1st / the 1st of the month.
//! - *Overlap* (see [`crate::overlap`]) expands a partial date to the full
//!   interval it names — the whole year or the whole month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Precision ───────────────────────────────────────────────────────────────

/// How much of a [`FuzzyDate`] is actually known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
  Year,
  Month,
  Day,
}

/// Which end of a partial date's interval to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
  /// January 1st / first of the month.
  Lower,
  /// December 31st / last day of the month.
  Upper,
}

/// The outcome of comparing two fuzzy dates over their common fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrdering {
  Before,
  After,
  Equal,
  /// The common fields agree but the precisions differ, or a field needed for
  /// the comparison is unknown on either side.
  Indeterminate,
}

// ─── FuzzyDate ───────────────────────────────────────────────────────────────

/// A date with optional year, month, and day.
///
/// A month requires a year and a day requires a month; the constructors
/// enforce this, so a populated field set is always a prefix of (year, month,
/// day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyDate {
  pub year:  Option<i32>,
  pub month: Option<u32>,
  pub day:   Option<u32>,
}

impl FuzzyDate {
  /// A date known only to the year.
  pub fn year(year: i32) -> Self {
    Self { year: Some(year), month: None, day: None }
  }

  /// A date known to the month. Errors if `month` is not 1–12.
  pub fn year_month(year: i32, month: u32) -> Result<Self> {
    if !(1..=12).contains(&month) {
      return Err(Error::InvalidDate(format!("month out of range: {month}")));
    }
    Ok(Self { year: Some(year), month: Some(month), day: None })
  }

  /// A fully-specified calendar date. Errors if the day does not exist in the
  /// named month (including leap-year handling).
  pub fn ymd(year: i32, month: u32, day: u32) -> Result<Self> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
      Error::InvalidDate(format!("no such date: {year:04}-{month:02}-{day:02}"))
    })?;
    Ok(Self { year: Some(year), month: Some(month), day: Some(day) })
  }

  pub fn from_naive(date: NaiveDate) -> Self {
    Self {
      year:  Some(date.year()),
      month: Some(date.month()),
      day:   Some(date.day()),
    }
  }

  /// The most specific populated component.
  pub fn precision(&self) -> DatePrecision {
    match (self.month, self.day) {
      (_, Some(_)) => DatePrecision::Day,
      (Some(_), None) => DatePrecision::Month,
      (None, _) => DatePrecision::Year,
    }
  }

  // ── Comparison ─────────────────────────────────────────────────────────

  /// Compare using only the fields both sides specify.
  ///
  /// Two year-only dates compare by year alone. When every common field is
  /// equal but the precisions differ (e.g. `1950` vs `1950-06-01`), the
  /// result is [`DateOrdering::Indeterminate`] — one side names an interval,
  /// not a point. Callers that need a total order resolve through
  /// [`FuzzyDate::sort_key`].
  pub fn compare(&self, other: &FuzzyDate) -> DateOrdering {
    let (ya, yb) = match (self.year, other.year) {
      (Some(a), Some(b)) => (a, b),
      _ => return DateOrdering::Indeterminate,
    };
    if ya != yb {
      return if ya < yb { DateOrdering::Before } else { DateOrdering::After };
    }

    match (self.month, other.month) {
      (Some(ma), Some(mb)) if ma != mb => {
        return if ma < mb { DateOrdering::Before } else { DateOrdering::After };
      }
      (Some(_), Some(_)) => {}
      (None, None) => return DateOrdering::Equal,
      _ => return DateOrdering::Indeterminate,
    }

    match (self.day, other.day) {
      (Some(da), Some(db)) if da != db => {
        if da < db { DateOrdering::Before } else { DateOrdering::After }
      }
      (Some(_), Some(_)) => DateOrdering::Equal,
      (None, None) => DateOrdering::Equal,
      _ => DateOrdering::Indeterminate,
    }
  }

  /// Resolve to a concrete calendar date at the named bound.
  ///
  /// Returns `None` when the year is unknown — there is no meaningful
  /// concrete date to give.
  pub fn to_approximate_date(&self, bound: DateBound) -> Option<NaiveDate> {
    let year = self.year?;
    let month = self.month.unwrap_or(match bound {
      DateBound::Lower => 1,
      DateBound::Upper => 12,
    });
    let day = self.day.unwrap_or(match bound {
      DateBound::Lower => 1,
      DateBound::Upper => days_in_month(year, month),
    });
    // A stored day can be invalid for its month (bad data); clamp rather
    // than lose the date entirely.
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
  }

  /// The lower-bound concrete date; the ordering key under the documented
  /// bound policy.
  pub fn sort_key(&self) -> Option<NaiveDate> {
    self.to_approximate_date(DateBound::Lower)
  }

  // ── Arithmetic ─────────────────────────────────────────────────────────

  /// Shift by whole years, preserving precision. Feb 29 clamps to Feb 28 in
  /// non-leap target years.
  pub fn add_years(&self, years: i32) -> FuzzyDate {
    let Some(year) = self.year else { return *self };
    let year = year + years;
    let day = match (self.month, self.day) {
      (Some(m), Some(d)) => Some(d.min(days_in_month(year, m))),
      (_, d) => d,
    };
    FuzzyDate { year: Some(year), month: self.month, day }
  }

  /// Shift by whole months with carry into the year, preserving precision.
  /// Requires at least month precision; a year-only date is returned
  /// unchanged.
  pub fn add_months(&self, months: i32) -> FuzzyDate {
    let (Some(year), Some(month)) = (self.year, self.month) else {
      return *self;
    };
    let total = (year as i64) * 12 + (month as i64 - 1) + months as i64;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = self.day.map(|d| d.min(days_in_month(year, month)));
    FuzzyDate { year: Some(year), month: Some(month), day }
  }

  /// Shift by days. Errors unless the date has day precision — there is no
  /// honest answer for "1950 plus 10 days".
  pub fn add_days(&self, days: i64) -> Result<FuzzyDate> {
    let concrete = match self.precision() {
      DatePrecision::Day => self
        .to_approximate_date(DateBound::Lower)
        .ok_or_else(|| Error::InvalidDate("year is unknown".into()))?,
      _ => {
        return Err(Error::InvalidDate(
          "add_days requires a fully-specified date".into(),
        ));
      }
    };
    let shifted = concrete
      .checked_add_signed(chrono::Duration::days(days))
      .ok_or_else(|| Error::InvalidDate("date arithmetic overflow".into()))?;
    Ok(FuzzyDate::from_naive(shifted))
  }
}

impl std::fmt::Display for FuzzyDate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (self.year, self.month, self.day) {
      (Some(y), Some(m), Some(d)) => write!(f, "{y:04}-{m:02}-{d:02}"),
      (Some(y), Some(m), None) => write!(f, "{y:04}-{m:02}"),
      (Some(y), None, _) => write!(f, "{y:04}"),
      (None, _, _) => write!(f, "unknown"),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Number of days in a month, leap-year aware.
fn days_in_month(year: i32, month: u32) -> u32 {
  match month {
    1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
    4 | 6 | 9 | 11 => 30,
    2 => {
      if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 29 } else { 28 }
    }
    _ => 31,
  }
}

/// The later of two optional dates under lower-bound ordering; `None` inputs
/// are ignored.
pub fn later_of(a: Option<FuzzyDate>, b: Option<FuzzyDate>) -> Option<FuzzyDate> {
  match (a, b) {
    (Some(a), Some(b)) => match (a.sort_key(), b.sort_key()) {
      (Some(ka), Some(kb)) => Some(if ka >= kb { a } else { b }),
      (Some(_), None) => Some(a),
      _ => Some(b),
    },
    (Some(a), None) => Some(a),
    (None, b) => b,
  }
}

/// The earlier of two optional dates under lower-bound ordering; `None`
/// inputs are ignored.
pub fn earlier_of(a: Option<FuzzyDate>, b: Option<FuzzyDate>) -> Option<FuzzyDate> {
  match (a, b) {
    (Some(a), Some(b)) => match (a.sort_key(), b.sort_key()) {
      (Some(ka), Some(kb)) => Some(if ka <= kb { a } else { b }),
      (Some(_), None) => Some(a),
      _ => Some(b),
    },
    (Some(a), None) => Some(a),
    (None, b) => b,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn year_only_dates_compare_by_year() {
    let a = FuzzyDate::year(1950);
    let b = FuzzyDate::year(1960);
    assert_eq!(a.compare(&b), DateOrdering::Before);
    assert_eq!(b.compare(&a), DateOrdering::After);
    assert_eq!(a.compare(&FuzzyDate::year(1950)), DateOrdering::Equal);
  }

  #[test]
  fn mixed_precision_same_year_is_indeterminate() {
    let year_only = FuzzyDate::year(1950);
    let full = FuzzyDate::ymd(1950, 6, 1).unwrap();
    assert_eq!(year_only.compare(&full), DateOrdering::Indeterminate);
    assert_eq!(full.compare(&year_only), DateOrdering::Indeterminate);
  }

  #[test]
  fn mixed_precision_different_years_still_orders() {
    let year_only = FuzzyDate::year(1950);
    let full = FuzzyDate::ymd(1960, 1, 1).unwrap();
    assert_eq!(year_only.compare(&full), DateOrdering::Before);
  }

  #[test]
  fn unknown_year_is_indeterminate() {
    let unknown = FuzzyDate { year: None, month: None, day: None };
    assert_eq!(unknown.compare(&FuzzyDate::year(1950)), DateOrdering::Indeterminate);
  }

  #[test]
  fn approximate_bounds_expand_partial_dates() {
    let d = FuzzyDate::year(1950);
    assert_eq!(
      d.to_approximate_date(DateBound::Lower),
      NaiveDate::from_ymd_opt(1950, 1, 1)
    );
    assert_eq!(
      d.to_approximate_date(DateBound::Upper),
      NaiveDate::from_ymd_opt(1950, 12, 31)
    );

    let m = FuzzyDate::year_month(1950, 2).unwrap();
    assert_eq!(
      m.to_approximate_date(DateBound::Upper),
      NaiveDate::from_ymd_opt(1950, 2, 28)
    );
  }

  #[test]
  fn leap_february_upper_bound() {
    let m = FuzzyDate::year_month(2000, 2).unwrap();
    assert_eq!(
      m.to_approximate_date(DateBound::Upper),
      NaiveDate::from_ymd_opt(2000, 2, 29)
    );
  }

  #[test]
  fn invalid_constructors_rejected() {
    assert!(FuzzyDate::year_month(1950, 13).is_err());
    assert!(FuzzyDate::ymd(1950, 2, 30).is_err());
    assert!(FuzzyDate::ymd(1901, 2, 29).is_err());
  }

  #[test]
  fn add_years_preserves_precision_and_clamps_leap_day() {
    let y = FuzzyDate::year(1950).add_years(5);
    assert_eq!(y, FuzzyDate::year(1955));

    let leap = FuzzyDate::ymd(2000, 2, 29).unwrap().add_years(1);
    assert_eq!(leap, FuzzyDate::ymd(2001, 2, 28).unwrap());
  }

  #[test]
  fn add_months_carries_across_years() {
    let d = FuzzyDate::year_month(1950, 11).unwrap().add_months(3);
    assert_eq!(d, FuzzyDate::year_month(1951, 2).unwrap());

    let back = FuzzyDate::year_month(1950, 1).unwrap().add_months(-1);
    assert_eq!(back, FuzzyDate::year_month(1949, 12).unwrap());
  }

  #[test]
  fn add_days_requires_day_precision() {
    assert!(FuzzyDate::year(1950).add_days(10).is_err());
    let d = FuzzyDate::ymd(1950, 12, 30).unwrap().add_days(5).unwrap();
    assert_eq!(d, FuzzyDate::ymd(1951, 1, 4).unwrap());
  }

  #[test]
  fn later_and_earlier_of() {
    let a = FuzzyDate::year(1980);
    let b = FuzzyDate::year(2000);
    assert_eq!(later_of(Some(a), Some(b)), Some(b));
    assert_eq!(earlier_of(Some(a), Some(b)), Some(a));
    assert_eq!(later_of(None, Some(a)), Some(a));
    assert_eq!(earlier_of(Some(a), None), Some(a));
    assert_eq!(later_of(None, None), None);
  }
}
