//! Core data models for the AGCD analyzer
//!
//! Defines the dense daily series, the lookback windows, sites with their two
//! seed-collection dates, and the inclusive date ranges used throughout the
//! analysis.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::LOOKBACK_YEARS;
use crate::{Error, Result};

// =============================================================================
// Daily Series
// =============================================================================

/// One day of site-level meteorology.
///
/// `precip` is `None` on days at or below the no-rain threshold; every
/// precipitation statistic downstream treats those days as carrying no value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Daily minimum temperature [degC]
    pub tmin: f64,
    /// Daily maximum temperature [degC]
    pub tmax: f64,
    /// Daily midpoint temperature, median of tmin and tmax [degC]
    pub tmid: f64,
    /// 3pm vapour pressure deficit [kPa]
    pub vpd: f64,
    /// Daily precipitation [mm], absent on no-rain days
    pub precip: Option<f64>,
}

/// A contiguous daily series with O(1) date-to-row lookup.
///
/// Construction validates the contiguity invariant: dates strictly ascending,
/// exactly one record per calendar day, no gaps. Anything else is a malformed
/// input and fails fast.
#[derive(Debug, Clone)]
pub struct DailySeries {
    start: NaiveDate,
    records: Vec<DailyRecord>,
}

impl DailySeries {
    /// Build a series from records, validating the one-record-per-day
    /// contiguity precondition.
    pub fn new(records: Vec<DailyRecord>) -> Result<Self> {
        let Some(first) = records.first() else {
            return Err(Error::malformed_series("series contains no records"));
        };
        let start = first.date;
        for (i, record) in records.iter().enumerate() {
            let expected = start + Days::new(i as u64);
            if record.date != expected {
                return Err(Error::malformed_series(format!(
                    "expected {} at row {}, found {}",
                    expected, i, record.date
                )));
            }
        }
        Ok(Self { start, records })
    }

    /// First date in the series.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date in the series.
    pub fn end(&self) -> NaiveDate {
        self.start + Days::new((self.records.len() - 1) as u64)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Day offset of `date` from the series start.
    ///
    /// Errors when the date falls outside the series coverage.
    pub fn offset_of(&self, date: NaiveDate) -> Result<usize> {
        let days = (date - self.start).num_days();
        if days < 0 || days as usize >= self.records.len() {
            return Err(Error::date_lookup(date));
        }
        Ok(days as usize)
    }

    /// Date at a given day offset. Panics if the offset is out of bounds;
    /// callers derive offsets from `offset_of`.
    pub fn date_at(&self, offset: usize) -> NaiveDate {
        debug_assert!(offset < self.records.len());
        self.start + Days::new(offset as u64)
    }

    /// Record for a date, if covered.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        let days = (date - self.start).num_days();
        if days < 0 {
            return None;
        }
        self.records.get(days as usize)
    }

    /// All records in date order.
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    /// Records inside an inclusive date range.
    ///
    /// Errors when either end of the range falls outside the series.
    pub fn slice(&self, range: &DateRange) -> Result<&[DailyRecord]> {
        let lo = self.offset_of(range.start)?;
        let hi = self.offset_of(range.end)?;
        Ok(&self.records[lo..=hi])
    }
}

// =============================================================================
// Date Ranges and Windows
// =============================================================================

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered, both ends inclusive.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Lookback windows, each right-closed at the day before the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// The single day before the reference date
    Day,
    /// Seven calendar days
    Week,
    /// One calendar month
    Month,
    /// Three calendar months
    Quarter,
    /// Five calendar years
    FiveYears,
}

impl Window {
    /// All windows in ascending length order.
    pub const ALL: [Window; 5] = [
        Window::Day,
        Window::Week,
        Window::Month,
        Window::Quarter,
        Window::FiveYears,
    ];

    /// Human label used in output column names.
    pub fn label(&self) -> &'static str {
        match self {
            Window::Day => "day",
            Window::Week => "week",
            Window::Month => "month",
            Window::Quarter => "3 months",
            Window::FiveYears => "5 years",
        }
    }

    /// Inclusive date range of this window for a reference date.
    ///
    /// The window always ends the day before the reference date. Month-based
    /// windows use calendar-month arithmetic for the start.
    pub fn range(&self, reference: NaiveDate) -> Result<DateRange> {
        let end = reference
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| Error::date_parsing(format!("cannot step back from {reference}")))?;
        let start = match self {
            Window::Day => end,
            Window::Week => end
                .checked_sub_days(Days::new(6))
                .ok_or_else(|| Error::date_parsing(format!("week window underflow at {end}")))?,
            Window::Month => month_window_start(end, 1)?,
            Window::Quarter => month_window_start(end, 3)?,
            Window::FiveYears => month_window_start(end, 12 * LOOKBACK_YEARS as u32)?,
        };
        Ok(DateRange::new(start, end))
    }

    /// Month-grouped sub-statistics apply to quarter-and-longer windows.
    pub fn has_monthly_stats(&self) -> bool {
        matches!(self, Window::Quarter | Window::FiveYears)
    }
}

fn month_window_start(end: NaiveDate, months: u32) -> Result<NaiveDate> {
    end.checked_sub_months(Months::new(months))
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .ok_or_else(|| Error::date_parsing(format!("{months}-month window underflow at {end}")))
}

/// Split a five-year window into one-year slices, newest first.
///
/// Slice k (1-based) covers `(end − k years, end − (k−1) years]` under
/// calendar-month arithmetic; the oldest slice absorbs the window start so
/// the slices partition the window exactly.
pub fn year_slices(window: &DateRange) -> Result<[DateRange; LOOKBACK_YEARS]> {
    let mut slices = Vec::with_capacity(LOOKBACK_YEARS);
    for k in 1..=LOOKBACK_YEARS as u32 {
        let slice_end = window
            .end
            .checked_sub_months(Months::new(12 * (k - 1)))
            .ok_or_else(|| Error::date_parsing(format!("year slice underflow at {}", window.end)))?;
        let slice_start = if k as usize == LOOKBACK_YEARS {
            window.start
        } else {
            window
                .end
                .checked_sub_months(Months::new(12 * k))
                .and_then(|d| d.checked_add_days(Days::new(1)))
                .ok_or_else(|| {
                    Error::date_parsing(format!("year slice underflow at {}", window.end))
                })?
        };
        slices.push(DateRange::new(slice_start, slice_end));
    }
    slices
        .try_into()
        .map_err(|_| Error::configuration("year slice construction failed"))
}

// =============================================================================
// Sites
// =============================================================================

/// The two seed-collection epochs carried by every site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Epoch {
    Old,
    Modern,
}

impl Epoch {
    pub const ALL: [Epoch; 2] = [Epoch::Old, Epoch::Modern];

    /// Column-name prefix used in output files.
    pub fn label(&self) -> &'static str {
        match self {
            Epoch::Old => "Old",
            Epoch::Modern => "Modern",
        }
    }
}

/// One row of the site list: a species at a coordinate with its old and
/// modern seed-collection dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub species: String,
    pub lat: f64,
    pub lon: f64,
    pub old_collection: NaiveDate,
    pub modern_collection: NaiveDate,
}

impl Site {
    /// The collection (reference) date for an epoch.
    pub fn collection(&self, epoch: Epoch) -> NaiveDate {
        match epoch {
            Epoch::Old => self.old_collection,
            Epoch::Modern => self.modern_collection,
        }
    }

    /// Hashable key identifying the site's coordinate, used to share one
    /// loaded series between co-located sites.
    pub fn coordinate_key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}
