//! Window aggregation
//!
//! Descriptive statistics for the meteorological variables restricted to a
//! lookback window: temperature (tmid/tmin/tmax and the daily amplitude),
//! 3pm VPD, and precipitation. Quarter-and-longer windows additionally carry
//! month-grouped sub-statistics, and the five-year window a per-year
//! precipitation breakdown restricted to the season of the reference date.

use chrono::{Datelike, NaiveDate};

use crate::app::models::{year_slices, DailyRecord, DailySeries, DateRange, Window};
use crate::app::services::{runs, season, stats};
use crate::constants::{LOOKBACK_YEARS, NO_RAIN_THRESHOLD_MM};
use crate::Result;

// =============================================================================
// Result Types
// =============================================================================

/// Conditions on the single day before the reference date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayConditions {
    pub tmid: f64,
    pub tmin: f64,
    pub tmax: f64,
    pub vpd: f64,
    /// Absent on a rainless day
    pub precip: Option<f64>,
}

/// avg/min/max/range/variability for one variable over a window.
///
/// Any field can be absent: variability when the mean is exactly zero, the
/// others when no value qualifies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VariableStats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub variability: Option<f64>,
}

impl VariableStats {
    fn from_values(values: &[Option<f64>]) -> Self {
        Self {
            avg: stats::mean(values),
            min: stats::min(values),
            max: stats::max(values),
            range: stats::range(values),
            variability: stats::variability(values),
        }
    }
}

/// Temperature statistics over a window: each of tmid/tmin/tmax plus the
/// daily amplitude (tmax − tmin).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureStats {
    pub avg_tmid: Option<f64>,
    pub avg_tmin: Option<f64>,
    pub avg_tmax: Option<f64>,
    pub avg_amplitude: Option<f64>,
    pub min_tmid: Option<f64>,
    pub min_tmin: Option<f64>,
    pub min_tmax: Option<f64>,
    pub min_amplitude: Option<f64>,
    pub max_tmid: Option<f64>,
    pub max_tmin: Option<f64>,
    pub max_tmax: Option<f64>,
    pub max_amplitude: Option<f64>,
    pub var_tmid: Option<f64>,
    pub var_tmin: Option<f64>,
    pub var_tmax: Option<f64>,
}

/// Precipitation statistics over a window.
///
/// Rainless days carry no value, so every statistic here already runs over
/// rain-bearing days only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrecipStats {
    pub total: Option<f64>,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub variability: Option<f64>,
}

/// Month-grouped sub-statistics for quarter-and-longer windows: the same
/// families recomputed over per-(month, year) means.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlyStats {
    pub avg_tmid: Option<f64>,
    pub avg_tmin: Option<f64>,
    pub avg_tmax: Option<f64>,
    pub avg_amplitude: Option<f64>,
    pub min_amplitude: Option<f64>,
    pub max_amplitude: Option<f64>,
    pub var_tmid: Option<f64>,
    pub var_tmin: Option<f64>,
    pub var_tmax: Option<f64>,
    pub vpd: VariableStats,
    pub precip: VariableStats,
}

/// Precipitation breakdown for one year slice of the five-year window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearPrecip {
    /// Total over the whole year slice
    pub total: Option<f64>,
    /// Total over the season subset of the slice
    pub season_total: Option<f64>,
    /// Daily minimum over the season subset, rain-bearing days only
    pub season_min: Option<f64>,
    /// Daily maximum over the season subset
    pub season_max: Option<f64>,
}

/// Full summary of one non-day window.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub window: Window,
    pub temperature: TemperatureStats,
    pub vpd: VariableStats,
    pub precip: PrecipStats,
    /// Present for quarter-and-longer windows
    pub monthly: Option<MonthlyStats>,
    /// Longest rainless run, month and quarter windows only
    pub max_rainless_days: Option<usize>,
    /// Per-year precipitation, five-year window only, newest slice first
    pub yearly_precip: Option<[YearPrecip; LOOKBACK_YEARS]>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Conditions on the day before the reference date.
pub fn day_conditions(series: &DailySeries, reference: NaiveDate) -> Result<DayConditions> {
    let range = Window::Day.range(reference)?;
    let record = &series.slice(&range)?[0];
    Ok(DayConditions {
        tmid: record.tmid,
        tmin: record.tmin,
        tmax: record.tmax,
        vpd: record.vpd,
        precip: record.precip,
    })
}

/// Summarize one non-day window ending the day before `reference`.
///
/// `latitude` drives the season restriction of the five-year precipitation
/// breakdown; it is unused for shorter windows.
pub fn summarize(
    series: &DailySeries,
    window: Window,
    reference: NaiveDate,
    latitude: f64,
) -> Result<PeriodSummary> {
    debug_assert!(window != Window::Day);
    let range = window.range(reference)?;
    let records = series.slice(&range)?;

    let temperature = temperature_stats(records);
    let vpd = VariableStats::from_values(&collect(records, |r| Some(r.vpd)));
    let precip = precip_stats(records);

    let monthly = window.has_monthly_stats().then(|| monthly_stats(records));

    let max_rainless_days = match window {
        Window::Month | Window::Quarter => max_rainless_run(records),
        _ => None,
    };

    let yearly_precip = match window {
        Window::FiveYears => Some(five_year_precip(series, &range, reference, latitude)?),
        _ => None,
    };

    Ok(PeriodSummary {
        window,
        temperature,
        vpd,
        precip,
        monthly,
        max_rainless_days,
        yearly_precip,
    })
}

fn collect<F>(records: &[DailyRecord], f: F) -> Vec<Option<f64>>
where
    F: Fn(&DailyRecord) -> Option<f64>,
{
    records.iter().map(f).collect()
}

fn temperature_stats(records: &[DailyRecord]) -> TemperatureStats {
    let tmid = collect(records, |r| Some(r.tmid));
    let tmin = collect(records, |r| Some(r.tmin));
    let tmax = collect(records, |r| Some(r.tmax));
    let amplitude = collect(records, |r| Some(r.tmax - r.tmin));

    TemperatureStats {
        avg_tmid: stats::mean(&tmid),
        avg_tmin: stats::mean(&tmin),
        avg_tmax: stats::mean(&tmax),
        avg_amplitude: stats::mean(&amplitude),
        min_tmid: stats::min(&tmid),
        min_tmin: stats::min(&tmin),
        min_tmax: stats::min(&tmax),
        min_amplitude: stats::min(&amplitude),
        max_tmid: stats::max(&tmid),
        max_tmin: stats::max(&tmin),
        max_tmax: stats::max(&tmax),
        max_amplitude: stats::max(&amplitude),
        var_tmid: stats::variability(&tmid),
        var_tmin: stats::variability(&tmin),
        var_tmax: stats::variability(&tmax),
    }
}

fn precip_stats(records: &[DailyRecord]) -> PrecipStats {
    let values = collect(records, |r| r.precip);
    PrecipStats {
        total: stats::total(&values),
        avg: stats::mean(&values),
        min: stats::min(&values),
        max: stats::max(&values),
        range: stats::range(&values),
        variability: stats::variability(&values),
    }
}

/// Group records by (month, year) in date order and compute the per-group
/// means of each variable. The series is contiguous, so each group is a
/// single block of consecutive records.
fn monthly_means(records: &[DailyRecord]) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();
    for record in records {
        let key = (record.date.month(), record.date.year());
        match groups.last_mut() {
            Some(group) if group.key == key => group.push(record),
            _ => {
                let mut group = MonthGroup::new(key);
                group.push(record);
                groups.push(group);
            }
        }
    }
    groups
}

struct MonthGroup {
    key: (u32, i32),
    tmid: Vec<Option<f64>>,
    tmin: Vec<Option<f64>>,
    tmax: Vec<Option<f64>>,
    vpd: Vec<Option<f64>>,
    precip: Vec<Option<f64>>,
}

impl MonthGroup {
    fn new(key: (u32, i32)) -> Self {
        Self {
            key,
            tmid: Vec::new(),
            tmin: Vec::new(),
            tmax: Vec::new(),
            vpd: Vec::new(),
            precip: Vec::new(),
        }
    }

    fn push(&mut self, record: &DailyRecord) {
        self.tmid.push(Some(record.tmid));
        self.tmin.push(Some(record.tmin));
        self.tmax.push(Some(record.tmax));
        self.vpd.push(Some(record.vpd));
        self.precip.push(record.precip);
    }
}

fn monthly_stats(records: &[DailyRecord]) -> MonthlyStats {
    let groups = monthly_means(records);

    let tmid: Vec<Option<f64>> = groups.iter().map(|g| stats::mean(&g.tmid)).collect();
    let tmin: Vec<Option<f64>> = groups.iter().map(|g| stats::mean(&g.tmin)).collect();
    let tmax: Vec<Option<f64>> = groups.iter().map(|g| stats::mean(&g.tmax)).collect();
    let amplitude: Vec<Option<f64>> = tmax
        .iter()
        .zip(tmin.iter())
        .map(|(hi, lo)| match (hi, lo) {
            (Some(hi), Some(lo)) => Some(hi - lo),
            _ => None,
        })
        .collect();
    let vpd: Vec<Option<f64>> = groups.iter().map(|g| stats::mean(&g.vpd)).collect();
    // A month with no rain-bearing day contributes no monthly value
    let precip: Vec<Option<f64>> = groups.iter().map(|g| stats::mean(&g.precip)).collect();

    MonthlyStats {
        avg_tmid: stats::mean(&tmid),
        avg_tmin: stats::mean(&tmin),
        avg_tmax: stats::mean(&tmax),
        avg_amplitude: stats::mean(&amplitude),
        min_amplitude: stats::min(&amplitude),
        max_amplitude: stats::max(&amplitude),
        var_tmid: stats::variability(&tmid),
        var_tmin: stats::variability(&tmin),
        var_tmax: stats::variability(&tmax),
        vpd: VariableStats::from_values(&vpd),
        precip: masked_precip_stats(&precip),
    }
}

/// Precipitation stats where min and range only consider values above the
/// no-rain threshold.
fn masked_precip_stats(values: &[Option<f64>]) -> VariableStats {
    let masked: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.filter(|x| *x > NO_RAIN_THRESHOLD_MM))
        .collect();
    let max = stats::max(values);
    let min = stats::min(&masked);
    VariableStats {
        avg: stats::mean(values),
        min,
        max,
        range: match (max, min) {
            (Some(hi), Some(lo)) => Some(hi - lo),
            _ => None,
        },
        variability: stats::variability(values),
    }
}

/// Longest rainless run within the window, absent when no multi-day run
/// exists.
fn max_rainless_run(records: &[DailyRecord]) -> Option<usize> {
    let positions: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.precip.is_none())
        .map(|(i, _)| i)
        .collect();
    runs::consecutive_runs(&positions)
        .iter()
        .map(|run| run.days())
        .max()
}

fn five_year_precip(
    series: &DailySeries,
    window: &DateRange,
    reference: NaiveDate,
    latitude: f64,
) -> Result<[YearPrecip; LOOKBACK_YEARS]> {
    let months = season::season_months(latitude, reference);
    let slices = year_slices(window)?;

    let mut out = [YearPrecip::default(); LOOKBACK_YEARS];
    for (slot, slice) in out.iter_mut().zip(slices.iter()) {
        let records = series.slice(slice)?;
        let all = collect(records, |r| r.precip);
        let in_season: Vec<Option<f64>> = records
            .iter()
            .filter(|r| months.contains(&r.date.month()))
            .map(|r| r.precip)
            .collect();
        let season_masked: Vec<Option<f64>> = in_season
            .iter()
            .map(|v| v.filter(|x| *x > NO_RAIN_THRESHOLD_MM))
            .collect();

        *slot = YearPrecip {
            total: stats::total(&all),
            season_total: stats::total(&in_season),
            season_min: stats::min(&season_masked),
            season_max: stats::max(&in_season),
        };
    }
    Ok(out)
}
