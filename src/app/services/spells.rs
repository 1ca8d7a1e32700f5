//! Extreme-event spell metrics
//!
//! Heatwaves and atmospheric dry spells are runs of at least three days where
//! a 3-day trailing mean of the driving variable (tmid for heat, 3pm VPD for
//! dryness) exceeds a 30-day climatological baseline ending three days
//! earlier. Rainless spells are runs of consecutive no-rain days.
//!
//! Metrics cover the five years before the reference date, split into
//! calendar-year slices (y1 newest), plus an interannual pool restricted to
//! the climatological season of the reference date.

use chrono::{Datelike, NaiveDate};

use crate::app::models::{year_slices, DailySeries, DateRange, Window};
use crate::app::services::runs::{consecutive_runs, Run};
use crate::app::services::{season, smoothing};
use crate::constants::{
    EXCESS_BASELINE_LAG_DAYS, EXCESS_BASELINE_WINDOW_DAYS, EXCESS_SHORT_WINDOW_DAYS,
    LOOKBACK_YEARS, MIN_SPELL_DAYS,
};
use crate::Result;

// =============================================================================
// Result Types
// =============================================================================

/// Spell statistics for one year slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpellStats {
    /// Number of qualifying spells
    pub count: usize,
    /// Mean spell length [days]
    pub avg_days: f64,
    /// Longest spell length [days]
    pub max_days: usize,
    /// First spell of maximal length; positions are series day offsets
    pub max_run: Run,
}

/// Interannual spell statistics pooled within the season across five years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonSpells {
    pub count: usize,
    pub avg_days: f64,
    pub max_days: usize,
}

/// One excess-driven spell family (heatwaves or dry spells).
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyMetrics {
    /// Per year slice, newest first; `None` when no qualifying spell
    pub years: [Option<SpellStats>; LOOKBACK_YEARS],
    /// Most recent spell of the newest slice, reported only when that slice
    /// holds more than one spell
    pub most_recent: Option<Run>,
    pub season: Option<SeasonSpells>,
}

/// Rainless-spell statistics for one year slice: only the longest run is
/// reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainlessStats {
    pub max_days: usize,
    pub max_run: Run,
}

/// All spell metrics for one site and reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSpellMetrics {
    pub heat: FamilyMetrics,
    pub dry: FamilyMetrics,
    pub rainless_years: [Option<RainlessStats>; LOOKBACK_YEARS],
    pub rainless_recent: Option<Run>,
    pub rainless_season_max: Option<usize>,
}

// =============================================================================
// Engine
// =============================================================================

/// Precomputed excess signals for one daily series.
///
/// Smoothing runs over the full series once, before any windowing, so that
/// the earliest window days still see a real 30-day baseline. The engine is
/// then reused for every site and reference date at the same coordinate.
pub struct SpellMetricsEngine<'a> {
    series: &'a DailySeries,
    heat_excess: Vec<bool>,
    dry_excess: Vec<bool>,
}

impl<'a> SpellMetricsEngine<'a> {
    pub fn new(series: &'a DailySeries) -> Self {
        let tmid: Vec<f64> = series.records().iter().map(|r| r.tmid).collect();
        let vpd: Vec<f64> = series.records().iter().map(|r| r.vpd).collect();
        Self {
            heat_excess: excess_signal(&tmid),
            dry_excess: excess_signal(&vpd),
            series,
        }
    }

    /// Compute all spell metrics for a reference date.
    pub fn site_metrics(&self, latitude: f64, reference: NaiveDate) -> Result<SiteSpellMetrics> {
        let window = Window::FiveYears.range(reference)?;
        let slices = year_slices(&window)?;
        let months = season::season_months(latitude, reference);

        let heat = self.family_metrics(&self.heat_excess, &window, &slices, &months)?;
        let dry = self.family_metrics(&self.dry_excess, &window, &slices, &months)?;

        let mut rainless_years: [Option<RainlessStats>; LOOKBACK_YEARS] =
            [None; LOOKBACK_YEARS];
        let mut rainless_recent = None;
        for (i, slice) in slices.iter().enumerate() {
            let runs = consecutive_runs(&self.rainless_positions(slice, None)?);
            rainless_years[i] = longest_run(&runs).map(|run| RainlessStats {
                max_days: run.days(),
                max_run: run,
            });
            if i == 0 && runs.len() > 1 {
                rainless_recent = runs.last().copied();
            }
        }

        let pooled = consecutive_runs(&self.rainless_positions(&window, Some(&months))?);
        let rainless_season_max = pooled.iter().map(|run| run.days()).max();

        Ok(SiteSpellMetrics {
            heat,
            dry,
            rainless_years,
            rainless_recent,
            rainless_season_max,
        })
    }

    fn family_metrics(
        &self,
        excess: &[bool],
        window: &DateRange,
        slices: &[DateRange; LOOKBACK_YEARS],
        months: &[u32],
    ) -> Result<FamilyMetrics> {
        let mut years: [Option<SpellStats>; LOOKBACK_YEARS] = [None; LOOKBACK_YEARS];
        let mut most_recent = None;
        for (i, slice) in slices.iter().enumerate() {
            let positions = self.excess_positions(excess, slice, None)?;
            let runs = spell_runs(&positions);
            years[i] = spell_stats(&runs);
            if i == 0 && runs.len() > 1 {
                most_recent = runs.last().copied();
            }
        }

        // Interannual pooling: season-restricted positions across the whole
        // window, run-detected once, so gaps between seasons break runs.
        let pooled = spell_runs(&self.excess_positions(excess, window, Some(months))?);
        let season = spell_stats(&pooled).map(|s| SeasonSpells {
            count: s.count,
            avg_days: s.avg_days,
            max_days: s.max_days,
        });

        Ok(FamilyMetrics {
            years,
            most_recent,
            season,
        })
    }

    /// Day offsets inside `range` where the excess signal holds, optionally
    /// restricted to a set of season months.
    fn excess_positions(
        &self,
        excess: &[bool],
        range: &DateRange,
        months: Option<&[u32]>,
    ) -> Result<Vec<usize>> {
        let lo = self.series.offset_of(range.start)?;
        let hi = self.series.offset_of(range.end)?;
        Ok((lo..=hi)
            .filter(|&i| excess[i])
            .filter(|&i| in_months(self.series.date_at(i), months))
            .collect())
    }

    fn rainless_positions(&self, range: &DateRange, months: Option<&[u32]>) -> Result<Vec<usize>> {
        let lo = self.series.offset_of(range.start)?;
        let hi = self.series.offset_of(range.end)?;
        let records = self.series.records();
        Ok((lo..=hi)
            .filter(|&i| records[i].precip.is_none())
            .filter(|&i| in_months(self.series.date_at(i), months))
            .collect())
    }
}

fn in_months(date: NaiveDate, months: Option<&[u32]>) -> bool {
    months.is_none_or(|m| m.contains(&date.month()))
}

/// Excess signal over a full series: 3-day trailing mean above the 30-day
/// trailing mean ending three days earlier. The first days, where no lagged
/// baseline exists, never register excess.
fn excess_signal(values: &[f64]) -> Vec<bool> {
    let short = smoothing::trailing_mean(values, EXCESS_SHORT_WINDOW_DAYS);
    let long = smoothing::trailing_mean(values, EXCESS_BASELINE_WINDOW_DAYS);
    (0..values.len())
        .map(|i| i >= EXCESS_BASELINE_LAG_DAYS && short[i] > long[i - EXCESS_BASELINE_LAG_DAYS])
        .collect()
}

/// Runs long enough to count as a spell.
fn spell_runs(positions: &[usize]) -> Vec<Run> {
    consecutive_runs(positions)
        .into_iter()
        .filter(|run| run.days() >= MIN_SPELL_DAYS)
        .collect()
}

fn longest_run(runs: &[Run]) -> Option<Run> {
    // first run of maximal length
    runs.iter()
        .copied()
        .fold(None, |acc: Option<Run>, run| match acc {
            Some(best) if best.days() >= run.days() => Some(best),
            _ => Some(run),
        })
}

fn spell_stats(runs: &[Run]) -> Option<SpellStats> {
    let longest = longest_run(runs)?;
    let total: usize = runs.iter().map(|r| r.days()).sum();
    Some(SpellStats {
        count: runs.len(),
        avg_days: total as f64 / runs.len() as f64,
        max_days: longest.days(),
        max_run: longest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::DailyRecord;
    use chrono::Days;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// A flat series over six years with optional hot days and rain days
    /// injected by offset.
    fn series_with(hot_offsets: &[usize], rain_gap_offsets: &[usize]) -> DailySeries {
        let start = date(2013, 1, 1);
        let n = 366 * 7;
        let records = (0..n)
            .map(|i| {
                let hot = hot_offsets.contains(&i);
                DailyRecord {
                    date: start + Days::new(i as u64),
                    tmin: if hot { 25.0 } else { 10.0 },
                    tmax: if hot { 45.0 } else { 20.0 },
                    tmid: if hot { 35.0 } else { 15.0 },
                    vpd: 1.0,
                    precip: if rain_gap_offsets.contains(&i) {
                        None
                    } else {
                        Some(3.0)
                    },
                }
            })
            .collect();
        DailySeries::new(records).unwrap()
    }

    fn offsets(series: &DailySeries, from: NaiveDate, days: usize) -> Vec<usize> {
        let base = series.offset_of(from).unwrap();
        (base..base + days).collect()
    }

    mod excess {
        use super::*;

        #[test]
        fn test_flat_signal_never_in_excess() {
            let series = series_with(&[], &[]);
            let engine = SpellMetricsEngine::new(&series);
            assert!(engine.heat_excess.iter().all(|&e| !e));
        }

        #[test]
        fn test_hot_streak_registers_excess() {
            let hot: Vec<usize> = (1000..1010).collect();
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);
            // 3-day mean catches up by the second hot day
            assert!(engine.heat_excess[1001]);
            assert!(engine.heat_excess[1005]);
            // long before the streak nothing is in excess
            assert!(!engine.heat_excess[900]);
        }

        #[test]
        fn test_first_days_have_no_baseline() {
            let hot: Vec<usize> = (0..5).collect();
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);
            assert!(!engine.heat_excess[0]);
            assert!(!engine.heat_excess[1]);
            assert!(!engine.heat_excess[2]);
        }
    }

    mod yearly_spells {
        use super::*;

        #[test]
        fn test_single_heatwave_in_y1() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            // one week-long hot streak three months before collection
            let hot = offsets(&series, date(2019, 3, 1), 7);
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            let y1 = metrics.heat.years[0].expect("heatwave in y1");
            assert_eq!(y1.count, 1);
            assert!(y1.max_days >= MIN_SPELL_DAYS);
            assert_eq!(y1.avg_days, y1.max_days as f64);
            // older slices stay empty
            for year in &metrics.heat.years[1..] {
                assert!(year.is_none());
            }
        }

        #[test]
        fn test_single_run_reports_no_most_recent() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            let hot = offsets(&series, date(2019, 3, 1), 7);
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            assert!(metrics.heat.years[0].is_some());
            assert!(metrics.heat.most_recent.is_none());
        }

        #[test]
        fn test_two_runs_report_most_recent() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            let mut hot = offsets(&series, date(2019, 1, 10), 6);
            hot.extend(offsets(&series, date(2019, 3, 1), 8));
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            let y1 = metrics.heat.years[0].unwrap();
            assert_eq!(y1.count, 2);
            let recent = metrics.heat.most_recent.expect("two runs, recent set");
            // the most recent run is the March one
            assert!(recent.start > y1.max_run.start || y1.max_run.start == recent.start);
            let march = series.offset_of(date(2019, 3, 1)).unwrap();
            assert!(recent.start >= march);
        }

        #[test]
        fn test_counts_avg_and_max_over_mixed_runs() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            // a 4-day and a 2-day hot streak; trailing smoothing stretches
            // them into excess runs of 6 and 4 days
            let mut hot = offsets(&series, date(2018, 9, 1), 4);
            hot.extend(offsets(&series, date(2018, 9, 10), 2));
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            let y1 = metrics.heat.years[0].expect("qualifying spells in y1");
            assert_eq!(y1.count, 2);
            assert_eq!(y1.max_days, 6);
            assert_eq!(y1.avg_days, 5.0);
        }
    }

    mod spell_floor {
        use super::*;

        #[test]
        fn test_runs_shorter_than_three_days_dropped() {
            // a 4-day and a 2-day run of excess positions
            let positions = [10, 11, 12, 13, 20, 21];
            let runs = spell_runs(&positions);
            assert_eq!(runs.len(), 1);
            assert_eq!(runs[0].days(), 4);

            let stats = spell_stats(&runs).unwrap();
            assert_eq!(stats.count, 1);
            assert_eq!(stats.max_days, 4);
            assert_eq!(stats.avg_days, 4.0);
        }
    }

    mod rainless_spells {
        use super::*;

        #[test]
        fn test_rainless_run_and_dates() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            let dry = offsets(&series, date(2019, 2, 1), 9);
            let series = series_with(&[], &dry);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            let y1 = metrics.rainless_years[0].expect("rainless run in y1");
            assert_eq!(y1.max_days, 9);
            assert_eq!(
                y1.max_run.format_dates(series.start()),
                "01/02/2019--09/02/2019"
            );
            assert!(metrics.rainless_recent.is_none());
        }

        #[test]
        fn test_two_day_rainless_run_qualifies() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            let dry = offsets(&series, date(2019, 2, 1), 2);
            let series = series_with(&[], &dry);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            assert_eq!(metrics.rainless_years[0].unwrap().max_days, 2);
        }
    }

    mod season_pooling {
        use super::*;

        #[test]
        fn test_out_of_season_spell_not_pooled() {
            let series = series_with(&[], &[]);
            // winter reference at mid-latitude: season is Jun-Aug
            let reference = date(2019, 7, 15);
            // summer heatwave only
            let hot = offsets(&series, date(2019, 1, 10), 6);
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            assert!(metrics.heat.years[0].is_some());
            assert!(metrics.heat.season.is_none());
        }

        #[test]
        fn test_in_season_spells_pooled_across_years() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 7, 15);
            let mut hot = offsets(&series, date(2018, 7, 1), 5);
            hot.extend(offsets(&series, date(2017, 7, 1), 5));
            let series = series_with(&hot, &[]);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            let season = metrics.heat.season.expect("pooled winter spells");
            assert_eq!(season.count, 2);
        }

        #[test]
        fn test_rainless_season_max() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 7, 15);
            let mut dry = offsets(&series, date(2018, 7, 1), 4);
            dry.extend(offsets(&series, date(2017, 7, 1), 6));
            let series = series_with(&[], &dry);
            let engine = SpellMetricsEngine::new(&series);

            let metrics = engine.site_metrics(-35.0, reference).unwrap();
            assert_eq!(metrics.rainless_season_max, Some(6));
        }
    }

    mod determinism {
        use super::*;

        #[test]
        fn test_identical_inputs_identical_metrics() {
            let series = series_with(&[], &[]);
            let reference = date(2019, 6, 15);
            let hot = offsets(&series, date(2019, 3, 1), 7);
            let dry = offsets(&series, date(2018, 11, 1), 5);
            let series = series_with(&hot, &dry);

            let a = SpellMetricsEngine::new(&series)
                .site_metrics(-35.0, reference)
                .unwrap();
            let b = SpellMetricsEngine::new(&series)
                .site_metrics(-35.0, reference)
                .unwrap();
            assert_eq!(a, b);
        }
    }
}
