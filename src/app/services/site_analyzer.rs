//! Per-site analysis orchestration
//!
//! Runs the full battery for one site: day conditions, the four period
//! windows, and the spell metrics, once per seed-collection epoch. A window
//! whose dates fall outside the loaded series is skipped with a warning
//! rather than failing the site.

use chrono::NaiveDate;
use tracing::warn;

use crate::app::models::{DailySeries, Epoch, Site, Window};
use crate::app::services::spells::{SiteSpellMetrics, SpellMetricsEngine};
use crate::app::services::window::{self, DayConditions, PeriodSummary};

/// Results for one site and one collection epoch. Any part can be absent
/// when its window is not covered by the series.
#[derive(Debug, Clone)]
pub struct EpochAnalysis {
    pub epoch: Epoch,
    pub day: Option<DayConditions>,
    pub week: Option<PeriodSummary>,
    pub month: Option<PeriodSummary>,
    pub quarter: Option<PeriodSummary>,
    pub five_years: Option<PeriodSummary>,
    pub metrics: Option<SiteSpellMetrics>,
}

impl EpochAnalysis {
    /// The period summary for a non-day window.
    pub fn period(&self, window: Window) -> Option<&PeriodSummary> {
        match window {
            Window::Day => None,
            Window::Week => self.week.as_ref(),
            Window::Month => self.month.as_ref(),
            Window::Quarter => self.quarter.as_ref(),
            Window::FiveYears => self.five_years.as_ref(),
        }
    }
}

/// Full analysis for one site across both epochs.
#[derive(Debug, Clone)]
pub struct SiteAnalysis {
    pub site: Site,
    /// First date of the underlying series, the origin for spell run dates
    pub series_start: NaiveDate,
    pub old: EpochAnalysis,
    pub modern: EpochAnalysis,
}

/// Analyze one site against its loaded series.
pub fn analyze_site(series: &DailySeries, site: &Site) -> SiteAnalysis {
    let engine = SpellMetricsEngine::new(series);
    let old = analyze_epoch(series, &engine, site, Epoch::Old);
    let modern = analyze_epoch(series, &engine, site, Epoch::Modern);
    SiteAnalysis {
        site: site.clone(),
        series_start: series.start(),
        old,
        modern,
    }
}

fn analyze_epoch(
    series: &DailySeries,
    engine: &SpellMetricsEngine,
    site: &Site,
    epoch: Epoch,
) -> EpochAnalysis {
    let reference = site.collection(epoch);
    let species = site.species.as_str();

    let day = window::day_conditions(series, reference)
        .map_err(|e| skip(species, epoch, "day", &e))
        .ok();
    let period = |w: Window| {
        window::summarize(series, w, reference, site.lat)
            .map_err(|e| skip(species, epoch, w.label(), &e))
            .ok()
    };
    let week = period(Window::Week);
    let month = period(Window::Month);
    let quarter = period(Window::Quarter);
    let five_years = period(Window::FiveYears);

    let metrics = engine
        .site_metrics(site.lat, reference)
        .map_err(|e| skip(species, epoch, "metrics", &e))
        .ok();

    EpochAnalysis {
        epoch,
        day,
        week,
        month,
        quarter,
        five_years,
        metrics,
    }
}

fn skip(species: &str, epoch: Epoch, what: &str, error: &crate::Error) {
    warn!(
        species,
        epoch = epoch.label(),
        window = what,
        %error,
        "skipping window"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::DailyRecord;
    use chrono::Days;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn series(start: NaiveDate, days: usize) -> DailySeries {
        let records = (0..days)
            .map(|i| DailyRecord {
                date: start + Days::new(i as u64),
                tmin: 8.0,
                tmax: 24.0,
                tmid: 16.0,
                vpd: 1.1,
                precip: if i % 3 == 0 { Some(4.0) } else { None },
            })
            .collect();
        DailySeries::new(records).unwrap()
    }

    fn site() -> Site {
        Site {
            species: "E. regnans".to_string(),
            lat: -37.5,
            lon: 145.3,
            old_collection: date(1990, 4, 1),
            modern_collection: date(2019, 4, 1),
        }
    }

    #[test]
    fn test_full_coverage_fills_both_epochs() {
        // 1985 through 2019 covers both five-year lookbacks
        let series = series(date(1985, 1, 1), 366 * 35);
        let analysis = analyze_site(&series, &site());

        for epoch in [&analysis.old, &analysis.modern] {
            assert!(epoch.day.is_some());
            assert!(epoch.week.is_some());
            assert!(epoch.month.is_some());
            assert!(epoch.quarter.is_some());
            assert!(epoch.five_years.is_some());
            assert!(epoch.metrics.is_some());
        }
        assert_eq!(analysis.series_start, date(1985, 1, 1));
    }

    #[test]
    fn test_uncovered_epoch_is_skipped_not_fatal() {
        // series starts after the old five-year lookback begins
        let series = series(date(1988, 1, 1), 366 * 33);
        let analysis = analyze_site(&series, &site());

        // short old windows still work, the five-year ones do not
        assert!(analysis.old.day.is_some());
        assert!(analysis.old.week.is_some());
        assert!(analysis.old.five_years.is_none());
        assert!(analysis.old.metrics.is_none());

        // the modern epoch is unaffected
        assert!(analysis.modern.five_years.is_some());
        assert!(analysis.modern.metrics.is_some());
    }
}
