//! Result file writing
//!
//! Flattens typed site analyses into named columns and writes the sixteen
//! output CSVs: the leading-day file, temperature/vpd/ppt splits of each
//! period window, and the three metric files. Rows are ordered by species;
//! absent values become empty cells.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::app::models::{Epoch, Window};
use crate::app::services::site_analyzer::{EpochAnalysis, SiteAnalysis};
use crate::app::services::spells::{FamilyMetrics, SiteSpellMetrics};
use crate::app::services::window::PeriodSummary;
use crate::constants::{OUTPUT_DATE_FORMAT, YEAR_SLICE_LABELS};
use crate::{Error, Result};

// =============================================================================
// Writer
// =============================================================================

/// Writes the analysis result files into an output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write all sixteen result files. Returns the written paths.
    pub fn write_all(&self, analyses: &[SiteAnalysis]) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::io("failed to create output directory", e))?;

        // output rows are ordered by species, not by coordinate
        let mut rows: Vec<&SiteAnalysis> = analyses.iter().collect();
        rows.sort_by(|a, b| a.site.species.cmp(&b.site.species));

        let mut written = Vec::new();

        let day = day_table(&rows)?;
        written.push(self.write_filtered("leading_day_all_met.csv", &day, &[])?);

        let splits: [(&str, &[&str]); 3] = [
            ("temperature", &["vpd", "ppt"]),
            ("vpd", &["tmdw", "tmin", "tmax", "tair", "ppt"]),
            ("ppt", &["tmdw", "tmin", "tmax", "tair", "vpd"]),
        ];
        let periods = [
            (Window::Week, "week"),
            (Window::Month, "month"),
            (Window::Quarter, "3_months"),
            (Window::FiveYears, "5_years"),
        ];
        for (window, stem) in periods {
            let table = period_table(&rows, window)?;
            for (family, exclude) in splits {
                let filename = split_filename(stem, family);
                written.push(self.write_filtered(&filename, &table, exclude)?);
            }
        }

        let metrics = metrics_table(&rows)?;
        written.push(self.write_filtered("heatwave_metrics.csv", &metrics, &["dry spell", "ppt"])?);
        written.push(self.write_filtered("dry_atm_metrics.csv", &metrics, &["heatwave", "ppt"])?);
        written.push(self.write_filtered(
            "precip_metrics.csv",
            &metrics,
            &["dry spell", "heatwave"],
        )?);

        info!(files = written.len(), dir = %self.output_dir.display(), "wrote result files");
        Ok(written)
    }

    /// Write the columns of `df` whose names contain none of the excluded
    /// substrings.
    fn write_filtered(&self, filename: &str, df: &DataFrame, exclude: &[&str]) -> Result<PathBuf> {
        let keep: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|name| !exclude.iter().any(|e| name.contains(e)))
            .map(|name| name.to_string())
            .collect();
        let mut out = df
            .select(keep)
            .map_err(|e| Error::dataframe(filename, "column selection failed", Some(e)))?;

        let path = self.output_dir.join(filename);
        write_csv(&path, &mut out)?;
        Ok(path)
    }
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let label = path.display().to_string();
    let mut file = File::create(path).map_err(|e| Error::io(format!("cannot create {label}"), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| Error::dataframe(&label, "CSV write failed", Some(e)))?;
    Ok(())
}

/// The period result files keep the historical naming of the dataset, typo
/// included.
fn split_filename(stem: &str, family: &str) -> String {
    match (stem, family) {
        ("week", "temperature") => "week_temperature.csv".to_string(),
        (_, "temperature") => format!("{stem}_temperatude.csv"),
        _ => format!("{stem}_{family}.csv"),
    }
}

// =============================================================================
// Table Construction
// =============================================================================

struct TableBuilder<'a> {
    rows: &'a [&'a SiteAnalysis],
    columns: Vec<Column>,
}

impl<'a> TableBuilder<'a> {
    /// Start a table with the site identity columns.
    fn with_base(rows: &'a [&'a SiteAnalysis]) -> Self {
        let mut builder = Self {
            rows,
            columns: Vec::new(),
        };
        builder.columns.push(Column::new(
            "Species".into(),
            rows.iter()
                .map(|a| a.site.species.clone())
                .collect::<Vec<_>>(),
        ));
        builder.columns.push(Column::new(
            "Lat".into(),
            rows.iter().map(|a| a.site.lat).collect::<Vec<_>>(),
        ));
        builder.columns.push(Column::new(
            "Lon".into(),
            rows.iter().map(|a| a.site.lon).collect::<Vec<_>>(),
        ));
        for epoch in Epoch::ALL {
            builder.columns.push(Column::new(
                format!("{} seed collection date", epoch.label()).into(),
                rows.iter()
                    .map(|a| {
                        a.site
                            .collection(epoch)
                            .format(OUTPUT_DATE_FORMAT)
                            .to_string()
                    })
                    .collect::<Vec<_>>(),
            ));
        }
        builder
    }

    fn float(&mut self, name: String, f: impl Fn(&SiteAnalysis) -> Option<f64>) {
        let values: Vec<Option<f64>> = self.rows.iter().map(|a| f(a)).collect();
        self.columns.push(Column::new(name.into(), values));
    }

    fn text(&mut self, name: String, f: impl Fn(&SiteAnalysis) -> Option<String>) {
        let values: Vec<Option<String>> = self.rows.iter().map(|a| f(a)).collect();
        self.columns.push(Column::new(name.into(), values));
    }

    fn finish(self) -> Result<DataFrame> {
        DataFrame::new(self.columns)
            .map_err(|e| Error::dataframe("result table", "table construction failed", Some(e)))
    }
}

fn epoch_analysis(a: &SiteAnalysis, epoch: Epoch) -> &EpochAnalysis {
    match epoch {
        Epoch::Old => &a.old,
        Epoch::Modern => &a.modern,
    }
}

fn period_of(a: &SiteAnalysis, epoch: Epoch, window: Window) -> Option<&PeriodSummary> {
    epoch_analysis(a, epoch).period(window)
}

fn metrics_of(a: &SiteAnalysis, epoch: Epoch) -> Option<&SiteSpellMetrics> {
    epoch_analysis(a, epoch).metrics.as_ref()
}

// -----------------------------------------------------------------------------
// Leading-day table
// -----------------------------------------------------------------------------

fn day_table(rows: &[&SiteAnalysis]) -> Result<DataFrame> {
    let mut b = TableBuilder::with_base(rows);
    for epoch in Epoch::ALL {
        let c = epoch.label();
        let day = move |a: &SiteAnalysis| epoch_analysis(a, epoch).day;
        b.float(format!("{c} prev day tmdw (degC)"), move |a| {
            day(a).map(|d| d.tmid)
        });
        b.float(format!("{c} prev day tmin (degC)"), move |a| {
            day(a).map(|d| d.tmin)
        });
        b.float(format!("{c} prev day tmax (degC)"), move |a| {
            day(a).map(|d| d.tmax)
        });
        b.float(format!("{c} prev day vpd 3pm (kPa)"), move |a| {
            day(a).map(|d| d.vpd)
        });
        b.float(format!("{c} prev day ppt (mm day-1)"), move |a| {
            day(a).and_then(|d| d.precip)
        });
    }
    b.finish()
}

// -----------------------------------------------------------------------------
// Period tables
// -----------------------------------------------------------------------------

fn period_table(rows: &[&SiteAnalysis], window: Window) -> Result<DataFrame> {
    let mut b = TableBuilder::with_base(rows);
    for epoch in Epoch::ALL {
        add_period_columns(&mut b, epoch, window);
    }
    b.finish()
}

fn add_period_columns(b: &mut TableBuilder, epoch: Epoch, window: Window) {
    let c = epoch.label();
    let w = window.label();
    macro_rules! stat {
        ($label:expr, $($path:tt)+) => {
            b.float(format!(concat!("{c} prev {w} ", $label), c = c, w = w), move |a| {
                period_of(a, epoch, window).and_then(|p| p.$($path)+)
            });
        };
    }

    // temperature
    stat!("avg tmdw (degC)", temperature.avg_tmid);
    stat!("avg tmin (degC)", temperature.avg_tmin);
    stat!("avg tmax (degC)", temperature.avg_tmax);
    stat!("avg amplitude tair (degC)", temperature.avg_amplitude);
    stat!("min tmdw (degC)", temperature.min_tmid);
    stat!("min tmin (degC)", temperature.min_tmin);
    stat!("min tmax (degC)", temperature.min_tmax);
    stat!("min amplitude tair (degC)", temperature.min_amplitude);
    stat!("max tmdw (degC)", temperature.max_tmid);
    stat!("max tmin (degC)", temperature.max_tmin);
    stat!("max tmax (degC)", temperature.max_tmax);
    stat!("max amplitude tair (degC)", temperature.max_amplitude);
    stat!("var tmdw (-)", temperature.var_tmid);
    stat!("var tmin (-)", temperature.var_tmin);
    stat!("var tmax (-)", temperature.var_tmax);

    if window.has_monthly_stats() {
        macro_rules! monthly {
            ($label:expr, $($path:tt)+) => {
                b.float(format!(concat!("{c} prev {w} ", $label), c = c, w = w), move |a| {
                    period_of(a, epoch, window)
                        .and_then(|p| p.monthly.as_ref())
                        .and_then(|m| m.$($path)+)
                });
            };
        }
        monthly!("avg monthly tmdw (degC)", avg_tmid);
        monthly!("avg monthly tmin (degC)", avg_tmin);
        monthly!("avg monthly tmax (degC)", avg_tmax);
        monthly!("avg amplitude monthly tair (degC)", avg_amplitude);
        monthly!("min amplitude monthly tair (degC)", min_amplitude);
        monthly!("max amplitude monthly tair (degC)", max_amplitude);
        monthly!("var monthly tmdw (-)", var_tmid);
        monthly!("var monthly tmin (-)", var_tmin);
        monthly!("var monthly tmax (-)", var_tmax);
    }

    // vpd
    stat!("avg vpd 3pm (kPa)", vpd.avg);
    stat!("min vpd 3pm (kPa)", vpd.min);
    stat!("max vpd 3pm (kPa)", vpd.max);
    stat!("range vpd 3pm (kPa)", vpd.range);
    stat!("var vpd 3pm (-)", vpd.variability);

    if window.has_monthly_stats() {
        macro_rules! monthly {
            ($label:expr, $($path:tt)+) => {
                b.float(format!(concat!("{c} prev {w} ", $label), c = c, w = w), move |a| {
                    period_of(a, epoch, window)
                        .and_then(|p| p.monthly.as_ref())
                        .and_then(|m| m.$($path)+)
                });
            };
        }
        monthly!("avg monthly vpd 3pm (kPa)", vpd.avg);
        monthly!("min monthly vpd 3pm (kPa)", vpd.min);
        monthly!("max monthly vpd 3pm (kPa)", vpd.max);
        monthly!("range monthly vpd 3pm (kPa)", vpd.range);
        monthly!("var monthly vpd 3pm (-)", vpd.variability);
    }

    // precipitation
    stat!("total ppt (mm)", precip.total);
    stat!("avg ppt (mm day-1)", precip.avg);
    stat!("min ppt (mm day-1)", precip.min);
    stat!("max ppt (mm day-1)", precip.max);
    stat!("range ppt (mm)", precip.range);
    stat!("var ppt (-)", precip.variability);

    if window.has_monthly_stats() {
        macro_rules! monthly {
            ($label:expr, $($path:tt)+) => {
                b.float(format!(concat!("{c} prev {w} ", $label), c = c, w = w), move |a| {
                    period_of(a, epoch, window)
                        .and_then(|p| p.monthly.as_ref())
                        .and_then(|m| m.$($path)+)
                });
            };
        }
        monthly!("avg monthly ppt (mm month-1)", precip.avg);
        monthly!("min monthly ppt (mm month-1)", precip.min);
        monthly!("max monthly ppt (mm month-1)", precip.max);
        monthly!("range monthly ppt (mm)", precip.range);
        monthly!("var monthly ppt (-)", precip.variability);
    }

    if matches!(window, Window::Month | Window::Quarter) {
        b.float(format!("{c} prev {w} max Ndays no ppt (-)"), move |a| {
            period_of(a, epoch, window)
                .and_then(|p| p.max_rainless_days)
                .map(|d| d as f64)
        });
    }

    if window == Window::FiveYears {
        for (i, yr) in YEAR_SLICE_LABELS.iter().enumerate() {
            let year = move |a: &SiteAnalysis| {
                period_of(a, epoch, window)
                    .and_then(|p| p.yearly_precip.as_ref())
                    .map(|y| y[i])
            };
            b.float(format!("{c} prev {w} total ppt in {yr} (mm)"), move |a| {
                year(a).and_then(|y| y.total)
            });
            b.float(
                format!("{c} prev {w} total ppt in the season {yr} (mm)"),
                move |a| year(a).and_then(|y| y.season_total),
            );
            b.float(
                format!("{c} prev {w} min ppt in the season {yr} (mm day-1)"),
                move |a| year(a).and_then(|y| y.season_min),
            );
            b.float(
                format!("{c} prev {w} max ppt in the season {yr} (mm day-1)"),
                move |a| year(a).and_then(|y| y.season_max),
            );
        }
    }
}

// -----------------------------------------------------------------------------
// Metrics table
// -----------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum SpellFamily {
    Heat,
    Dry,
}

impl SpellFamily {
    fn metrics<'a>(&self, m: &'a SiteSpellMetrics) -> &'a FamilyMetrics {
        match self {
            SpellFamily::Heat => &m.heat,
            SpellFamily::Dry => &m.dry,
        }
    }

    /// Noun used for counts ("N heatwaves") and for durations ("heatwave").
    fn nouns(&self) -> (&'static str, &'static str) {
        match self {
            SpellFamily::Heat => ("heatwaves", "heatwave"),
            SpellFamily::Dry => ("dry spells", "dry spell"),
        }
    }
}

fn metrics_table(rows: &[&SiteAnalysis]) -> Result<DataFrame> {
    let mut b = TableBuilder::with_base(rows);
    for epoch in Epoch::ALL {
        add_family_columns(&mut b, epoch, SpellFamily::Heat);
        add_family_columns(&mut b, epoch, SpellFamily::Dry);
        add_rainless_columns(&mut b, epoch);
    }
    b.finish()
}

fn add_family_columns(b: &mut TableBuilder, epoch: Epoch, family: SpellFamily) {
    let c = epoch.label();
    let (plural, singular) = family.nouns();
    fn annotate<F: for<'a> Fn(&'a SiteAnalysis) -> Option<&'a FamilyMetrics>>(f: F) -> F {
        f
    }
    let fam = annotate(move |a| metrics_of(a, epoch).map(move |m| family.metrics(m)));

    for (i, yr) in YEAR_SLICE_LABELS.iter().enumerate() {
        let year = move |a: &SiteAnalysis| fam(a).and_then(|f| f.years[i]);
        b.float(format!("{c} total N {plural} {yr} (-)"), move |a| {
            year(a).map(|s| s.count as f64)
        });
        b.float(format!("{c} avg Ndays {singular} {yr} (-)"), move |a| {
            year(a).map(|s| s.avg_days)
        });
        b.float(format!("{c} max Ndays {singular} {yr} (-)"), move |a| {
            year(a).map(|s| s.max_days as f64)
        });
        b.text(format!("{c} dates max Ndays {singular} {yr} (-)"), move |a| {
            year(a).map(|s| s.max_run.format_dates(a.series_start))
        });
        if i == 0 {
            b.text(format!("{c} dates most recent {singular} (-)"), move |a| {
                fam(a)
                    .and_then(|f| f.most_recent)
                    .map(|run| run.format_dates(a.series_start))
            });
        }
    }

    let season = move |a: &SiteAnalysis| fam(a).and_then(|f| f.season);
    b.float(
        format!("{c} interannual total N {plural} in the season (-)"),
        move |a| season(a).map(|s| s.count as f64),
    );
    b.float(
        format!("{c} interannual avg Ndays {singular} in the season (-)"),
        move |a| season(a).map(|s| s.avg_days),
    );
    b.float(
        format!("{c} interannual max Ndays {singular} in the season (-)"),
        move |a| season(a).map(|s| s.max_days as f64),
    );
}

fn add_rainless_columns(b: &mut TableBuilder, epoch: Epoch) {
    let c = epoch.label();
    for (i, yr) in YEAR_SLICE_LABELS.iter().enumerate() {
        let year = move |a: &SiteAnalysis| {
            metrics_of(a, epoch).and_then(|m| m.rainless_years[i])
        };
        b.float(format!("{c} max Ndays no ppt {yr} (-)"), move |a| {
            year(a).map(|s| s.max_days as f64)
        });
        b.text(format!("{c} dates max Ndays no ppt {yr} (-)"), move |a| {
            year(a).map(|s| s.max_run.format_dates(a.series_start))
        });
        if i == 0 {
            b.text(format!("{c} dates most recent no ppt (-)"), move |a| {
                metrics_of(a, epoch)
                    .and_then(|m| m.rainless_recent)
                    .map(|run| run.format_dates(a.series_start))
            });
        }
    }
    b.float(
        format!("{c} interannual max Ndays no ppt in the season (-)"),
        move |a| {
            metrics_of(a, epoch)
                .and_then(|m| m.rainless_season_max)
                .map(|d| d as f64)
        },
    );
}
