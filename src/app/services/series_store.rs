//! Per-coordinate daily series loading
//!
//! Loads `AGCD_met_{lat}_{lon}.csv` files from the input directory and turns
//! them into validated [`DailySeries`] values: rows are re-dated to a daily
//! sequence starting Jan 1 of a caller-chosen first year, VPD is converted
//! from hPa to kPa, the midpoint temperature is derived, and precipitation at
//! or below the no-rain threshold is marked absent.
//!
//! Loaded series are cached by coordinate so that co-located sites share one
//! series.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};
use polars::prelude::*;
use tracing::debug;

use crate::app::models::{DailyRecord, DailySeries};
use crate::constants::{columns, series_filename, NO_RAIN_THRESHOLD_MM, VPD_HPA_PER_KPA};
use crate::{Error, Result};

/// Loads and caches per-coordinate daily series.
pub struct SeriesStore {
    input_dir: PathBuf,
    cache: Mutex<HashMap<(u64, u64), Arc<DailySeries>>>,
}

impl SeriesStore {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the series for a coordinate, re-dated from Jan 1 of `first_year`.
    ///
    /// A cached series is returned when the coordinate was loaded before.
    pub fn load(&self, lat: f64, lon: f64, first_year: i32) -> Result<Arc<DailySeries>> {
        let key = (lat.to_bits(), lon.to_bits());
        if let Some(series) = self.cache.lock().expect("series cache poisoned").get(&key) {
            return Ok(Arc::clone(series));
        }

        let series = Arc::new(self.read_series(lat, lon, first_year)?);
        self.cache
            .lock()
            .expect("series cache poisoned")
            .insert(key, Arc::clone(&series));
        Ok(series)
    }

    fn read_series(&self, lat: f64, lon: f64, first_year: i32) -> Result<DailySeries> {
        let path = self.input_dir.join(series_filename(lat, lon));
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let file_label = path.display().to_string();
        debug!(file = %file_label, "loading daily series");

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path))
            .map_err(|e| Error::dataframe(&file_label, "failed to open CSV", Some(e)))?
            .finish()
            .map_err(|e| Error::dataframe(&file_label, "failed to read CSV", Some(e)))?;

        let tmin = float_column(&df, columns::TMIN, &file_label)?;
        let tmax = float_column(&df, columns::TMAX, &file_label)?;
        let vpd = float_column(&df, columns::VPD_3PM, &file_label)?;
        let precip = float_column(&df, columns::PRECIP, &file_label)?;

        let start = NaiveDate::from_ymd_opt(first_year, 1, 1).ok_or_else(|| {
            Error::series_format(&file_label, format!("invalid first year {first_year}"))
        })?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let date = start + Days::new(i as u64);
            let tmin = required(&tmin, i, columns::TMIN, &file_label)?;
            let tmax = required(&tmax, i, columns::TMAX, &file_label)?;
            let vpd = required(&vpd, i, columns::VPD_3PM, &file_label)? / VPD_HPA_PER_KPA;
            // a missing precipitation cell reads as a no-rain day
            let precip = precip[i].filter(|p| *p > NO_RAIN_THRESHOLD_MM);
            records.push(DailyRecord {
                date,
                tmin,
                tmax,
                // midpoint of the daily extremes
                tmid: (tmin + tmax) / 2.0,
                vpd,
                precip,
            });
        }

        DailySeries::new(records)
    }
}

fn float_column(df: &DataFrame, name: &str, file: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|e| Error::dataframe(file, format!("missing column '{name}'"), Some(e)))?
        .cast(&DataType::Float64)
        .map_err(|e| Error::dataframe(file, format!("column '{name}' is not numeric"), Some(e)))?;
    let values = column
        .f64()
        .map_err(|e| Error::dataframe(file, format!("column '{name}' is not numeric"), Some(e)))?;
    Ok(values.into_iter().collect())
}

fn required(values: &[Option<f64>], row: usize, name: &str, file: &str) -> Result<f64> {
    values[row]
        .ok_or_else(|| Error::series_format(file, format!("missing '{name}' value at row {row}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_series_csv(dir: &TempDir, lat: f64, lon: f64, rows: &[(f64, f64, f64, f64)]) {
        let path = dir.path().join(series_filename(lat, lon));
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "tmin,tmax,vprp3pm,pre").unwrap();
        for (tmin, tmax, vpd, pre) in rows {
            writeln!(file, "{tmin},{tmax},{vpd},{pre}").unwrap();
        }
    }

    #[test]
    fn test_load_converts_and_masks() {
        let dir = TempDir::new().unwrap();
        write_series_csv(
            &dir,
            -35.5,
            148.25,
            &[
                (10.0, 20.0, 12.0, 5.0),
                (11.0, 21.0, 8.0, 0.1), // below the no-rain threshold
                (12.0, 22.0, 6.0, 0.0),
            ],
        );

        let store = SeriesStore::new(dir.path());
        let series = store.load(-35.5, 148.25, 2010).unwrap();

        assert_eq!(series.start(), NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(series.len(), 3);

        let first = &series.records()[0];
        assert_eq!(first.tmid, 15.0);
        assert_eq!(first.vpd, 1.2); // hPa to kPa
        assert_eq!(first.precip, Some(5.0));

        // sub-threshold and zero rain are both no-rain days
        assert_eq!(series.records()[1].precip, None);
        assert_eq!(series.records()[2].precip, None);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = SeriesStore::new(dir.path());
        assert!(matches!(
            store.load(-35.5, 148.25, 2010),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_cache_returns_same_series() {
        let dir = TempDir::new().unwrap();
        write_series_csv(&dir, -35.5, 148.25, &[(10.0, 20.0, 12.0, 5.0)]);

        let store = SeriesStore::new(dir.path());
        let a = store.load(-35.5, 148.25, 2010).unwrap();
        let b = store.load(-35.5, 148.25, 2010).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(series_filename(-35.5, 148.25));
        std::fs::write(&path, "tmin,tmax\n10.0,20.0\n").unwrap();

        let store = SeriesStore::new(dir.path());
        assert!(store.load(-35.5, 148.25, 2010).is_err());
    }
}
