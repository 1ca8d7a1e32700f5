//! Site list loading
//!
//! Reads and validates `species_list_location_dates.csv`: one row per site
//! with a species name, coordinate, and the old and modern seed-collection
//! dates. Sites are returned sorted by coordinate so that consecutive sites
//! at the same location reuse one loaded series.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::info;

use crate::app::models::Site;
use crate::constants::{columns, INPUT_DATE_FORMATS, LOOKBACK_YEARS};
use crate::{Error, Result};

/// Load the site list, sorted by (lat, lon).
pub fn load_sites(path: &Path) -> Result<Vec<Site>> {
    if !path.exists() {
        return Err(Error::file_not_found(path.display().to_string()));
    }
    let file_label = path.display().to_string();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| Error::dataframe(&file_label, "failed to open CSV", Some(e)))?
        .finish()
        .map_err(|e| Error::dataframe(&file_label, "failed to read CSV", Some(e)))?;

    let species = string_column(&df, columns::SPECIES, &file_label)?;
    let lat = float_column(&df, columns::LAT, &file_label)?;
    let lon = float_column(&df, columns::LON, &file_label)?;
    let old = string_column(&df, columns::OLD_COLLECTION, &file_label)?;
    let modern = string_column(&df, columns::MODERN_COLLECTION, &file_label)?;

    let mut sites = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let field = |name: &str, value: Option<&str>| -> Result<String> {
            value
                .map(str::to_string)
                .ok_or_else(|| Error::site_list(&file_label, format!("row {row}: missing {name}")))
        };
        let species = field(columns::SPECIES, species[row].as_deref())?;
        let lat = lat[row]
            .ok_or_else(|| Error::site_list(&file_label, format!("row {row}: missing Lat")))?;
        let lon = lon[row]
            .ok_or_else(|| Error::site_list(&file_label, format!("row {row}: missing Lon")))?;
        let old_collection = parse_date(&field(columns::OLD_COLLECTION, old[row].as_deref())?)?;
        let modern_collection =
            parse_date(&field(columns::MODERN_COLLECTION, modern[row].as_deref())?)?;
        if modern_collection < old_collection {
            return Err(Error::site_list(
                &file_label,
                format!("row {row}: modern collection predates old collection"),
            ));
        }
        sites.push(Site {
            species,
            lat,
            lon,
            old_collection,
            modern_collection,
        });
    }

    if sites.is_empty() {
        return Err(Error::site_list(&file_label, "no sites found"));
    }

    sites.sort_by(|a, b| {
        a.lat
            .partial_cmp(&b.lat)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.lon.partial_cmp(&b.lon).unwrap_or(std::cmp::Ordering::Equal))
    });

    info!(count = sites.len(), "loaded site list");
    Ok(sites)
}

/// First year of series coverage for a group of co-located sites: five years
/// before the oldest old-collection year.
pub fn first_series_year(sites: &[&Site]) -> i32 {
    sites
        .iter()
        .map(|s| s.old_collection.year())
        .min()
        .unwrap_or(0)
        - LOOKBACK_YEARS as i32
}

/// Parse a collection date, accepting ISO and day-first formats.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    for format in INPUT_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date);
        }
    }
    Err(Error::date_parsing(format!(
        "unrecognised date '{text}' (expected YYYY-MM-DD or DD/MM/YYYY)"
    )))
}

fn string_column(df: &DataFrame, name: &str, file: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|e| Error::dataframe(file, format!("missing column '{name}'"), Some(e)))?;
    let values = column
        .str()
        .map_err(|e| Error::dataframe(file, format!("column '{name}' is not text"), Some(e)))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
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
