//! Application constants for the AGCD analyzer
//!
//! This module contains the definitional thresholds, window lengths,
//! file naming conventions and column labels used throughout the analyzer.

// =============================================================================
// Definitional Thresholds
// =============================================================================

/// Bureau of Meteorology "no precipitation" threshold in mm/day.
///
/// Daily totals at or below this value are classified as rainless. The odd
/// trailing digits come from the float32 representation of 0.2 in the source
/// gridded dataset and are kept so that masking decisions match it bit-for-bit.
pub const NO_RAIN_THRESHOLD_MM: f64 = 0.200000002980232;

/// Latitude (degrees, absolute) below which the tropical wet/dry season
/// classification applies instead of the four mid-latitude seasons.
pub const TROPICS_LATITUDE_DEG: f64 = 23.45;

/// Conversion divisor from hPa to kPa for the 3pm vapour-pressure-deficit.
pub const VPD_HPA_PER_KPA: f64 = 10.0;

// =============================================================================
// Spell Detection Parameters
// =============================================================================

/// Length of the short trailing-mean window used for the excess signal [days].
pub const EXCESS_SHORT_WINDOW_DAYS: usize = 3;

/// Length of the climatological baseline trailing-mean window [days].
pub const EXCESS_BASELINE_WINDOW_DAYS: usize = 30;

/// Offset between the short window and its baseline: the baseline mean ends
/// this many days before the date under test.
pub const EXCESS_BASELINE_LAG_DAYS: usize = 3;

/// Minimum run length for a heatwave or atmospheric dry spell [days].
pub const MIN_SPELL_DAYS: usize = 3;

/// Minimum run length reported by the run detector (singletons are dropped).
pub const MIN_RUN_DAYS: usize = 2;

/// Number of one-year slices in the extreme-metrics lookback.
pub const LOOKBACK_YEARS: usize = 5;

/// Labels for the five lookback year slices, newest first.
pub const YEAR_SLICE_LABELS: [&str; LOOKBACK_YEARS] = ["y1", "y2", "y3", "y4", "y5"];

// =============================================================================
// File and Directory Constants
// =============================================================================

/// Site list filename expected inside the input directory.
pub const SITE_LIST_FILENAME: &str = "species_list_location_dates.csv";

/// Build the per-coordinate series filename for a site location.
///
/// Mirrors the upstream convention of trimming trailing zeros from the
/// printed coordinates, e.g. `AGCD_met_-35.5_148.25.csv`.
pub fn series_filename(lat: f64, lon: f64) -> String {
    format!("AGCD_met_{}_{}.csv", trim_coord(lat), trim_coord(lon))
}

fn trim_coord(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Date format used when rendering collection dates and spell date ranges.
pub const OUTPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Date formats accepted when parsing collection dates from the site list.
pub const INPUT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

// =============================================================================
// Column Name Constants
// =============================================================================

/// Column names in the site list and series input files.
pub mod columns {
    // Site list columns
    pub const SPECIES: &str = "Species";
    pub const LAT: &str = "Lat";
    pub const LON: &str = "Lon";
    pub const OLD_COLLECTION: &str = "Old seed collection date";
    pub const MODERN_COLLECTION: &str = "Modern seed collection date";

    // Daily series columns
    pub const TMIN: &str = "tmin";
    pub const TMAX: &str = "tmax";
    pub const VPD_3PM: &str = "vprp3pm";
    pub const PRECIP: &str = "pre";
}

// =============================================================================
// Processing Defaults
// =============================================================================

/// Default number of parallel site-analysis workers.
pub fn default_parallel_workers() -> usize {
    num_cpus::get().clamp(1, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_filename_trims_trailing_zeros() {
        assert_eq!(series_filename(-35.50, 148.250), "AGCD_met_-35.5_148.25.csv");
        assert_eq!(series_filename(-35.0, 148.0), "AGCD_met_-35_148.csv");
    }

    #[test]
    fn test_no_rain_threshold_is_near_point_two() {
        assert!((NO_RAIN_THRESHOLD_MM - 0.2).abs() < 1e-8);
    }

    #[test]
    fn test_default_workers_bounded() {
        let workers = default_parallel_workers();
        assert!((1..=8).contains(&workers));
    }
}
