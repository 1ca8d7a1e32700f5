//! Climatological season classification
//!
//! Maps a site latitude and a date to the set of calendar months forming the
//! climatological season containing that date. Tropical sites (|lat| < 23.45°)
//! use a wet/dry split; everywhere else uses the four austral seasons.

use chrono::{Datelike, NaiveDate};

use crate::constants::TROPICS_LATITUDE_DEG;

/// Months of the tropical dry season (May through October).
const TROPICAL_DRY: [u32; 6] = [5, 6, 7, 8, 9, 10];
/// Months of the tropical wet season (November through April).
const TROPICAL_WET: [u32; 6] = [11, 12, 1, 2, 3, 4];

const AUTUMN: [u32; 3] = [3, 4, 5];
const WINTER: [u32; 3] = [6, 7, 8];
const SPRING: [u32; 3] = [9, 10, 11];
const SUMMER: [u32; 3] = [12, 1, 2];

/// Calendar months of the climatological season containing `date` at a site
/// with the given latitude. Total over all inputs.
pub fn season_months(latitude: f64, date: NaiveDate) -> Vec<u32> {
    let month = date.month();
    if latitude.abs() < TROPICS_LATITUDE_DEG {
        if TROPICAL_DRY.contains(&month) {
            TROPICAL_DRY.to_vec()
        } else {
            TROPICAL_WET.to_vec()
        }
    } else if AUTUMN.contains(&month) {
        AUTUMN.to_vec()
    } else if WINTER.contains(&month) {
        WINTER.to_vec()
    } else if SPRING.contains(&month) {
        SPRING.to_vec()
    } else {
        SUMMER.to_vec()
    }
}
