//! AGCD Analyzer Library
//!
//! A Rust library for analysing daily Australian Gridded Climate Data (AGCD)
//! at site level. For every site and seed-collection date it computes climate
//! summaries over lookback windows of increasing length (day, week, month,
//! three months, five years) together with extreme-event metrics: heatwave
//! spells, atmospheric dry spells, and rainless spells.
//!
//! This library provides tools for:
//! - Loading and validating the site list with old/modern collection dates
//! - Loading per-coordinate daily series with unit conversion and no-rain masking
//! - Trailing-mean smoothing and run detection for spell metrics
//! - Window aggregation with month-grouped sub-statistics
//! - Season-aware pooling of spells across a five-year lookback
//! - Writing the per-window and per-metric CSV result files

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod report;
        pub mod runs;
        pub mod season;
        pub mod series_store;
        pub mod site_analyzer;
        pub mod site_list;
        pub mod smoothing;
        pub mod spells;
        pub mod stats;
        pub mod window;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{DailyRecord, DailySeries, Epoch, Site, Window};
pub use config::Config;

/// Result type alias for the AGCD analyzer
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for AGCD analysis operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// DataFrame/CSV operation failed
    #[error("DataFrame error in '{file}': {message}")]
    DataFrame {
        file: String,
        message: String,
        #[source]
        source: Option<polars::error::PolarsError>,
    },

    /// Site list format error
    #[error("Site list error in '{file}': {message}")]
    SiteList { file: String, message: String },

    /// Daily series format error
    #[error("Series format error in '{file}': {message}")]
    SeriesFormat { file: String, message: String },

    /// A required date is not covered by the loaded series
    #[error("Date {date} is not covered by the daily series")]
    DateLookup { date: chrono::NaiveDate },

    /// Series violates the contiguous-daily precondition
    #[error("Malformed daily series: {message}")]
    MalformedSeries { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Date parsing error
    #[error("Date parsing error: {message}")]
    DateParsing {
        message: String,
        #[source]
        source: Option<chrono::ParseError>,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// A background worker task failed
    #[error("Worker task failed: {message}")]
    Worker { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a DataFrame error with context
    pub fn dataframe(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<polars::error::PolarsError>,
    ) -> Self {
        Self::DataFrame {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a site list error
    pub fn site_list(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SiteList {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a series format error
    pub fn series_format(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SeriesFormat {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a date lookup error
    pub fn date_lookup(date: chrono::NaiveDate) -> Self {
        Self::DateLookup { date }
    }

    /// Create a malformed series error
    pub fn malformed_series(message: impl Into<String>) -> Self {
        Self::MalformedSeries {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a date parsing error without an underlying chrono source
    pub fn date_parsing(message: impl Into<String>) -> Self {
        Self::DateParsing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a worker task error
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::DataFrame {
            file: "unknown".to_string(),
            message: "DataFrame operation failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Self::DateParsing {
            message: "Date parsing failed".to_string(),
            source: Some(error),
        }
    }
}
