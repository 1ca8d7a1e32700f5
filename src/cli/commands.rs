//! Command implementations for the AGCD analyzer CLI
//!
//! This module contains the main command execution logic, progress
//! reporting, and error handling for the CLI interface.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::app::models::{DailySeries, Site};
use crate::app::services::report::ReportWriter;
use crate::app::services::series_store::SeriesStore;
use crate::app::services::site_analyzer::{analyze_site, SiteAnalysis};
use crate::app::services::site_list;
use crate::cli::args::{Args, Commands, OutputFormat, ProcessArgs, SitesArgs};
use crate::config::Config;
use crate::{Error, Result};

/// Processing statistics for reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    /// Number of sites in the site list
    pub sites_total: usize,
    /// Number of sites analyzed
    pub sites_analyzed: usize,
    /// Number of sites that failed
    pub sites_failed: usize,
    /// Number of distinct series files loaded
    pub series_loaded: usize,
    /// Number of result files written
    pub files_written: usize,
    /// Total processing time in seconds
    pub elapsed_seconds: f64,
}

/// Main command runner for the analyzer
pub async fn run(args: Args) -> Result<ProcessingStats> {
    match args.command {
        Some(Commands::Process(process_args)) => process(process_args).await,
        Some(Commands::Sites(sites_args)) => sites(sites_args),
        None => Err(Error::configuration("no command given")),
    }
}

// =============================================================================
// Process Command
// =============================================================================

async fn process(args: ProcessArgs) -> Result<ProcessingStats> {
    let start_time = Instant::now();

    setup_logging(args.log_level(), args.quiet);
    info!("Starting AGCD analyzer");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);

    let sites = site_list::load_sites(&config.site_list_path())?;
    let groups = group_by_coordinate(sites);
    info!(
        coordinates = groups.len(),
        "analyzing sites grouped by coordinate"
    );

    let mut stats = ProcessingStats {
        sites_total: groups.iter().map(|g| g.len()).sum(),
        ..Default::default()
    };

    // Load each distinct series once, then fan the sites out to workers.
    let store = SeriesStore::new(&config.io.input_dir);
    let mut tasks: Vec<(Site, Arc<DailySeries>)> = Vec::new();
    for group in groups {
        let refs: Vec<&Site> = group.iter().collect();
        let first_year = site_list::first_series_year(&refs);
        match store.load(group[0].lat, group[0].lon, first_year) {
            Ok(series) => {
                stats.series_loaded += 1;
                for site in group {
                    tasks.push((site, Arc::clone(&series)));
                }
            }
            Err(e) => {
                error!(
                    lat = group[0].lat,
                    lon = group[0].lon,
                    %e,
                    "failed to load series, skipping its sites"
                );
                stats.sites_failed += group.len();
            }
        }
    }

    let progress_bar = if !args.quiet {
        let pb = ProgressBar::new(tasks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Analyzing sites...");
        Some(pb)
    } else {
        None
    };

    let workers = config.performance.workers;
    let mut results = stream::iter(tasks)
        .map(|(site, series)| {
            tokio::task::spawn_blocking(move || analyze_site(&series, &site))
        })
        .buffer_unordered(workers);

    let mut analyses: Vec<SiteAnalysis> = Vec::new();
    while let Some(joined) = results.next().await {
        match joined {
            Ok(analysis) => {
                debug!(species = %analysis.site.species, "site analyzed");
                analyses.push(analysis);
                stats.sites_analyzed += 1;
            }
            Err(e) => {
                error!("site analysis task failed: {e}");
                stats.sites_failed += 1;
            }
        }
        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = &progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    let writer = ReportWriter::new(&config.io.output_dir);
    let written = writer.write_all(&analyses)?;
    stats.files_written = written.len();
    stats.elapsed_seconds = start_time.elapsed().as_secs_f64();

    report_summary(&args.output_format, &stats)?;
    Ok(stats)
}

/// Load configuration and apply CLI overrides.
fn load_configuration(args: &ProcessArgs) -> Result<Config> {
    let mut config = Config::load(args.config_file.as_deref())?;
    if let Some(input) = &args.input_dir {
        config.io.input_dir = input.clone();
    }
    if let Some(output) = &args.output_dir {
        config.io.output_dir = output.clone();
    }
    if let Some(workers) = args.workers {
        config.performance.workers = workers;
    }
    config.validate()?;
    Ok(config)
}

/// Group coordinate-sorted sites into runs sharing one series file.
fn group_by_coordinate(sites: Vec<Site>) -> Vec<Vec<Site>> {
    let mut groups: Vec<Vec<Site>> = Vec::new();
    for site in sites {
        match groups.last_mut() {
            Some(group) if group[0].coordinate_key() == site.coordinate_key() => {
                group.push(site);
            }
            _ => groups.push(vec![site]),
        }
    }
    groups
}

fn report_summary(format: &OutputFormat, stats: &ProcessingStats) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(stats)
                .map_err(|e| Error::configuration(format!("summary serialization failed: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Human => {
            println!("Analysis complete:");
            println!("  Sites analyzed:  {}/{}", stats.sites_analyzed, stats.sites_total);
            if stats.sites_failed > 0 {
                println!("  Sites failed:    {}", stats.sites_failed);
            }
            println!("  Series loaded:   {}", stats.series_loaded);
            println!("  Files written:   {}", stats.files_written);
            println!(
                "  Total time:      {}",
                HumanDuration(std::time::Duration::from_secs_f64(stats.elapsed_seconds))
            );
        }
    }
    Ok(())
}

// =============================================================================
// Sites Command
// =============================================================================

fn sites(args: SitesArgs) -> Result<ProcessingStats> {
    setup_logging(args.log_level(), args.quiet);

    let input_dir = args
        .input_dir
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("input"));
    let site_list_path = input_dir.join(crate::constants::SITE_LIST_FILENAME);
    let sites = site_list::load_sites(&site_list_path)?;

    match args.output_format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = sites
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "species": s.species,
                        "lat": s.lat,
                        "lon": s.lon,
                        "old_collection": s.old_collection.to_string(),
                        "modern_collection": s.modern_collection.to_string(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_default());
        }
        OutputFormat::Human => {
            println!("Site list: {}", site_list_path.display());
            println!("{} sites:", sites.len());
            for site in &sites {
                println!(
                    "  {:<30} ({:.4}, {:.4})  old {}  modern {}",
                    site.species, site.lat, site.lon, site.old_collection, site.modern_collection
                );
            }
        }
    }

    Ok(ProcessingStats {
        sites_total: sites.len(),
        ..Default::default()
    })
}

// =============================================================================
// Logging
// =============================================================================

/// Set up structured logging based on CLI verbosity
fn setup_logging(log_level: &str, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agcd_analyzer={log_level}")));

    if quiet {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init();
    }

    debug!("Logging initialized at level: {log_level}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn site(species: &str, lat: f64, lon: f64) -> Site {
        Site {
            species: species.to_string(),
            lat,
            lon,
            old_collection: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            modern_collection: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_group_by_coordinate_merges_consecutive() {
        let sites = vec![
            site("a", -35.0, 148.0),
            site("b", -35.0, 148.0),
            site("c", -33.0, 150.0),
        ];
        let groups = group_by_coordinate(sites);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_group_by_coordinate_empty() {
        assert!(group_by_coordinate(Vec::new()).is_empty());
    }
}
