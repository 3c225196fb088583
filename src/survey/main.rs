//! Settlement survey batch run.
//!
//! Filters a grid of candidate points to a national border, looks up
//! populated places around each survivor and writes the pairs to CSV.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use larch::input::{load_candidates, load_exclusions};
use larch::matcher::{NameValidator, SettlementMatcher};
use larch::overpass::OverpassClient;
use larch::pip::{load_border, BorderIndex, BoundarySource, PointFilter};
use larch::pipeline::Survey;
use larch::report::{assemble, write_report};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "survey")]
#[command(about = "Find settlements near grid points inside a national border")]
struct Args {
    /// TOML config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Candidate points CSV (longitude, latitude, name, population)
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// Exclusion list, one settlement name per line
    #[arg(short, long)]
    exclusions: Option<PathBuf>,

    /// Boundary GeoJSON file path or URL
    #[arg(long)]
    border: Option<String>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search radius around each point, in kilometers
    #[arg(long)]
    radius_km: Option<f64>,

    /// Filter points on all cores
    #[arg(long)]
    parallel_filter: bool,
}

impl Args {
    /// Fold command line overrides into the loaded config
    fn apply(self, mut config: Config) -> Config {
        if let Some(points) = self.points {
            config.input.points = points;
        }
        if let Some(exclusions) = self.exclusions {
            config.input.exclusions = Some(exclusions);
        }
        if let Some(border) = self.border {
            config.border.source = border;
        }
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(radius_km) = self.radius_km {
            config.lookup.radius_km = radius_km;
        }
        if self.parallel_filter {
            config.border.parallel_filter = true;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let config = args.apply(config);

    info!("Larch Settlement Survey");

    // The border is required before anything else runs
    let http = reqwest::Client::builder()
        .user_agent(config.lookup.user_agent.clone())
        .timeout(Duration::from_secs(config.lookup.timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;
    let source = BoundarySource::parse(&config.border.source);
    let border = load_border(&source, &http)
        .await
        .context("Failed to load national boundary, aborting")?;
    let index = BorderIndex::build(border).context("Failed to index national boundary")?;

    let candidates = load_candidates(&config.input.points)?;
    let exclusions = match &config.input.exclusions {
        Some(path) => load_exclusions(path)?,
        None => {
            warn!("No exclusion list configured");
            Vec::new()
        }
    };

    let validator = NameValidator::new(&config.matcher.name_pattern)
        .context("Invalid settlement name pattern")?;

    let filter = PointFilter::new(&index)
        .with_buffer(config.border.buffer_degrees)
        .with_seam_retry(config.border.seam_retry.policy());
    let matcher = SettlementMatcher::new(&index, validator, exclusions);
    let lookup = OverpassClient::new(config.lookup.overpass_options())?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut survey = Survey::new(filter, matcher, lookup)
        .with_radius_km(config.lookup.radius_km)
        .with_rate_limiter(config.lookup.rate_limiter())
        .with_parallel_filter(config.border.parallel_filter)
        .with_progress(pb);

    let results = survey.run(candidates).await;
    let rows = assemble(&results);
    write_report(&config.output.path, &rows)?;

    info!(
        "Processing complete. Results saved to {}",
        config.output.path.display()
    );
    Ok(())
}
