use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use lab_model::RawSample;
use labview_core::config::{
    date_format_from_env_value, sample_concept_key_from_env_value, utc_offset_from_env_value,
};
use labview_core::constants::{
    DEFAULT_LOG_DIRECTIVE, ENV_DATE_FORMAT, ENV_SAMPLE_CONCEPT_KEY, ENV_UTC_OFFSET,
};
use labview_core::{load_reference_table_opt, load_sample, SampleViewBuilder, ViewConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labview")]
#[command(about = "Laboratory sample view builder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the display view of a sample and print it as JSON
    Build {
        /// Raw sample file (.json, .yaml or .yml)
        #[arg(long)]
        sample: PathBuf,
        /// Department reference table (optional)
        #[arg(long)]
        departments: Option<PathBuf>,
        /// Specimen source reference table (optional)
        #[arg(long)]
        specimen_sources: Option<PathBuf>,
        /// Rejection reason reference table (optional)
        #[arg(long)]
        rejection_reasons: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a sample file and print a one-line summary
    Check {
        /// Raw sample file (.json, .yaml or .yml)
        #[arg(long)]
        sample: PathBuf,
    },
}

/// Entry point for the `labview` command-line tool.
///
/// Logs go to stderr so that stdout carries only the rendered view.
///
/// # Environment Variables
/// - `LABVIEW_UTC_OFFSET`: offset used to render status dates (default: UTC)
/// - `LABVIEW_DATE_FORMAT`: chrono format for the calendar date (default: `%-m/%-d/%Y`)
/// - `LABVIEW_SAMPLE_CONCEPT_KEY`: `uid` or `uuid`, the sample concept field used for the
///   sample-level department and specimen lookup (default: `uid`)
/// - `RUST_LOG`: log filter (default directive: `labview=info`)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(DEFAULT_LOG_DIRECTIVE.parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Build {
            sample,
            departments,
            specimen_sources,
            rejection_reasons,
            pretty,
        }) => {
            let cfg = view_config_from_env()?;

            let raw = load_sample(&sample)?;
            let departments = load_reference_table_opt(departments.as_deref())?;
            let specimen_sources = load_reference_table_opt(specimen_sources.as_deref())?;
            let rejection_reasons = load_reference_table_opt(rejection_reasons.as_deref())?;

            let builder = SampleViewBuilder::new(Arc::new(cfg));
            let view = builder.build(&raw, &departments, &specimen_sources, &rejection_reasons);
            tracing::info!(
                sample = %sample.display(),
                orders = view.orders.len(),
                orders_with_results = view.orders_with_results.len(),
                "built sample view"
            );
            println!("{}", view.to_json(pretty)?);
        }
        Some(Commands::Check { sample }) => {
            let raw = load_sample(&sample)
                .with_context(|| format!("sample file {} is not valid", sample.display()))?;
            println!("{}", summarise(&raw));
        }
        None => {
            println!("Use 'labview --help' for commands");
        }
    }

    Ok(())
}

/// Resolve the view configuration from the process environment.
fn view_config_from_env() -> anyhow::Result<ViewConfig> {
    let utc_offset = utc_offset_from_env_value(std::env::var(ENV_UTC_OFFSET).ok())
        .with_context(|| format!("reading {ENV_UTC_OFFSET}"))?;
    let date_format = date_format_from_env_value(std::env::var(ENV_DATE_FORMAT).ok())
        .with_context(|| format!("reading {ENV_DATE_FORMAT}"))?;
    let sample_concept_key =
        sample_concept_key_from_env_value(std::env::var(ENV_SAMPLE_CONCEPT_KEY).ok())
            .with_context(|| format!("reading {ENV_SAMPLE_CONCEPT_KEY}"))?;

    Ok(ViewConfig::new(
        Utc::now(),
        utc_offset,
        date_format,
        sample_concept_key,
    )?)
}

fn summarise(sample: &RawSample) -> String {
    let allocations: usize = sample
        .orders
        .iter()
        .map(|order| order.test_allocations.len())
        .sum();

    format!(
        "sample {}: {} orders, {} test allocations, {} statuses",
        sample.uuid.as_deref().unwrap_or("<no uuid>"),
        sample.orders.len(),
        allocations,
        sample.statuses.len()
    )
}
