//! Command-line interface for `stacreg`, a toolkit that harvests
//! Earth-observation resources and registers them as STAC records.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for
//! structured logging. It acts as a thin façade that parses arguments,
//! overlays optional TOML configuration, and delegates to command handlers
//! in [`commands`].
//!
//! # Available Commands
//!
//! - `harvest` - Query an OSEO endpoint and write STAC item NDJSON
//! - `register` - Load item NDJSON into a pgstac database
//! - `export` - Write item NDJSON to GeoParquet
//! - `inspect` - Display metadata extracted from a GeoTIFF
//! - `quicklook` - Render a browse image for a GeoTIFF
//! - `colormap` - Convert between raster style formats
//! - `formats` - List all formats and their capabilities

mod commands;
mod config;
mod display;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use commands::StyleArgs;
use config::StacRegConfig;
use stacreg_core::StacRegError;

#[derive(Parser)]
#[command(
    name = "stacreg",
    version,
    about = "Harvest and register geospatial resources as STAC records",
    long_about = "stacreg harvests Earth-observation products from OpenSearch EO endpoints,\n\
                  extracts geospatial metadata, renders quicklooks, and registers the\n\
                  resulting STAC records into pgstac or GeoParquet."
)]
/// Command-line arguments and options for the `stacreg` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to a TOML config file supplying endpoint/DSN defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `stacreg` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Queries an OpenSearch EO endpoint and writes STAC items as NDJSON.
    #[cfg(feature = "oseo")]
    Harvest {
        /// OSEO endpoint URL (falls back to the config file).
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Remote collection (`parentIdentifier`) to search.
        #[arg(short, long, value_name = "ID")]
        collection: Option<String>,

        /// Lower time bound (RFC 3339 or YYYY-MM-DD).
        #[arg(long, value_name = "TIME")]
        start: Option<String>,

        /// Upper time bound (RFC 3339 or YYYY-MM-DD).
        #[arg(long, value_name = "TIME")]
        end: Option<String>,

        /// Spatial filter as `xmin,ymin,xmax,ymax` (WGS84).
        #[arg(long, value_name = "BBOX")]
        bbox: Option<String>,

        /// Product type filter.
        #[arg(long, value_name = "TYPE")]
        product_type: Option<String>,

        /// Stop after this many resources.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Records per request page.
        #[arg(long, value_name = "N")]
        page_size: Option<u32>,

        /// Output NDJSON path.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Loads STAC item NDJSON into a pgstac database.
    #[cfg(feature = "db")]
    Register {
        /// Input NDJSON path.
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Postgres connection string (falls back to the config file).
        #[arg(long, value_name = "DSN")]
        dsn: Option<String>,

        /// Collection document to upsert before the items.
        #[arg(long, value_name = "FILE")]
        collection_file: Option<PathBuf>,

        /// Items per transaction.
        #[arg(long, value_name = "N", default_value_t = 100)]
        chunk_size: usize,
    },

    /// Writes STAC item NDJSON to a GeoParquet file.
    #[cfg(feature = "geoparquet")]
    Export {
        /// Input NDJSON path.
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output GeoParquet path.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Displays metadata extracted from a GeoTIFF.
    Inspect {
        /// Input GeoTIFF path.
        #[arg(value_name = "RASTER")]
        input: PathBuf,
    },

    /// Renders a quicklook for a GeoTIFF, optionally color-relief shaded.
    Quicklook {
        /// Input GeoTIFF path.
        #[arg(short, long, value_name = "RASTER")]
        input: PathBuf,

        /// Output GeoTIFF path.
        #[arg(short, long, value_name = "RASTER")]
        output: PathBuf,

        /// Maximum edge length of the output in pixels.
        #[arg(long, value_name = "N", default_value_t = 1024)]
        max_size: u32,

        /// Color table file (CPT, SLD or GeoCSS, inferred from extension).
        #[arg(long, value_name = "FILE")]
        color_table: Option<PathBuf>,

        /// Explicit scaling range as `min,max` instead of the band min/max.
        #[arg(long, value_name = "RANGE")]
        scale: Option<String>,
    },

    /// Converts a color map between style formats.
    Colormap {
        /// Input style file.
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output style file.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Input format (overrides extension inference).
        #[arg(long, value_name = "FORMAT")]
        input_format: Option<String>,

        /// Output format (overrides extension inference).
        #[arg(long, value_name = "FORMAT")]
        output_format: Option<String>,

        /// Title written into the output style.
        #[arg(long, value_name = "TEXT")]
        title: Option<String>,

        /// Description written into the output style.
        #[arg(long, value_name = "TEXT")]
        description: Option<String>,

        /// Emit per-entry labels.
        #[arg(long)]
        labels: bool,

        /// Emit per-entry opacity.
        #[arg(long)]
        opacity: bool,
    },

    /// Lists all formats and their capabilities.
    Formats,
}

/// Entry point for the `stacreg` command-line interface.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        },
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Errors carry a user message and, where the taxonomy knows one, a
/// recovery suggestion.
fn report_error(e: &anyhow::Error) {
    if let Some(domain) = e.downcast_ref::<StacRegError>() {
        eprintln!("{}", domain.user_message());
        if let Some(suggestion) = domain.recovery_suggestion() {
            eprintln!("\n{suggestion}");
        }
    } else {
        eprintln!("Error: {e:#}");
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StacRegConfig::load(path)?,
        None => StacRegConfig::default(),
    };

    match cli.command {
        #[cfg(feature = "oseo")]
        Commands::Harvest {
            endpoint,
            collection,
            start,
            end,
            bbox,
            product_type,
            limit,
            page_size,
            output,
        } => {
            let endpoint = StacRegConfig::resolve(endpoint, config.endpoint.as_ref())
                .ok_or_else(|| anyhow!("no endpoint given (flag --endpoint or config file)"))?;
            let collection =
                StacRegConfig::resolve(collection, config.collection.as_ref());
            let page_size = StacRegConfig::resolve(page_size, config.page_size.as_ref());

            let params = stacreg_harvest::SearchParams {
                collection: collection.clone(),
                start: start
                    .as_deref()
                    .map(commands::parse_time)
                    .transpose()?
                    .map(|t| t.to_rfc3339()),
                end: end
                    .as_deref()
                    .map(commands::parse_time)
                    .transpose()?
                    .map(|t| t.to_rfc3339()),
                bbox: bbox.as_deref().map(commands::parse_bbox).transpose()?,
                product_type,
                limit,
            };
            commands::handle_harvest(
                &endpoint,
                params,
                collection.as_deref(),
                page_size,
                &output,
            )
            .await?;
        },

        #[cfg(feature = "db")]
        Commands::Register {
            input,
            dsn,
            collection_file,
            chunk_size,
        } => {
            let dsn = StacRegConfig::resolve(dsn, config.dsn.as_ref())
                .ok_or_else(|| anyhow!("no DSN given (flag --dsn or config file)"))?;
            commands::handle_register(&input, &dsn, collection_file.as_deref(), chunk_size)
                .await?;
        },

        #[cfg(feature = "geoparquet")]
        Commands::Export { input, output } => {
            commands::handle_export(&input, &output)?;
        },

        Commands::Inspect { input } => {
            commands::handle_inspect(&input)?;
        },

        Commands::Quicklook {
            input,
            output,
            max_size,
            color_table,
            scale,
        } => {
            let scale = scale.as_deref().map(parse_scale).transpose()?;
            commands::handle_quicklook(&input, &output, max_size, color_table.as_deref(), scale)?;
        },

        Commands::Colormap {
            input,
            output,
            input_format,
            output_format,
            title,
            description,
            labels,
            opacity,
        } => {
            let style = StyleArgs {
                title,
                description,
                with_labels: labels,
                with_opacity: opacity,
            };
            commands::handle_colormap(
                &input,
                &output,
                input_format.as_deref(),
                output_format.as_deref(),
                &style,
            )?;
        },

        Commands::Formats => {
            display::print_formats();
        },
    }

    Ok(())
}

/// Parses a `min,max` scaling range.
fn parse_scale(text: &str) -> Result<(f64, f64)> {
    let (min, max) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("scale '{text}' must be 'min,max'"))?;
    let min: f64 = min
        .trim()
        .parse()
        .with_context(|| format!("scale minimum '{min}' is not numeric"))?;
    let max: f64 = max
        .trim()
        .parse()
        .with_context(|| format!("scale maximum '{max}' is not numeric"))?;
    if min >= max {
        return Err(anyhow!("scale '{text}' minimum must be below maximum"));
    }
    Ok((min, max))
}
