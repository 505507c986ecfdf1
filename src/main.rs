//! Decoy-Cloner main entry point
//!
//! This is the command-line interface for the Decoy-Cloner website cloner.

use clap::Parser;
use decoy_cloner::config::{
    compute_effective_hash, load_config_with_hash, validate, Config, Renderer,
};
use decoy_cloner::crawler::{build_backend, Cloner};
use decoy_cloner::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use decoy_cloner::storage::{Manifest, SqliteManifest};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Decoy-Cloner: a recursive website cloner
///
/// Decoy-Cloner crawls a target site up to a bounded depth and writes every
/// page it reaches into its own directory, ready to be served back by a decoy
/// web server.
#[derive(Parser, Debug)]
#[command(name = "decoy-cloner")]
#[command(version = "1.0.0")]
#[command(about = "A recursive website cloner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "target")]
    config: Option<PathBuf>,

    /// Seed URL to clone (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    target: Option<String>,

    /// Maximum link depth to follow from the seed
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Render pages in a headless browser instead of plain HTTP
    #[arg(long)]
    headless: bool,

    /// Run the HTML/CSS validator over every stored page
    #[arg(long)]
    validate: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics for the latest run from the manifest and exit
    #[arg(long, conflicts_with = "export_summary")]
    stats: bool,

    /// Generate markdown summary of the latest run and exit
    #[arg(long, conflicts_with = "stats")]
    export_summary: bool,
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.target.is_some() || self.max_depth.is_some() || self.headless || self.validate
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match load_effective_config(&cli) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_clone(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("decoy_cloner=info,warn"),
            1 => EnvFilter::new("decoy_cloner=debug,info"),
            2 => EnvFilter::new("decoy_cloner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> Result<(Config, String), Box<dyn std::error::Error>> {
    let (mut config, file_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            (config, Some(hash))
        }
        None => {
            let target = cli
                .target
                .as_deref()
                .ok_or("either a config file or --target is required")?;
            (Config::for_target(target), None)
        }
    };

    if let Some(target) = &cli.target {
        config.cloner.target = target.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.cloner.max_depth = max_depth;
    }
    if cli.headless {
        config.cloner.renderer = Renderer::Headless;
    }
    if cli.validate {
        config.cloner.validate = true;
    }
    validate(&config)?;

    let hash = match file_hash {
        Some(hash) if !cli.has_overrides() => hash,
        _ => compute_effective_hash(&config)?,
    };
    Ok((config, hash))
}

/// Handles the --stats mode: shows statistics for the latest run
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Manifest: {}\n", config.output.manifest_path);

    let manifest = SqliteManifest::new(Path::new(&config.output.manifest_path))?;
    let run = manifest
        .get_latest_run()?
        .ok_or("no clone runs recorded in the manifest")?;

    let stats = load_statistics(&manifest, run.id)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Clone Summary ===\n");
    println!("Manifest: {}", config.output.manifest_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let manifest = SqliteManifest::new(Path::new(&config.output.manifest_path))?;

    tracing::info!("Loading clone data from manifest...");
    let summary = generate_summary(&manifest)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the main clone operation
async fn handle_clone(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Cloning {} into {}",
        config.cloner.target,
        config.output.target_dir
    );

    let backend = build_backend(&config).await?;
    let manifest = SqliteManifest::new(Path::new(&config.output.manifest_path))?;
    let mut cloner = Cloner::new(&config, backend)?.with_manifest(Box::new(manifest), &config_hash);

    let cancel = cloner.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping clone");
            cancel.cancel();
        }
    });

    let report = match cloner.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Clone failed: {}", e);
            return Err(e.into());
        }
    };

    println!(
        "Stored {} pages ({} failed, {} skipped, {} external links ignored) in {:.1}s",
        report.stored.len(),
        report.failed,
        report.skipped,
        report.external,
        report.elapsed.as_secs_f64()
    );
    if report.cancelled {
        println!("Clone interrupted; {} pages abandoned", report.abandoned);
    }

    if let Some(manifest) = cloner.into_manifest() {
        let summary = generate_summary(manifest.as_ref())?;
        generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;
        tracing::info!("Summary written to {}", config.output.summary_path);
    }

    Ok(())
}
