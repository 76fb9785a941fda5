//! card-aggregator - statistics over every Magic: The Gathering printing
//!
//! A CLI tool that downloads the Scryfall bulk card data, streams it
//! through a set of aggregators and renders static HTML/JSON reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (network, config, missing input, etc.)

mod aggregators;
mod cards;
mod cli;
mod config;
mod fetch;
mod models;
mod pipeline;
mod report;
mod rules;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use cli::{Args, Command, RunArgs};
use config::{Config, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Where the effective configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    DefaultFileInvalid(anyhow::Error),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if args.command == Command::InitConfig {
        return handle_init_config(&args);
    }

    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);
    log_config_source(&source);

    info!("card-aggregator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = match &args.command {
        Command::Download => handle_download(&args, &config).await.map(|_| ()),
        Command::Run(run_args) => handle_run(&args, run_args, &config).await,
        Command::UpdateTypes => handle_update_types(&config).await,
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default configuration file.
fn handle_init_config(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to customize data paths, download settings and count reports.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::DefaultFileInvalid(e))),
    }
}

fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
        ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
        ConfigSource::DefaultFileInvalid(e) => {
            warn!("Failed to load config: {:#}. Using defaults", e)
        }
    }
}

/// Download the latest bulk file. Returns its path.
async fn handle_download(args: &Args, config: &Config) -> Result<PathBuf> {
    let data_folder = &config.general.data_folder;
    println!("📥 Downloading bulk data ({})...", config.download.bulk_type);

    let client = fetch::build_client(&config.download.user_agent, config.download.timeout_seconds)
        .context("Failed to create HTTP client")?;
    let path = fetch::download_default_cards(&client, &config.download, data_folder, !args.quiet)
        .await
        .context("Failed to download bulk data")?;

    println!("✅ Bulk data ready: {}", path.display());
    Ok(path)
}

/// Pick the bulk file to process.
async fn resolve_input(args: &Args, run_args: &RunArgs, config: &Config) -> Result<PathBuf> {
    if let Some(ref input) = run_args.input {
        return Ok(input.clone());
    }

    if run_args.download {
        return handle_download(args, config).await;
    }

    let data_folder = &config.general.data_folder;
    fetch::find_latest_default_cards(data_folder).ok_or_else(|| {
        anyhow!(
            "No default-cards-*.json file found in {}. Run `card-aggregator download` first.",
            data_folder.display()
        )
    })
}

/// Run every aggregator over the bulk file and render the reports.
async fn handle_run(args: &Args, run_args: &RunArgs, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let input = resolve_input(args, run_args, config).await?;
    println!("🔬 Processing cards from {}", input.display());

    let mut aggregators = aggregators::build_aggregators(&config.aggregators);
    let stats = pipeline::run_pipeline(&input, &mut aggregators, !args.quiet)?;

    for aggregator in &aggregators {
        for warning in aggregator.warnings() {
            warn!("{}: {}", aggregator.name(), warning);
        }
    }

    let output_dir = output_dir_for_run(config);
    let metadata = report::RunMetadata {
        input_file: input.display().to_string(),
        card_count: stats.cards,
        generated_at: Local::now(),
    };

    println!("\n📝 Generating reports...");
    report::write_reports(&output_dir, &aggregators, &metadata)?;

    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Run Summary:");
    println!("   Cards processed: {}", stats.cards);
    if stats.skipped > 0 {
        println!("   Malformed records skipped: {}", stats.skipped);
    }
    println!("   Reports: {}", aggregators.len());
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Done! Open {} to browse the reports.",
        output_dir.join("index.html").display()
    );

    Ok(())
}

/// Timestamped output folder for this run.
fn output_dir_for_run(config: &Config) -> PathBuf {
    config
        .output_root()
        .join(Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Refresh the creature and land type tables.
async fn handle_update_types(config: &Config) -> Result<()> {
    println!("📥 Fetching comprehensive rules from {}", config.rules.rules_url);

    let client = fetch::build_client(&config.download.user_agent, config.rules.timeout_seconds)
        .context("Failed to create HTTP client")?;
    let types = rules::fetch_and_parse_types(&client, &config.rules).await?;

    let aggregators_config = &config.aggregators;
    rules::write_type_tables(
        &types,
        &aggregators_config.creature_types_file,
        &aggregators_config.land_types_file,
    )?;

    println!(
        "✅ Updated {} creature types and {} land types.",
        types.creature_types.len(),
        types.land_types.len()
    );
    print_table_location("Creature types", &aggregators_config.creature_types_file);
    print_table_location("Land types", &aggregators_config.land_types_file);
    Ok(())
}

fn print_table_location(label: &str, path: &Path) {
    println!("   {}: {}", label, path.display());
}
