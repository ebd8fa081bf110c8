use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use media_renamer_core::{
    app_paths, apply_batch, load_config, run_pipeline, undo_last, write_csv_report, ApplyOptions,
    MediaBatch, NominatimGeocoder, PipelineOptions, ReverseGeocoder,
};
use std::path::PathBuf;

mod logging;

#[derive(Debug, Parser)]
#[command(name = "media-renamer")]
#[command(version, about = "Rename photos and videos by capture time and location")]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    rename: RenameArgs,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// JSON log lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reverse the last applied rename
    Undo,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// Directory holding the media files
    #[arg(short, long, required = true)]
    path: Option<PathBuf>,
    /// Only report computed names; pass `false` to rename
    #[arg(long = "dry_run", default_value_t = true, action = ArgAction::Set)]
    dry_run: bool,
    /// Report prefix; the dry-run report is written to `<results>.csv`
    #[arg(long, default_value = "./output")]
    results: PathBuf,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    #[arg(long, default_value_t = false)]
    skip_hidden: bool,
    /// Skip reverse geocoding; photos get the plain photo label
    #[arg(long, default_value_t = false)]
    no_geocode: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);
    tracing::debug!("media-renamer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Undo) => cmd_undo(),
        Some(Commands::Config(config)) => match config.action {
            ConfigAction::Show => cmd_config_show(),
        },
        None => cmd_rename(cli.rename),
    }
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let root = args.path.context("--path is required")?;

    let mut options = PipelineOptions::from_config(root, &config);
    options.enumerate.recursive |= args.recursive;
    if args.skip_hidden {
        options.enumerate.include_hidden = false;
    }

    let geocoder = if config.geocoder.enabled && !args.no_geocode {
        tracing::debug!(endpoint = %config.geocoder.endpoint, "reverse geocoding enabled");
        Some(NominatimGeocoder::new(&config.geocoder).context("cannot set up geocoding client")?)
    } else {
        None
    };
    let batch = run_pipeline(
        &options,
        geocoder.as_ref().map(|g| g as &dyn ReverseGeocoder),
    )?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batch)?),
        OutputFormat::Table => print_table(&batch),
    }

    if args.dry_run {
        let report = write_csv_report(&batch, &args.results)?;
        eprintln!(
            "dry-run: no files were changed. report written to {}. pass --dry_run false to rename.",
            report.display()
        );
        return Ok(());
    }

    let paths = app_paths()?;
    let result = apply_batch(
        &batch,
        &ApplyOptions {
            undo_log: Some(paths.undo_path),
        },
    )?;
    eprintln!(
        "applied: {} renamed, {} unchanged, {} failed",
        result.applied,
        result.unchanged,
        result.failures.len()
    );
    for failure in &result.failures {
        eprintln!(
            "  {} -> {}: {}",
            failure.from.display(),
            failure.to.display(),
            failure.reason
        );
    }

    Ok(())
}

fn cmd_undo() -> Result<()> {
    let result = undo_last()?;
    println!(
        "undo finished: {} restored, {} skipped",
        result.restored, result.skipped
    );
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn print_table(batch: &MediaBatch) {
    println!("original -> new name (timestamp source, location)");
    for record in batch.records.iter().filter(|r| r.is_media()) {
        let new_name = record.new_name.as_deref().unwrap_or("-");
        let source = record
            .timestamp_source
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{} -> {} ({}, {})",
            record.name,
            new_name,
            source,
            record.location.as_deref().unwrap_or("-")
        );
        for issue in &record.issues {
            println!("    ! {issue}");
        }
    }

    let stats = &batch.stats;
    println!(
        "\nsummary: scanned={} photos={} videos={} other={} exif_time={} fs_time={} geocoded={} geocode_failed={} named={} unchanged={}",
        stats.scanned_entries,
        stats.photos,
        stats.videos,
        stats.other,
        stats.with_exif_timestamp,
        stats.with_filesystem_timestamp,
        stats.geocoded,
        stats.geocode_failures,
        stats.named,
        stats.unchanged
    );
}
