//! schema-delta: compute ordered migration plans between schema snapshots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_delta::{
    cli::{self, DiffPaths},
    config::{self, AppConfig, ConfigPreset, OutputFormat, Validatable},
    diff::MatchingStrategy,
    pipeline::exit_codes,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "schema-delta")]
#[command(version)]
#[command(about = "Compute create/alter/rename/drop plans between schema snapshots", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  No changes detected, or success
    1  Changes detected (with --fail-on-change)
    2  A proposed step is below --min-confidence
    3  Error occurred

EXAMPLES:
    # Human-readable plan
    schema-delta diff old.json new.json

    # Migration questions for review
    schema-delta diff old.json new.json -o prompts

    # Re-run after rejecting a proposal
    schema-delta diff old.json new.json --guidance guidance.yaml

    # CI check
    schema-delta --preset ci diff old.json new.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Start from a named preset (default, strict, permissive, ci)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `diff` subcommand
#[derive(Parser)]
struct DiffArgs {
    /// Path to the old snapshot document
    old: PathBuf,

    /// Path to the new snapshot document
    new: PathBuf,

    /// Guidance file with banned creations, deletions and alters
    #[arg(long)]
    guidance: Option<PathBuf>,

    /// File mapping old qualified names to new ones, decided earlier in the session
    #[arg(long)]
    renames: Option<PathBuf>,

    /// Output format
    #[arg(short, long)]
    output: Option<OutputFormat>,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Similarity a pair must exceed to become an alter or rename
    #[arg(long)]
    threshold: Option<f64>,

    /// Pair assignment strategy
    #[arg(long)]
    strategy: Option<MatchingStrategy>,

    /// Exit with code 1 if any changes detected
    #[arg(long)]
    fail_on_change: bool,

    /// Exit with code 2 if any step is less certain than this
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Apply the delta to OLD and check it reproduces NEW
    #[arg(long)]
    verify: bool,

    /// Keep the engine's emission order instead of linearizing
    #[arg(long)]
    no_linearize: bool,

    /// Also diff the system modules
    #[arg(long)]
    include_std: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the delta between two snapshots
    Diff(DiffArgs),

    /// Apply a JSON delta to a snapshot and print the resulting document
    Apply {
        /// Snapshot document to start from
        snapshot: PathBuf,
        /// Delta produced by `diff -o json`
        delta: PathBuf,
        /// Output file path (stdout if not specified)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Print the JSON Schema of the config file format
    ConfigSchema {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration (preset + file)
    ConfigShow,

    /// Write a commented example config file
    ConfigInit {
        /// Destination path
        #[arg(default_value = ".schema-delta.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_codes::ERROR
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Diff(args) => {
            let (mut config, _) = effective_config(&cli.config, cli.preset.as_deref())?;
            apply_diff_overrides(&mut config, &args);
            check_config(&config)?;

            let paths = DiffPaths {
                old: args.old,
                new: args.new,
                guidance: args.guidance,
                renames: args.renames,
            };
            cli::run_diff(&config, &paths, cli.quiet)
        }

        Commands::Apply {
            snapshot,
            delta,
            output_file,
        } => cli::run_apply(&snapshot, &delta, output_file, cli.quiet),

        Commands::ConfigSchema { output } => {
            let schema = config::generate_json_schema().context("failed to serialize schema")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
            Ok(exit_codes::SUCCESS)
        }

        Commands::ConfigShow => {
            let (config, loaded_from) = effective_config(&cli.config, cli.preset.as_deref())?;
            match &loaded_from {
                Some(path) => eprintln!("# Loaded from: {}", path.display()),
                None => eprintln!("# No config file found; showing defaults"),
            }
            let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
            print!("{yaml}");
            Ok(exit_codes::SUCCESS)
        }

        Commands::ConfigInit { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            std::fs::write(&path, config::generate_example_config())
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("Config written to {}", path.display());
            }
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// A named preset replaces the config file; otherwise the discovered file
/// (or the defaults) is used.
fn effective_config(explicit: &Option<PathBuf>, preset: Option<&str>) -> Result<(AppConfig, Option<PathBuf>)> {
    let Some(name) = preset else {
        return Ok(config::load_or_default(explicit.as_deref()));
    };
    let preset = ConfigPreset::from_name(name).with_context(|| {
        let known: Vec<&str> = ConfigPreset::all().iter().map(ConfigPreset::name).collect();
        format!("unknown preset '{name}' (expected one of: {})", known.join(", "))
    })?;
    tracing::debug!("Using preset '{preset}': {}", preset.description());
    Ok((AppConfig::from_preset(preset), None))
}

fn apply_diff_overrides(config: &mut AppConfig, args: &DiffArgs) {
    if let Some(format) = args.output {
        config.output.format = format;
    }
    if args.output_file.is_some() {
        config.output.file.clone_from(&args.output_file);
    }
    if let Some(threshold) = args.threshold {
        config.delta.alter_threshold = threshold;
    }
    if let Some(strategy) = args.strategy {
        config.delta.strategy = strategy;
    }
    if args.no_linearize {
        config.delta.linearize = false;
    }
    if args.include_std {
        config.filter.include_std = true;
    }
    if args.fail_on_change {
        config.behavior.fail_on_change = true;
    }
    if args.min_confidence.is_some() {
        config.behavior.min_confidence = args.min_confidence;
    }
    if args.verify {
        config.behavior.verify = true;
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow::bail!("invalid configuration: {}", messages.join("; "))
}
