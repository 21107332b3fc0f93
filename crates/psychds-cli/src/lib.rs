//! Command-line surface for the Psych-DS validator.

mod output;

use anyhow::Context;
use clap::Parser;
use psychds_core::{
    load_schema, read_file_tree, validate, validate_with_events, EventEmitter, RealFileSystem,
    ValidationEvent, ValidationResult, ValidatorOptions,
};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Validate a Psych-DS dataset directory.
#[derive(Debug, Parser)]
#[command(name = "psychds", version, about)]
pub struct Args {
    /// Path of the dataset to validate
    pub dataset_directory: String,

    /// Emit the full validation result as JSON
    #[arg(long)]
    pub json: bool,

    /// Schema version to validate against (X.Y.Z or "latest")
    #[arg(long, default_value = "latest")]
    pub schema: String,

    /// List every file attached to each issue
    #[arg(long)]
    pub verbose: bool,

    /// Include warnings in the report
    #[arg(long = "showWarnings")]
    pub show_warnings: bool,

    /// Log level: error, warn, info, or debug
    #[arg(long, default_value = "error")]
    pub debug: String,

    /// Print step lifecycle events while validating
    #[arg(long = "useEvents")]
    pub use_events: bool,
}

/// Initialise stderr logging from the `--debug` level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run a validation and render the result. Exit code 0 means valid.
pub fn run(args: Args) -> anyhow::Result<ExitCode> {
    let options = ValidatorOptions {
        dataset_path: args.dataset_directory.clone(),
        schema_version: args.schema.clone(),
        json: args.json,
        verbose: args.verbose,
        show_warnings: args.show_warnings,
        debug: args.debug.clone(),
        use_events: args.use_events,
    };

    let schema = load_schema(&options.schema_version).context("failed to load schema")?;
    tracing::debug!(version = %schema.version(), "schema loaded");
    let dataset = read_file_tree(&RealFileSystem, Path::new(&args.dataset_directory))
        .with_context(|| format!("failed to read dataset at {}", args.dataset_directory))?;

    let result = if options.use_events {
        let mut emitter = EventEmitter::new();
        emitter.subscribe(print_event);
        validate_with_events(&dataset, &schema, &options, &emitter)?
    } else {
        validate(&dataset, &schema, &options)?
    };

    print_result(&result, &options)?;

    Ok(if result.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &ValidationResult, options: &ValidatorOptions) -> anyhow::Result<()> {
    if options.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", output::render(result, options));
    }
    Ok(())
}

fn print_event(event: &ValidationEvent) {
    match event {
        ValidationEvent::Start {
            total_files,
            data_files,
        } => eprintln!("-- validating {} files ({} data files)", total_files, data_files),
        ValidationEvent::Step { name } => eprintln!("-- step: {}", name),
        ValidationEvent::SubStep { step, path } => eprintln!("   {}: {}", step, path),
        ValidationEvent::FileDone { path } => eprintln!("   done: {}", path),
        ValidationEvent::Complete { valid } => eprintln!("-- complete (valid: {})", valid),
    }
}
