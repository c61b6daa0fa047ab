#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the CHES data pipeline.

use clap::{Parser, Subcommand};
use ches_explorer_ingest::{question_coverage, tables_report};
use ches_explorer_pipeline::{PipelineContext, stages};
use ches_explorer_questions::load_questions;

#[derive(Parser)]
#[command(name = "ches_explorer_ingest", about = "CHES data pipeline tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the country and party tables from the codebook PDF
    Codebook {
        /// Rebuild from source even if the tables are already materialized
        #[arg(long)]
        force: bool,
    },
    /// Load the survey and expert microdata files
    Microdata {
        /// Reload from source even if the tables are already materialized
        #[arg(long)]
        force: bool,
    },
    /// Materialize the party-country lookup table
    Lookup,
    /// Run every pipeline stage in order
    All {
        /// Rebuild everything from source, ignoring materialized tables
        #[arg(long)]
        force: bool,
    },
    /// List materialized tables with row counts and build times
    Tables,
    /// Check question metadata coverage of the expert dataset
    Questions,
}

fn main() {
    pretty_env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PipelineContext::open_default()?;

    match cli.command {
        Commands::Codebook { force } => stages::build_codebook_tables(&ctx, force)?,
        Commands::Microdata { force } => stages::load_microdata_tables(&ctx, force)?,
        Commands::Lookup => stages::build_lookup(&ctx)?,
        Commands::All { force } => stages::run_all(&ctx, force)?,
        Commands::Tables => {
            for report in tables_report(&ctx)? {
                println!(
                    "{:<12} {:>8} rows  built {}",
                    report.name,
                    report.rows,
                    report.built_at.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Questions => {
            let metadata = load_questions(&ctx.files.questions)?;
            let coverage = question_coverage(&ctx, &metadata)?;

            if coverage.is_complete() {
                println!(
                    "OK: {} expert question columns covered by {} metadata keys",
                    coverage.question_columns, coverage.metadata_keys,
                );
            } else {
                println!("Missing metadata for {} questions:", coverage.uncovered.len());
                for question in &coverage.uncovered {
                    println!("  {question}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
