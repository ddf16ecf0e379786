mod commands;
mod engine;
mod evaluator;
mod executor;
mod loader;
mod reporter;
mod workspace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "irtest")]
#[command(about = "irtest - Compile, link, run and judge a batch of compiler test cases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every test case under a directory and write result.log
    Run {
        /// Directory searched recursively for test sources
        #[arg(short, long)]
        cases: PathBuf,

        /// Harness config file
        #[arg(long, default_value = irtest_common::config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Where the testgen-* run directory is created (overrides config)
        #[arg(short, long)]
        gen_dir: Option<PathBuf>,

        /// Runtime library linked into every case (overrides config)
        #[arg(short, long)]
        runtime_library: Option<PathBuf>,

        /// Do not append the exit code to captured output
        #[arg(long)]
        no_echo_exit_code: bool,

        /// Do not mirror result lines to stdout
        #[arg(short, long)]
        quiet: bool,

        /// Write result.log in the older spelling and spacing
        #[arg(long)]
        legacy_log_format: bool,
    },

    /// Write a default config/harness.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the result lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            cases,
            config,
            gen_dir,
            runtime_library,
            no_echo_exit_code,
            quiet,
            legacy_log_format,
        } => {
            let overrides = commands::RunOverrides {
                gen_dir,
                runtime_library,
                no_echo_exit_code,
                quiet,
                legacy_log_format,
            };
            commands::run_batch(&cases, &config, overrides)?;
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
    }

    Ok(())
}
