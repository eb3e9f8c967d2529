//! slotweave command-line host
//!
//! Runs the dependency-injection weaver over compiled module files the way a
//! build pipeline would: load, check eligibility, weave, report, write.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "slotweave")]
#[command(about = "Compile-time dependency-injection weaver", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output from the weaver
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Diagnostic output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Colored human-readable output
    Pretty,
    /// One JSON document on stdout
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Weave module files in place (or into --out-dir)
    Weave {
        /// Module files to weave
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Path to weaver.toml
        #[arg(short, long, default_value = slotweave_weaver::CONFIG_FILE_NAME)]
        config: PathBuf,
        /// Write woven modules here instead of overwriting the inputs
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Structurally verify each woven module before writing it
        #[arg(long)]
        verify: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "pretty")]
        format: Format,
    },

    /// Weave without writing anything
    Check {
        /// Module files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Path to weaver.toml
        #[arg(short, long, default_value = slotweave_weaver::CONFIG_FILE_NAME)]
        config: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "pretty")]
        format: Format,
    },

    /// Show the contents of a module file
    Inspect {
        /// Module file
        file: PathBuf,
        /// Dump the whole module as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default weaver.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Weave {
            files,
            config,
            out_dir,
            verify,
            format,
        } => commands::weave::execute(
            commands::weave::WeaveOptions {
                files,
                config,
                out_dir,
                verify,
                format,
                write: true,
            },
            color,
        ),

        Commands::Check {
            files,
            config,
            format,
        } => commands::check::execute(files, config, format, color),

        Commands::Inspect { file, json } => commands::inspect::execute(file, json, color),

        Commands::Init { path, force } => commands::init::execute(path, force, color),
    }
}
