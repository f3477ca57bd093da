//! Command-line surface: `generate` and `check` subcommands.
//!
//! A `clap`-derive CLI shape: subcommands as an enum, `#[command(...)]` on
//! the top-level struct.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pgcodegen", version, about = "Typed call-site generator for annotated .sql files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Introspect every query under `--src` and write generated code to `--dest`.
    Generate {
        #[arg(long)]
        src: PathBuf,
        #[arg(long)]
        dest: PathBuf,
        /// Connection string; falls back to DATABASE_URL (environment or .env).
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Regenerate in memory and diff against `--dest`; exits 1 on any mismatch.
    Check {
        #[arg(long)]
        src: PathBuf,
        #[arg(long)]
        dest: PathBuf,
        #[arg(long)]
        database_url: Option<String>,
    },
}
