//! Entry point: argument parsing → `DATABASE_URL` resolution → directory
//! discovery → parse → introspect → emit/check.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use console::style;
use tracing::{error, info};

use pgcodegen::cli::{Cli, Command};
use pgcodegen::codegen::emitter;
use pgcodegen::config::DatabaseUrl;
use pgcodegen::conn::Connection;
use pgcodegen::discovery::discover_sql_files;
use pgcodegen::introspect::{introspect_file, Introspector};
use pgcodegen::sql::{parse_file, TypedQuery};
use pgcodegen::Result;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Missing --src/--dest/subcommand and other usage errors are exit 1,
            // not clap's own exit 2, so print clap's message ourselves.
            eprint!("{err}");
            return ExitCode::FAILURE;
        }
    };
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            eprintln!("{} {err}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the run completed but produced per-query errors
/// or (for `check`) a mismatch, which should exit 1 without being a fatal
/// top-level error.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Generate { src, dest, database_url } => {
            let (typed, ok) = introspect_all(&src, database_url.as_deref())?;
            let files = emitter::emit(&typed);
            write_output(&dest, &files)?;
            info!(count = files.len(), "wrote generated files");
            Ok(ok)
        }
        Command::Check { src, dest, database_url } => {
            let (typed, ok) = introspect_all(&src, database_url.as_deref())?;
            let files = emitter::emit(&typed);
            let matches = check_output(&dest, &files)?;
            Ok(ok && matches)
        }
    }
}

/// Discover, parse, and introspect every query under `src`. Per-query errors
/// are logged and cause a `false` result but do not stop the run; fatal
/// connection/config errors propagate as `Err`.
fn introspect_all(src: &Path, database_url: Option<&str>) -> Result<(Vec<TypedQuery>, bool)> {
    let url = DatabaseUrl::resolve(database_url)?;
    let conn = Connection::connect(&url)?;
    let mut introspector = Introspector::new(conn);

    let files = discover_sql_files(src)?;
    let mut typed = Vec::new();
    let mut ok = true;

    for path in files {
        let text = std::fs::read_to_string(&path).map_err(|e| pgcodegen::Error::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file_path = path.display().to_string();
        let queries = parse_file(&file_path, &text)?;
        let (file_typed, errors) = introspect_file(&mut introspector, queries);
        for err in errors {
            ok = false;
            error!("{err}");
            eprintln!("{} {err}", style("error:").red().bold());
        }
        typed.extend(file_typed);
    }

    Ok((typed, ok))
}

fn write_output(dest: &Path, files: &[emitter::EmittedFile]) -> Result<()> {
    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::create_dir_all(dest)?;
    for file in files {
        std::fs::write(dest.join(&file.relative_path), &file.contents)?;
    }
    Ok(())
}

/// Compare freshly generated output against what's on disk, byte for byte.
/// Returns `false` (without erroring) on any mismatch or missing file.
fn check_output(dest: &Path, files: &[emitter::EmittedFile]) -> Result<bool> {
    let mut matches = true;
    for file in files {
        let path = dest.join(&file.relative_path);
        match std::fs::read_to_string(&path) {
            Ok(existing) if existing == file.contents => {}
            Ok(_) => {
                matches = false;
                eprintln!("{} {} is out of date", style("stale:").yellow().bold(), path.display());
            }
            Err(_) => {
                matches = false;
                eprintln!("{} {} is missing", style("missing:").yellow().bold(), path.display());
            }
        }
    }
    Ok(matches)
}
