//! `--src` directory discovery: find every `*.sql` file, sorted by path for
//! deterministic group ordering downstream in the emitter.
//!
//! New to this crate; uses `walkdir` the way the pack's own CLI-shaped repos
//! do for recursive file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Walk `src_dir` recursively and return every `*.sql` file found, sorted by
/// path.
pub fn discover_sql_files(src_dir: &Path) -> Result<Vec<PathBuf>> {
    if !src_dir.is_dir() {
        return Err(Error::Config(format!(
            "--src {} is not a directory",
            src_dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(src_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_and_sorts_sql_files() {
        let dir = tempfile_dir();
        fs::write(dir.join("b.sql"), "SELECT 1;").unwrap();
        fs::write(dir.join("a.sql"), "SELECT 1;").unwrap();
        fs::write(dir.join("readme.md"), "not sql").unwrap();

        let found = discover_sql_files(&dir).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("a.sql"));
        assert!(found[1].ends_with("b.sql"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_missing_directory() {
        let missing = std::env::temp_dir().join("pgcodegen-does-not-exist-xyz");
        assert!(discover_sql_files(&missing).is_err());
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pgcodegen-discovery-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
