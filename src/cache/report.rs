//! Startup report files.
//!
//! Written once after a successful cache build when a report directory is
//! configured:
//! - `b58.sums`: fingerprint and path, one file per line
//! - `b58.dups`: fingerprints shared by two or more paths, members indented
//! - `b58.kinds`: distinct content types, sorted

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::file_cache::FileCache;

pub const SUMS_FILE: &str = "b58.sums";
pub const DUPS_FILE: &str = "b58.dups";
pub const KINDS_FILE: &str = "b58.kinds";

#[derive(Debug, Error)]
#[error("failed to write report {path}: {source}")]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write all three listings into `dir`, creating it if needed.
pub fn write_reports(cache: &FileCache, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError {
        path: dir.to_path_buf(),
        source,
    })?;

    let reports = [
        (SUMS_FILE, checksum_listing(cache)),
        (DUPS_FILE, duplicate_listing(cache)),
        (KINDS_FILE, kind_listing(cache)),
    ];

    let mut written = Vec::with_capacity(reports.len());
    for (name, body) in reports {
        let path = dir.join(name);
        fs::write(&path, body).map_err(|source| ReportError {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Created report");
        written.push(path);
    }
    Ok(written)
}

pub fn checksum_listing(cache: &FileCache) -> String {
    let mut out = String::new();
    for record in cache.records() {
        let _ = writeln!(out, "{:<30} {}", record.fingerprint, record.path);
    }
    out
}

pub fn duplicate_listing(cache: &FileCache) -> String {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for record in cache.records() {
        groups
            .entry(record.fingerprint.as_str())
            .or_default()
            .push(&record.path);
    }

    let mut out = String::new();
    for (fingerprint, paths) in groups.iter().filter(|(_, paths)| paths.len() > 1) {
        let _ = writeln!(out, "{}", fingerprint);
        for path in paths {
            let _ = writeln!(out, "  {}", path);
        }
    }
    out
}

pub fn kind_listing(cache: &FileCache) -> String {
    let kinds: BTreeSet<&str> = cache.records().iter().map(|r| r.kind.as_str()).collect();
    let mut out = String::new();
    for kind in kinds {
        let _ = writeln!(out, "{}", kind);
    }
    out
}
