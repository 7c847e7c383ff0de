//! In-memory index of every file under the public directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Instant, SystemTime};
use thiserror::Error;
use walkdir::WalkDir;

use crate::content::{ClassifierChain, Fingerprint, Kind};

/// Errors that abort a cache build.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory traversal failed (unreadable directory, missing root, loop).
    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// File metadata could not be read.
    #[error("failed to stat {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path cannot be expressed as a UTF-8 cache key.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// Metadata for one cached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Root-relative, `/`-separated key.
    pub path: String,
    /// Digest of the content at build time.
    pub fingerprint: Fingerprint,
    /// Resolved content type.
    pub kind: Kind,
    /// Filesystem modification time, for conditional requests.
    pub modified: SystemTime,
    /// Size in bytes at build time.
    pub len: u64,
    /// On-disk location used when serving.
    pub location: PathBuf,
}

/// Immutable map from root-relative path to [`FileRecord`].
#[derive(Debug, Default)]
pub struct FileCache {
    root: PathBuf,
    files: HashMap<String, FileRecord>,
}

impl FileCache {
    /// Walk `root` and index every file with the default classifier chain.
    pub fn build(root: &Path) -> Result<Self, CacheError> {
        Self::build_with(root, &ClassifierChain::default())
    }

    /// Walk `root` and index every file using `classifier`.
    pub fn build_with(root: &Path, classifier: &ClassifierChain) -> Result<Self, CacheError> {
        let started = Instant::now();
        let mut files = HashMap::new();

        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|source| CacheError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let location = entry.path();
            // Follows symlinks, so a link to a file is indexed like the file.
            let metadata = fs::metadata(location).map_err(|source| CacheError::Metadata {
                path: location.to_path_buf(),
                source,
            })?;
            if metadata.is_dir() {
                continue;
            }
            let modified = metadata.modified().map_err(|source| CacheError::Metadata {
                path: location.to_path_buf(),
                source,
            })?;
            let bytes = fs::read(location).map_err(|source| CacheError::Read {
                path: location.to_path_buf(),
                source,
            })?;

            let key = cache_key(root, location)?;
            let record = FileRecord {
                fingerprint: Fingerprint::of(&bytes),
                kind: classifier.classify(&key, &bytes),
                modified,
                len: bytes.len() as u64,
                location: location.to_path_buf(),
                path: key,
            };
            tracing::trace!(path = %record.path, kind = %record.kind, fingerprint = %record.fingerprint, "Cached file");
            files.insert(record.path.clone(), record);
        }

        tracing::info!(
            root = %root.display(),
            files = files.len(),
            elapsed = ?started.elapsed(),
            "File cache built"
        );

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Assemble a cache from prepared records, keyed by their `path`.
    pub fn from_records(root: impl Into<PathBuf>, records: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            root: root.into(),
            files: records
                .into_iter()
                .map(|record| (record.path.clone(), record))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Directory the cache was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All records, ordered by path.
    pub fn records(&self) -> Vec<&FileRecord> {
        let mut records: Vec<&FileRecord> = self.files.values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }
}

/// Root-relative key joined with `/` whatever the host separator is.
fn cache_key(root: &Path, location: &Path) -> Result<String, CacheError> {
    let relative = location.strip_prefix(root).unwrap_or(location);
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .ok_or_else(|| CacheError::NonUtf8Path(location.to_path_buf()))?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("blog/2010")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("index.html"), "<!DOCTYPE html><html><body>home</body></html>").unwrap();
        fs::write(root.join("blog/2010/post.html"), "<html><body>post</body></html>").unwrap();
        fs::write(root.join("blog/style.css"), "body { margin: 0 }").unwrap();
        fs::write(root.join("blog/copy.css"), "body { margin: 0 }").unwrap();
        fs::write(root.join("a,b.png"), b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR").unwrap();
        dir
    }

    #[test]
    fn test_one_record_per_file() {
        let dir = site();
        let cache = FileCache::build(dir.path()).unwrap();

        assert_eq!(cache.len(), 5);
        let paths: Vec<&str> = cache.records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["a,b.png", "blog/2010/post.html", "blog/copy.css", "blog/style.css", "index.html"]
        );
        assert!(!cache.contains("empty"));
        assert!(!cache.contains("blog"));
    }

    #[test]
    fn test_record_contents() {
        let dir = site();
        let cache = FileCache::build(dir.path()).unwrap();

        let post = cache.get("blog/2010/post.html").unwrap();
        assert!(post.kind.is_html());
        assert_eq!(post.location, dir.path().join("blog/2010/post.html"));
        assert_eq!(post.len, 30);
        assert_eq!(post.fingerprint, Fingerprint::of(b"<html><body>post</body></html>"));

        assert_eq!(cache.get("blog/style.css").unwrap().kind.as_str(), "text/css");
        assert_eq!(cache.get("a,b.png").unwrap().kind.as_str(), "image/png");
    }

    #[test]
    fn test_duplicates_share_fingerprint() {
        let dir = site();
        let cache = FileCache::build(dir.path()).unwrap();
        assert_eq!(
            cache.get("blog/style.css").unwrap().fingerprint,
            cache.get("blog/copy.css").unwrap().fingerprint
        );
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileCache::build(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CacheError::Walk { .. }));
    }

    #[test]
    fn test_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::build(dir.path()).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.root(), dir.path());
    }
}
