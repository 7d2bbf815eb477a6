//! Memoized workbook loading.
//!
//! A sheet is parsed once per distinct file content. Loading the same
//! unchanged file again hands back the cached table. The file is only read
//! for hashing when its size or modification time moved since the last look.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use axes_core::{Error, Result};
use tracing::{debug, info};

use crate::table::RawTable;
use crate::workbook;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    /// `None` for a headerless read of the first sheet.
    sheet: Option<String>,
    content: u64,
}

/// Last seen metadata of a file and the hash of its content at that time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
    content: u64,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// Full reads of a file to hash its content.
    pub file_reads: u64,
}

/// Workbook reader with a content-keyed cache.
#[derive(Debug, Default)]
pub struct WorkbookLoader {
    cache: HashMap<CacheKey, Arc<RawTable>>,
    stamps: HashMap<PathBuf, FileStamp>,
    hits: u64,
    misses: u64,
    file_reads: u64,
}

fn source_error(path: &Path, e: std::io::Error) -> Error {
    Error::source(format!("cannot open {}: {e}", path.display()))
}

fn content_hash(path: &Path) -> Result<u64> {
    let bytes = std::fs::read(path).map_err(|e| source_error(path, e))?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

impl WorkbookLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a named sheet whose first row is the header.
    pub fn load_sheet(&mut self, path: impl AsRef<Path>, sheet: &str) -> Result<Arc<RawTable>> {
        let path = path.as_ref();
        self.load(path, Some(sheet), || workbook::read_sheet(path, sheet))
    }

    /// Load the first sheet of a headerless workbook.
    pub fn load_headerless(&mut self, path: impl AsRef<Path>) -> Result<Arc<RawTable>> {
        let path = path.as_ref();
        self.load(path, None, || workbook::read_headerless(path))
    }

    /// Content hash of `path`, rehashed only when its metadata changed.
    fn content_of(&mut self, path: &Path) -> Result<u64> {
        let meta = std::fs::metadata(path).map_err(|e| source_error(path, e))?;
        let (len, modified) = (meta.len(), meta.modified().ok());
        if let Some(stamp) = self.stamps.get(path) {
            if modified.is_some() && stamp.len == len && stamp.modified == modified {
                return Ok(stamp.content);
            }
        }
        let content = content_hash(path)?;
        self.file_reads += 1;
        self.stamps
            .insert(path.to_path_buf(), FileStamp { len, modified, content });
        Ok(content)
    }

    fn load(
        &mut self,
        path: &Path,
        sheet: Option<&str>,
        parse: impl FnOnce() -> Result<RawTable>,
    ) -> Result<Arc<RawTable>> {
        let label = sheet.unwrap_or("<first>");
        let key = CacheKey {
            path: path.to_path_buf(),
            sheet: sheet.map(str::to_string),
            content: self.content_of(path)?,
        };

        if let Some(table) = self.cache.get(&key) {
            self.hits += 1;
            debug!(path = %path.display(), sheet = label, "workbook cache hit");
            return Ok(Arc::clone(table));
        }

        self.misses += 1;
        let table = Arc::new(parse()?);
        // An older version of the same sheet is stale now.
        self.cache
            .retain(|k, _| !(k.path == key.path && k.sheet == key.sheet));
        info!(path = %path.display(), sheet = label, rows = table.len(), "workbook parsed");
        self.cache.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Drop every cached table.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.stamps.clear();
    }

    /// Current cache counters.
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
            file_reads: self.file_reads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_runs(path: &Path, isin: &str) {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_sheet_mut(&0).unwrap();
        ws.set_name("Runs");
        ws.get_cell_mut((1, 1)).set_value("ISIN");
        ws.get_cell_mut((1, 2)).set_value(isin);
        umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
    }

    #[test]
    fn test_cache_hit_on_unchanged_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("axes.xlsx");
        write_runs(&path, "XS1");

        let mut loader = WorkbookLoader::new();
        let first = loader.load_sheet(&path, "Runs").unwrap();
        let second = loader.load_sheet(&path, "Runs").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            loader.stats(),
            LoaderStats { hits: 1, misses: 1, entries: 1, file_reads: 1 }
        );
    }

    #[test]
    fn test_changed_file_is_reparsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("axes.xlsx");
        write_runs(&path, "XS1");

        let mut loader = WorkbookLoader::new();
        loader.load_sheet(&path, "Runs").unwrap();
        write_runs(&path, "XS2000000000");
        // Rewrites within one mtime tick still have to register.
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .unwrap();
        let table = loader.load_sheet(&path, "Runs").unwrap();
        let isin = table.rows().next().unwrap().text("ISIN");
        assert_eq!(isin.as_deref(), Some("XS2000000000"));
        assert_eq!(loader.stats().file_reads, 2);
        assert_eq!(loader.stats().misses, 2);
        assert_eq!(loader.stats().entries, 1);

        loader.clear();
        assert_eq!(loader.stats().entries, 0);
    }

    #[test]
    fn test_missing_file() {
        let mut loader = WorkbookLoader::new();
        let err = loader.load_sheet("/nonexistent/axes.xlsx", "Runs").unwrap_err();
        assert!(err.is_source_failure());
    }
}
