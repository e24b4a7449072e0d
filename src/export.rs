//! CSV export of the sample cache
//!
//! The file is written to a temporary sibling of the destination, flushed
//! and synced, then renamed over the destination. A failed export therefore
//! leaves no partial file behind.
//!
//! Format: a `data1,data2,data3,data4` header, then one row per sample with
//! values printed in full precision.

use crate::backend::cache::SampleCache;
use crate::error::{MoniError, Result, ResultExt};
use crate::types::CHANNEL_NAMES;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Default file name offered in the save dialog
pub fn default_file_name() -> String {
    format!(
        "saveData_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Write the header and every cached sample, in insertion order
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(cache: &SampleCache, writer: &mut W) -> std::io::Result<usize> {
    writeln!(writer, "{}", CHANNEL_NAMES.join(","))?;

    let [c1, c2, c3, c4] = cache.channels();
    for i in 0..cache.len() {
        writeln!(writer, "{},{},{},{}", c1[i], c2[i], c3[i], c4[i])?;
    }
    writer.flush()?;
    Ok(cache.len())
}

/// Export the cache to `path`, replacing any existing file
pub fn export_csv(cache: &SampleCache, path: &Path) -> Result<usize> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {:?}", dir))?;

    let mut writer = BufWriter::new(temp);
    let rows = write_csv(cache, &mut writer).context("Failed to write CSV rows")?;

    let temp = writer
        .into_inner()
        .map_err(|e| MoniError::Export(format!("Failed to flush CSV: {}", e.error())))?;
    temp.as_file()
        .sync_all()
        .context("Failed to sync CSV file")?;
    temp.persist(path)
        .map_err(|e| MoniError::Export(format!("Failed to move CSV to {:?}: {}", path, e.error)))?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleRecord;

    fn cache_with(records: &[[f64; 4]]) -> SampleCache {
        let mut cache = SampleCache::new(100);
        for r in records {
            cache.push(SampleRecord::from(*r));
        }
        cache
    }

    #[test]
    fn test_write_csv_format() {
        let cache = cache_with(&[[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]);
        let mut out = Vec::new();
        assert_eq!(write_csv(&cache, &mut out).unwrap(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "data1,data2,data3,data4\n1,2,3,4\n5,6,7,8\n"
        );
    }

    #[test]
    fn test_write_csv_keeps_precision() {
        let cache = cache_with(&[[0.1, -2.5, 12345.678901, 1e-7]]);
        let mut out = Vec::new();
        write_csv(&cache, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("0.1,-2.5,12345.678901,0.0000001"));
    }

    #[test]
    fn test_empty_cache_writes_header_only() {
        let cache = SampleCache::new(10);
        let mut out = Vec::new();
        assert_eq!(write_csv(&cache, &mut out).unwrap(), 0);
        assert_eq!(out, b"data1,data2,data3,data4\n");
    }

    #[test]
    fn test_export_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saveData.csv");
        std::fs::write(&path, "old contents").unwrap();

        let cache = cache_with(&[[1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(export_csv(&cache, &path).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "data1,data2,data3,data4\n1,2,3,4\n"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_to_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let cache = cache_with(&[[1.0, 2.0, 3.0, 4.0]]);
        assert!(export_csv(&cache, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_default_file_name() {
        let name = default_file_name();
        assert!(name.starts_with("saveData_"));
        assert!(name.ends_with(".csv"));
    }
}
