// manifest.rs — Append-only CSV chain-of-custody manifest.
//
// The manifest is a plain CSV file with a fixed header so any spreadsheet or
// CSV reader can open it. Rows are only ever appended; each append is flushed
// and synced before `append` returns, so an interrupted process leaves either
// a whole row or nothing.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AuditError;
use crate::record::Record;

/// Column names, in on-disk order.
pub const HEADER: [&str; 7] = [
    "Timestamp",
    "ProcessingAgent",
    "FileName",
    "SHA256_Hash",
    "HashType",
    "FileSizeBytes",
    "FullPath",
];

const FILE_NAME_COLUMNS: [&str; 2] = ["FileName", "File_Name"];

/// An append-only custody manifest backed by a CSV file.
///
/// The writer sits behind a mutex: the manifest has exactly one logical
/// writer, and rows from different threads must never interleave.
pub struct CustodyManifest {
    writer: Mutex<csv::Writer<File>>,
    path: PathBuf,
}

impl CustodyManifest {
    /// Open (or create) a manifest at the given path.
    ///
    /// A new or empty file gets the header row; an existing manifest is
    /// opened for append and its header is left alone.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let needs_header = std::fs::metadata(&path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
            writer.get_ref().sync_data()?;
            tracing::debug!(path = %path.display(), "created custody manifest");
        }

        Ok(Self {
            writer: Mutex::new(writer),
            path,
        })
    }

    /// Append one record and sync it to disk.
    pub fn append(&self, record: &Record) -> Result<(), AuditError> {
        let mut writer = self.writer.lock().map_err(|_| AuditError::LockPoisoned)?;
        writer.serialize(record)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Read all records from a manifest file, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Record>, AuditError> {
        let mut reader = Self::reader(path.as_ref())?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    /// Collect the file names already recorded in a manifest.
    ///
    /// Only the file name column is looked at, so manifests written with the
    /// older underscore header or with a different timestamp format still
    /// yield their identities. A missing file yields an empty set.
    pub fn recorded_file_names(path: impl AsRef<Path>) -> Result<BTreeSet<String>, AuditError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(BTreeSet::new());
        }

        let mut reader = Self::reader(path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(BTreeSet::new());
        }
        let column = headers
            .iter()
            .position(|h| FILE_NAME_COLUMNS.contains(&h.trim()))
            .ok_or_else(|| AuditError::MissingColumn {
                path: path.to_path_buf(),
            })?;

        let mut names = BTreeSet::new();
        for row in reader.records() {
            let row = row?;
            if let Some(name) = row.get(column).filter(|n| !n.is_empty()) {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    /// Return the path to the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(path: &Path) -> Result<csv::Reader<File>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, digest: &str) -> Record {
        Record::new("Recorder", format!("/input/{}", name), digest, 42)
    }

    #[test]
    fn new_manifest_starts_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        CustodyManifest::open(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next().unwrap(), HEADER.join(","));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");

        {
            let manifest = CustodyManifest::open(&path).unwrap();
            manifest.append(&record("a.txt", "aaa")).unwrap();
            manifest.append(&record("b.txt", "bbb")).unwrap();
        }

        let records = CustodyManifest::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_name, "a.txt");
        assert_eq!(records[0].digest, "aaa");
        assert_eq!(records[1].file_name, "b.txt");
        assert_eq!(records[1].size_bytes, 42);
    }

    #[test]
    fn reopen_appends_without_second_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");

        CustodyManifest::open(&path)
            .unwrap()
            .append(&record("a.txt", "aaa"))
            .unwrap();
        CustodyManifest::open(&path)
            .unwrap()
            .append(&record("b.txt", "bbb"))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let header_lines = content
            .lines()
            .filter(|l| l.starts_with("Timestamp,"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(CustodyManifest::read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn paths_with_commas_are_quoted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        let manifest = CustodyManifest::open(&path).unwrap();
        manifest
            .append(&Record::new("Recorder", "/in/report, final.pdf", "ccc", 1))
            .unwrap();

        let records = CustodyManifest::read_all(&path).unwrap();
        assert_eq!(records[0].file_name, "report, final.pdf");
    }

    #[test]
    fn recorded_file_names_of_missing_manifest_is_empty() {
        let dir = tempdir().unwrap();
        let names = CustodyManifest::recorded_file_names(dir.path().join("nope.csv")).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn recorded_file_names_reads_legacy_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "Timestamp,Processing_Agent,File_Name,SHA256_Hash,Hash_Type,File_Size_Bytes,Full_Path\n\
             2024-03-01 10:00:00,ReporterAgent,a.txt,abc,SHA-256,3,/data/input/a.txt\n",
        )
        .unwrap();

        let names = CustodyManifest::recorded_file_names(&path).unwrap();
        assert!(names.contains("a.txt"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn recorded_file_names_rejects_unknown_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "name,size\nx,1\n").unwrap();

        assert!(matches!(
            CustodyManifest::recorded_file_names(&path),
            Err(AuditError::MissingColumn { .. })
        ));
    }
}
