//! CSV archiving functionality
//!
//! An `Archiver` writes one CSV file. Each call to `Archiver::serialise`
//! appends a record as a row, with the header taken from the first record's
//! field names, and flushes it to disk.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    FileCreateError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInit
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        Self::from_file_path(session_path)
    }

    /// Create a new archiver writing to an absolute file path.
    ///
    /// Any existing file at the path is truncated, and missing parent
    /// directories are created.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(ArchiveError::FileCreateError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .map_err(ArchiveError::FileCreateError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record).map_err(ArchiveError::WriteError)?;
                w.flush().map_err(ArchiveError::FlushError)?
            },
            None => return Err(ArchiveError::NotInit)
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        value: f64
    }

    #[test]
    fn test_archive_rows() {
        let path = std::env::temp_dir()
            .join(format!("util_archive_test_{}", std::process::id()))
            .join("rows.csv");

        let mut arch = Archiver::from_file_path(&path).unwrap();
        arch.serialise(Row { time_s: 0.0, value: 1.5 }).unwrap();
        arch.serialise(Row { time_s: 0.1, value: -2.0 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["time_s,value", "0.0,1.5", "0.1,-2.0"]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_uninit_archiver() {
        let mut arch = Archiver::default();
        assert!(matches!(
            arch.serialise(Row { time_s: 0.0, value: 0.0 }),
            Err(ArchiveError::NotInit)
        ));
    }
}
