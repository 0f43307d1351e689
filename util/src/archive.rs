//! Struct archiving functionality
//!
//! An [`Archiver`] writes a stream of serialisable records into a CSV file,
//! either inside the session's archive directory or at an explicit path.
//! Records are flushed as they are written so that an interrupted run still
//! leaves a complete archive of everything emitted before the interruption.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    FileCreateError(csv::Error),

    #[error("Could not write a record to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive to disk: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a particular file name relative to the
    /// session's archive root.
    pub fn from_session(session: &Session, file_name: &str) -> Result<Self, ArchiveError> {
        let mut path = session.arch_root.clone();
        path.push(file_name);

        Self::from_file(path)
    }

    /// Create a new archiver writing to the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(ArchiveError::FileCreateError)?;

        Ok(Self { writer })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: &T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}
