//! Error types for the labelling session

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while opening, labelling or saving a project.
///
/// Only the first five variants stop a session from starting. Persistence
/// failures are reported to the user while the in-memory state stays valid.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Images folder not found: {0}")]
    InvalidFolder(PathBuf),

    #[error("Labels file not found: {0}")]
    MissingLabelsFile(PathBuf),

    #[error("Could not read labels file {path}: {source}")]
    TaxonomyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Labels file {0} has no labels. Add at least one label per line.")]
    EmptyTaxonomy(PathBuf),

    #[error("No supported image files under {0} (or its subfolders)")]
    EmptyCatalog(PathBuf),

    #[error("Could not read existing CSV {path}: {source}")]
    PersistenceRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Could not write CSV {path}: {source}")]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LabelError {
    /// True for errors that prevent a session from being created.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LabelError::InvalidFolder(_)
                | LabelError::MissingLabelsFile(_)
                | LabelError::TaxonomyRead { .. }
                | LabelError::EmptyTaxonomy(_)
                | LabelError::EmptyCatalog(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LabelError>;
