use std::fs;
use std::path::Path;

use tracing::debug;

use super::data::Label;
use crate::error::{LabelError, Result};

/// Ordered list of label names offered during a session.
///
/// Duplicates are kept as separate entries; they share one count slot
/// because counts are keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    labels: Vec<Label>,
}

impl Taxonomy {
    /// Read a labels file: one label per line, blank lines ignored.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LabelError::MissingLabelsFile(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| LabelError::TaxonomyRead {
            path: path.to_path_buf(),
            source,
        })?;

        let taxonomy = Self::parse(&text);
        if taxonomy.is_empty() {
            return Err(LabelError::EmptyTaxonomy(path.to_path_buf()));
        }

        debug!("Loaded {} labels from {}", taxonomy.len(), path.display());
        Ok(taxonomy)
    }

    /// Build a taxonomy from already-split text.
    pub fn parse(text: &str) -> Self {
        let labels = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, name)| Label {
                name: name.to_string(),
                index,
            })
            .collect();

        Taxonomy { labels }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
