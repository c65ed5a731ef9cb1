use std::collections::HashMap;

use super::catalog::Catalog;
use super::data::{Assignment, ImagePath, PersistedRow};

/// Current label of every image that has ever been labelled.
///
/// One assignment per path; relabelling overwrites. Absence means the
/// image is unlabelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStore {
    assignments: HashMap<ImagePath, Assignment>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Assignment> {
        self.assignments.get(path)
    }

    /// Store an assignment, returning the one it replaced
    pub fn insert(&mut self, path: ImagePath, assignment: Assignment) -> Option<Assignment> {
        self.assignments.insert(path, assignment)
    }

    /// Update only the timestamp of an existing assignment
    pub fn touch(&mut self, path: &str, timestamp: String) -> bool {
        match self.assignments.get_mut(path) {
            Some(assignment) => {
                assignment.timestamp = timestamp;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImagePath, &Assignment)> {
        self.assignments.iter()
    }

    /// Rows to persist, in catalog order; unlabelled images are left out
    pub fn rows_in_order(&self, catalog: &Catalog) -> Vec<PersistedRow> {
        catalog
            .paths()
            .iter()
            .filter_map(|path| {
                self.assignments.get(path).map(|assignment| PersistedRow {
                    timestamp: assignment.timestamp.clone(),
                    image_path: path.clone(),
                    label: assignment.label.clone(),
                })
            })
            .collect()
    }
}
