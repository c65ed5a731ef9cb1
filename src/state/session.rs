use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use super::annotations::AnnotationStore;
use super::catalog::Catalog;
use super::counts::LabelCounts;
use super::cursor::Cursor;
use super::data::{Assignment, Label, LabelOutcome, PersistedRow, TIMESTAMP_FORMAT};
use super::persistence;
use super::taxonomy::Taxonomy;
use crate::error::{LabelError, Result};
use crate::settings::ProjectPaths;

/// One open labelling project.
///
/// Owns the annotation store, the per-label counts and the cursor. The
/// taxonomy and catalog are fixed for the lifetime of the session; opening
/// another project means building a new `Session`.
#[derive(Debug)]
pub struct Session {
    taxonomy: Taxonomy,
    catalog: Catalog,
    store: AnnotationStore,
    counts: LabelCounts,
    cursor: Cursor,
    csv_path: PathBuf,
}

/// A freshly opened session plus any non-fatal problem met while loading
#[derive(Debug)]
pub struct OpenedSession {
    pub session: Session,
    /// Set when the existing CSV could not be read; the session then
    /// starts with no annotations
    pub load_warning: Option<LabelError>,
}

impl Session {
    /// Empty session: no annotations, every count at zero, cursor at 0.
    pub fn new(taxonomy: Taxonomy, catalog: Catalog, csv_path: PathBuf) -> Self {
        let counts = LabelCounts::new(&taxonomy);
        let cursor = Cursor::new(catalog.len());

        Session {
            taxonomy,
            catalog,
            store: AnnotationStore::new(),
            counts,
            cursor,
            csv_path,
        }
    }

    /// Load labels, scan images and merge any existing CSV.
    pub fn open(paths: &ProjectPaths) -> Result<OpenedSession> {
        let taxonomy = Taxonomy::load(&paths.labels_file)?;
        let catalog = Catalog::scan(&paths.images_dir)?;
        let mut session = Session::new(taxonomy, catalog, paths.resolved_csv_path());

        let load_warning = match persistence::load(&session.csv_path) {
            Ok(rows) => {
                session.reconcile(rows);
                None
            }
            Err(e) => {
                warn!("⚠️  {}", e);
                Some(e)
            }
        };

        info!(
            "🏷️  Opened project: {} labels, {} images, {} already labelled",
            session.taxonomy.len(),
            session.catalog.len(),
            session.total_labeled()
        );

        Ok(OpenedSession {
            session,
            load_warning,
        })
    }

    /// Merge persisted rows into the session.
    ///
    /// Rows for images outside the catalog are dropped. Later rows for the
    /// same image replace earlier ones. Labels missing from the taxonomy are
    /// kept on the image but not counted.
    pub fn reconcile<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = PersistedRow>,
    {
        let mut foreign = 0usize;
        let mut legacy = 0usize;

        for row in rows {
            if !self.catalog.contains(&row.image_path) {
                foreign += 1;
                continue;
            }

            if !self.counts.is_tracked(&row.label) {
                legacy += 1;
            }

            let assignment = Assignment {
                timestamp: row.timestamp,
                label: row.label,
            };
            let label = assignment.label.clone();

            if let Some(previous) = self.store.insert(row.image_path, assignment) {
                self.counts.decrement(&previous.label);
            }
            self.counts.increment(&label);
        }

        if foreign > 0 {
            debug!("Ignored {} rows for images outside this folder", foreign);
        }
        if legacy > 0 {
            info!("{} rows use labels not in the labels file; kept but not counted", legacy);
        }
        debug_assert_eq!(self.counts.total(), self.total_labeled());
    }

    /// Label `path` with the current local time, then rewrite the CSV.
    pub fn set_label(&mut self, path: &str, label: &str) -> Result<LabelOutcome> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.set_label_at(path, label, timestamp)
    }

    /// Label `path` with an explicit timestamp, then rewrite the CSV.
    ///
    /// Unknown paths and labels are ignored without touching the file. If
    /// the write fails the in-memory change stays and the error is returned.
    pub fn set_label_at(&mut self, path: &str, label: &str, timestamp: String) -> Result<LabelOutcome> {
        if !self.catalog.contains(path) || !self.taxonomy.contains(label) {
            debug!("Ignoring label {:?} for {:?}", label, path);
            return Ok(LabelOutcome::Ignored);
        }

        let previous = self.store.get(path).map(|a| a.label.clone());

        let outcome = if previous.as_deref() == Some(label) {
            self.store.touch(path, timestamp);
            LabelOutcome::Refreshed
        } else {
            if let Some(previous) = &previous {
                self.counts.decrement(previous);
            }
            self.store.insert(
                path.to_string(),
                Assignment {
                    timestamp,
                    label: label.to_string(),
                },
            );
            self.counts.increment(label);
            LabelOutcome::Changed { previous }
        };

        self.save()?;
        Ok(outcome)
    }

    /// Label the image under the cursor, then move to the next image.
    ///
    /// The cursor moves even if saving failed, since the label is recorded.
    pub fn label_current(&mut self, label: &str) -> Result<LabelOutcome> {
        let Some(path) = self.current_path().map(str::to_string) else {
            return Ok(LabelOutcome::Ignored);
        };

        let result = self.set_label(&path, label);
        if !matches!(result, Ok(LabelOutcome::Ignored)) {
            self.cursor.advance();
        }
        result
    }

    /// Rewrite the CSV from the current store.
    pub fn save(&self) -> Result<()> {
        persistence::save(&self.csv_path, &self.store.rows_in_order(&self.catalog))
    }

    /// Current label of `path`, None when unlabelled
    pub fn label_of(&self, path: &str) -> Option<&str> {
        self.store.get(path).map(|a| a.label.as_str())
    }

    pub fn assignment_of(&self, path: &str) -> Option<&Assignment> {
        self.store.get(path)
    }

    /// Number of images whose label is in the taxonomy
    pub fn total_labeled(&self) -> usize {
        self.store
            .iter()
            .filter(|(_, assignment)| self.counts.is_tracked(&assignment.label))
            .count()
    }

    pub fn count_for(&self, label: &str) -> usize {
        self.counts.get(label)
    }

    pub fn labels(&self) -> &[Label] {
        self.taxonomy.labels()
    }

    pub fn image_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor.position()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.cursor
            .position()
            .and_then(|i| self.catalog.get(i))
            .map(String::as_str)
    }

    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    pub fn retreat(&mut self) {
        self.cursor.retreat();
    }

    /// e.g. "Labeled 3 / 10 images"
    pub fn progress_text(&self) -> String {
        if self.catalog.is_empty() {
            return "No images loaded".to_string();
        }
        format!(
            "Labeled {} / {} images",
            self.total_labeled(),
            self.image_count()
        )
    }

    /// e.g. "img001.png — 1/10"
    pub fn caption(&self) -> String {
        match (self.position(), self.current_path()) {
            (Some(index), Some(path)) => {
                let name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.to_string());
                format!("{} — {}/{}", name, index + 1, self.catalog.len())
            }
            _ => "No images loaded".to_string(),
        }
    }
}
