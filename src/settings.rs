//! Project paths and the remembered last project
//!
//! The last successfully opened project is kept as JSON in the user's
//! config directory:
//! - Linux: ~/.config/image-labeller/settings.json
//! - macOS: ~/Library/Application Support/image-labeller/settings.json
//! - Windows: %APPDATA%\image-labeller\settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Default CSV file name, placed inside the images folder
pub const DEFAULT_CSV_NAME: &str = "labels.csv";

/// The three locations that make up a labelling project
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPaths {
    pub images_dir: PathBuf,
    pub labels_file: PathBuf,
    /// None means `<images_dir>/labels.csv`
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
}

impl ProjectPaths {
    /// Build from raw text fields; `~` is expanded and a blank CSV field
    /// falls back to the default location.
    pub fn from_inputs(images_dir: &str, labels_file: &str, csv_path: &str) -> Self {
        let csv_path = csv_path.trim();
        ProjectPaths {
            images_dir: expand_home(images_dir),
            labels_file: expand_home(labels_file),
            csv_path: (!csv_path.is_empty()).then(|| expand_home(csv_path)),
        }
    }

    pub fn resolved_csv_path(&self) -> PathBuf {
        self.csv_path
            .clone()
            .unwrap_or_else(|| self.images_dir.join(DEFAULT_CSV_NAME))
    }
}

/// CSV field text after the images folder changes from `old_images` to `new_images`.
///
/// The field follows the folder while it is blank or still names the old
/// folder's default CSV. Any other path was picked by the user and is kept.
pub fn csv_for_images_dir(csv_input: &str, old_images: &str, new_images: &str) -> String {
    let csv = csv_input.trim();
    let old_default = ProjectPaths::from_inputs(old_images, "", "").resolved_csv_path();

    if !csv.is_empty() && expand_home(csv) != old_default {
        return csv_input.to_string();
    }
    if new_images.trim().is_empty() {
        return String::new();
    }

    ProjectPaths::from_inputs(new_images, "", "")
        .resolved_csv_path()
        .display()
        .to_string()
}

/// Everything persisted between runs
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub last_project: Option<ProjectPaths>,
}

impl Settings {
    /// Read settings from `path`. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write settings to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from the standard location; problems are logged, never fatal.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("⚠️  Ignoring unreadable settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Record `project` as the last opened one and save to the standard location.
    pub fn remember(project: &ProjectPaths) {
        let Some(path) = settings_path() else {
            return;
        };

        let mut settings = Self::load();
        settings.last_project = Some(project.clone());

        match settings.save_to(&path) {
            Ok(()) => info!("📁 Remembered project in {}", path.display()),
            Err(e) => warn!("⚠️  Could not save settings {}: {}", path.display(), e),
        }
    }
}

/// Get the path where settings should be stored
fn settings_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
    path.push("image-labeller");
    path.push("settings.json");
    Some(path)
}

/// Expand a leading `~` to the home directory and trim whitespace
pub fn expand_home(input: &str) -> PathBuf {
    let input = input.trim();

    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    PathBuf::from(input)
}
