use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::data::ImagePath;
use crate::error::{LabelError, Result};

/// Supported image extensions (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp"];

/// Sorted list of every image found under the project folder.
///
/// The order is the lexicographic order of the canonical path strings, so
/// two scans of an unchanged tree give the same cursor positions and the
/// same CSV row order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    paths: Vec<ImagePath>,
    positions: HashMap<ImagePath, usize>,
}

impl Catalog {
    /// Walk `root` recursively and collect all supported images.
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(LabelError::InvalidFolder(root.to_path_buf()));
        }

        let mut paths = Vec::new();

        // Walk the directory tree recursively
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Only process files (not directories)
            if !path.is_file() || !has_image_extension(path) {
                continue;
            }

            let resolved = match path.canonicalize() {
                Ok(resolved) => resolved,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            // Lossy names would collide and could not be written back to the CSV
            match resolved.to_str() {
                Some(resolved) => paths.push(resolved.to_string()),
                None => warn!("⚠️  Skipping non-UTF-8 path {}", resolved.display()),
            }
        }

        if paths.is_empty() {
            return Err(LabelError::EmptyCatalog(root.to_path_buf()));
        }

        let catalog = Self::from_paths(paths);
        info!("🔍 Found {} images under {}", catalog.len(), root.display());
        Ok(catalog)
    }

    /// Build a catalog from already-resolved paths (sorted and deduplicated here).
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ImagePath>,
    {
        let mut paths: Vec<ImagePath> = paths.into_iter().map(Into::into).collect();
        paths.sort();
        paths.dedup();

        let positions = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        Catalog { paths, positions }
    }

    pub fn paths(&self) -> &[ImagePath] {
        &self.paths
    }

    pub fn get(&self, index: usize) -> Option<&ImagePath> {
        self.paths.get(index)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.positions.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Check the extension against the allow-list, ignoring case
fn has_image_extension(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.png"));
        touch(&root.join("a.JPG"));
        touch(&root.join("nested/deeper/c.webp"));
        touch(&root.join("notes.txt"));
        touch(&root.join("noext"));
        touch(&root.join("d.tif"));

        let catalog = Catalog::scan(root).unwrap();
        let canonical_root = root.canonicalize().unwrap();
        let expected: Vec<String> = {
            let mut v = vec![
                canonical_root.join("a.JPG").to_string_lossy().to_string(),
                canonical_root.join("b.png").to_string_lossy().to_string(),
                canonical_root
                    .join("nested/deeper/c.webp")
                    .to_string_lossy()
                    .to_string(),
            ];
            v.sort();
            v
        };

        assert_eq!(catalog.paths(), expected.as_slice());
        assert!(catalog.contains(&expected[0]));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.png", "m.gif", "a.bmp", "sub/k.tiff"] {
            touch(&dir.path().join(name));
        }

        let first = Catalog::scan(dir.path()).unwrap();
        let second = Catalog::scan(dir.path()).unwrap();
        assert_eq!(first.paths(), second.paths());
    }

    #[test]
    fn test_scan_empty_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("readme.md"));

        let err = Catalog::scan(dir.path()).unwrap_err();
        assert!(matches!(err, LabelError::EmptyCatalog(_)));
    }

    #[test]
    fn test_scan_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::scan(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, LabelError::InvalidFolder(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_scan_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(OsStr::from_bytes(b"a\xff.png")));
        touch(&dir.path().join(OsStr::from_bytes(b"a\xfe.png")));
        touch(&dir.path().join("b.png"));

        let catalog = Catalog::scan(dir.path()).unwrap();
        let expected = dir.path().canonicalize().unwrap().join("b.png");
        assert_eq!(catalog.paths(), &[expected.to_str().unwrap().to_string()]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_scan_only_non_utf8_names_is_empty() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(OsStr::from_bytes(b"\xff.png")));

        let err = Catalog::scan(dir.path()).unwrap_err();
        assert!(matches!(err, LabelError::EmptyCatalog(_)));
    }

    #[test]
    fn test_from_paths_dedups() {
        let catalog = Catalog::from_paths(["/b.png", "/a.png", "/b.png"]);
        assert_eq!(catalog.paths(), &["/a.png".to_string(), "/b.png".to_string()]);
    }
}
