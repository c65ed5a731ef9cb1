//! CSV persistence for annotations
//!
//! The table has a fixed header (`timestamp,image_path,label`) and one row
//! per labelled image. Every save rewrites the whole file through a sibling
//! staging file that is renamed into place, so a reader never sees a
//! half-written table. A symlinked table is rewritten at its target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info, warn};

use super::data::{PersistedRow, CSV_HEADER};
use crate::error::{LabelError, Result};

/// Read all rows from an existing table.
///
/// A missing file is an empty table. Rows with the wrong number of columns,
/// undecodable rows and repeated header lines are skipped. Only failures
/// that affect the whole file (permissions, not a regular file) are errors.
pub fn load(path: &Path) -> Result<Vec<PersistedRow>> {
    if !path.exists() {
        debug!("No existing CSV at {}", path.display());
        return Ok(Vec::new());
    }

    let read_error = |source: csv::Error| LabelError::PersistenceRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(read_error)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(read_error(e)),
            Err(e) => {
                debug!("Skipping unreadable CSV row: {}", e);
                skipped += 1;
                continue;
            }
        };

        if record.len() != CSV_HEADER.len() {
            skipped += 1;
            continue;
        }

        let row: PersistedRow = match record.deserialize(None) {
            Ok(row) => row,
            Err(e) => {
                debug!("Skipping undecodable CSV row: {}", e);
                skipped += 1;
                continue;
            }
        };

        if row.is_header() {
            continue;
        }
        rows.push(row);
    }

    if skipped > 0 {
        warn!("⚠️  Skipped {} malformed rows in {}", skipped, path.display());
    }
    debug!("Read {} rows from {}", rows.len(), path.display());

    Ok(rows)
}

/// Replace the table at `path` with `rows`, header first.
///
/// An existing read-only table is reported, not replaced. The new file keeps
/// the permissions of the one it replaces.
pub fn save(path: &Path, rows: &[PersistedRow]) -> Result<()> {
    let target = resolve_target(path);
    let staging = staging_path(&target);

    let result = check_writable(&target)
        .and_then(|permissions| {
            write_rows(&staging, rows)?;
            if let Some(permissions) = permissions {
                fs::set_permissions(&staging, permissions)?;
            }
            Ok(())
        })
        .and_then(|_| fs::rename(&staging, &target).map_err(csv::Error::from));

    if let Err(source) = result {
        // Best effort; the staging file may never have been created
        let _ = fs::remove_file(&staging);
        warn!("❌ Failed to write {}: {}", path.display(), source);
        return Err(LabelError::PersistenceWrite {
            path: path.to_path_buf(),
            source,
        });
    }

    info!("💾 Saved {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn write_rows(path: &Path, rows: &[PersistedRow]) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// The file a save should replace: the link target when `path` is a symlink
fn resolve_target(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    // Dangling link: write where it points, keep the link itself
    match fs::read_link(path) {
        Ok(link) => match path.parent() {
            Some(dir) => dir.join(link),
            None => link,
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Permissions of the existing table, or an error if it is read-only
fn check_writable(target: &Path) -> csv::Result<Option<fs::Permissions>> {
    match fs::metadata(target) {
        Ok(metadata) if metadata.permissions().readonly() => {
            let denied = io::Error::new(io::ErrorKind::PermissionDenied, "file is read-only");
            Err(csv::Error::from(denied))
        }
        Ok(metadata) => Ok(Some(metadata.permissions())),
        Err(_) => Ok(None),
    }
}

/// Hidden sibling used while writing, e.g. `.labels.csv.tmp`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "labels.csv".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: &str, image_path: &str, label: &str) -> PersistedRow {
        PersistedRow {
            timestamp: timestamp.to_string(),
            image_path: image_path.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows = load(&dir.path().join("labels.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_save_writes_header_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let rows = vec![
            row("2024-01-01T12:00:00", "/abs/path/img001.png", "cat"),
            row("2024-01-01T12:00:05", "/abs/with,comma.png", "big \"dog\""),
        ];

        save(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,image_path,label"));
        assert_eq!(lines.next(), Some("2024-01-01T12:00:00,/abs/path/img001.png,cat"));
        assert_eq!(
            lines.next(),
            Some("2024-01-01T12:00:05,\"/abs/with,comma.png\",\"big \"\"dog\"\"\"")
        );
        assert!(!staging_path(&path).exists());

        assert_eq!(load(&path).unwrap(), rows);
    }

    #[test]
    fn test_save_empty_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        save(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "timestamp,image_path,label\n");
    }

    #[test]
    fn test_save_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        save(&path, &[row("t1", "/a.png", "cat"), row("t2", "/b.png", "dog")]).unwrap();
        save(&path, &[row("t3", "/a.png", "dog")]).unwrap();

        assert_eq!(load(&path).unwrap(), vec![row("t3", "/a.png", "dog")]);
    }

    #[test]
    fn test_load_skips_malformed_and_header_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(
            &path,
            "timestamp,image_path,label\n\
             t1,/a.png,cat\n\
             only,two\n\
             t2,/b.png,dog,extra\n\
             timestamp,image_path,label\n\
             t3,/c.png,bird\n",
        )
        .unwrap();

        let rows = load(&path).unwrap();
        assert_eq!(rows, vec![row("t1", "/a.png", "cat"), row("t3", "/c.png", "bird")]);
    }

    #[test]
    fn test_load_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(&path, "t1,/a.png,cat\n").unwrap();
        assert_eq!(load(&path).unwrap(), vec![row("t1", "/a.png", "cat")]);
    }

    #[test]
    fn test_load_directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LabelError::PersistenceRead { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_writes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared.csv");
        let link = dir.path().join("labels.csv");
        save(&shared, &[row("t1", "/a.png", "cat")]).unwrap();
        std::os::unix::fs::symlink(&shared, &link).unwrap();

        save(&link, &[row("t2", "/a.png", "dog")]).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(load(&shared).unwrap(), vec![row("t2", "/a.png", "dog")]);
        assert_eq!(load(&link).unwrap(), vec![row("t2", "/a.png", "dog")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        save(&path, &[]).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        save(&path, &[row("t1", "/a.png", "cat")]).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_save_refuses_read_only_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        save(&path, &[row("t1", "/a.png", "cat")]).unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        let err = save(&path, &[row("t2", "/a.png", "dog")]).unwrap_err();
        assert!(matches!(err, LabelError::PersistenceWrite { .. }));
        assert_eq!(load(&path).unwrap(), vec![row("t1", "/a.png", "cat")]);

        // Let the temp dir clean up on every platform
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(&path, permissions).unwrap();
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("labels.csv");
        let err = save(&path, &[row("t1", "/a.png", "cat")]).unwrap_err();
        assert!(matches!(err, LabelError::PersistenceWrite { .. }));
        assert!(!path.exists());
    }
}
