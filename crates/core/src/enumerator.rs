use crate::record::{MediaBatch, MediaFileRecord, MediaKind};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    pub recursive: bool,
    pub include_hidden: bool,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            include_hidden: true,
        }
    }
}

/// One record per directory entry. Nothing is filtered by type here;
/// classification travels on the record as [`MediaKind`].
pub fn enumerate_directory(root: &Path, options: &EnumerateOptions) -> Result<MediaBatch> {
    if !root.exists() {
        bail!("directory does not exist: {}", root.display());
    }
    if !root.is_dir() {
        bail!("not a directory: {}", root.display());
    }

    let mut batch = MediaBatch::new(root.to_path_buf());
    let entries = if options.recursive {
        let (entries, pruned) = walk_recursive(root, options.include_hidden)?;
        batch.stats.scanned_entries += pruned;
        batch.stats.skipped_hidden += pruned;
        entries
    } else {
        list_flat(root)?
    };

    for (path, is_dir) in entries {
        batch.stats.scanned_entries += 1;
        if is_hidden(&path) && !options.include_hidden {
            batch.stats.skipped_hidden += 1;
            continue;
        }

        let record = MediaFileRecord::new(path, !is_dir);
        if is_dir {
            batch.stats.directories += 1;
        }
        match record.kind {
            MediaKind::Photo => batch.stats.photos += 1,
            MediaKind::Video => batch.stats.videos += 1,
            MediaKind::Other => batch.stats.other += 1,
        }
        debug!(name = %record.name, kind = record.kind.as_str(), "enumerated entry");
        batch.records.push(record);
    }

    batch.records.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        root = %root.display(),
        entries = batch.records.len(),
        photos = batch.stats.photos,
        videos = batch.stats.videos,
        "directory enumerated"
    );
    Ok(batch)
}

fn list_flat(root: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut out = Vec::new();
    for entry in
        fs::read_dir(root).with_context(|| format!("cannot read directory: {}", root.display()))?
    {
        let entry = entry.with_context(|| format!("cannot read entry in: {}", root.display()))?;
        let is_dir = entry
            .file_type()
            .map(|t| t.is_dir())
            .unwrap_or_else(|_| entry.path().is_dir());
        out.push((entry.path(), is_dir));
    }
    Ok(out)
}

/// Hidden directories are pruned whole when `include_hidden` is off; the
/// second value counts the pruned entries.
fn walk_recursive(root: &Path, include_hidden: bool) -> Result<(Vec<(PathBuf, bool)>, usize)> {
    let mut out = Vec::new();
    let mut pruned = 0usize;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let keep = include_hidden || entry.depth() == 0 || !is_hidden(entry.path());
            if !keep {
                pruned += 1;
            }
            keep
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("directory walk failed: {}", root.display()))?;
        out.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
    }
    Ok((out, pruned))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_every_entry_without_filtering() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("b.JPG"), b"x").expect("write");
        fs::write(temp.path().join("a.mp4"), b"x").expect("write");
        fs::write(temp.path().join("notes.txt"), b"x").expect("write");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");
        fs::write(temp.path().join("sub").join("deep.jpg"), b"x").expect("write");

        let batch = enumerate_directory(temp.path(), &EnumerateOptions::default()).expect("ok");
        let names: Vec<&str> = batch.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.JPG", "notes.txt", "sub"]);
        assert_eq!(batch.records[1].extension, "jpg");
        assert_eq!(batch.stats.photos, 1);
        assert_eq!(batch.stats.videos, 1);
        assert_eq!(batch.stats.other, 2);
        assert_eq!(batch.stats.directories, 1);
    }

    #[test]
    fn recursive_walk_descends_into_subdirectories() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");
        fs::write(temp.path().join("sub").join("deep.jpg"), b"x").expect("write");

        let options = EnumerateOptions {
            recursive: true,
            include_hidden: true,
        };
        let batch = enumerate_directory(temp.path(), &options).expect("ok");
        assert!(batch
            .records
            .iter()
            .any(|r| r.name == "deep.jpg" && r.kind == MediaKind::Photo));
    }

    #[test]
    fn hidden_entries_can_be_skipped() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join(".hidden.jpg"), b"x").expect("write");
        fs::write(temp.path().join("shown.jpg"), b"x").expect("write");

        let options = EnumerateOptions {
            recursive: false,
            include_hidden: false,
        };
        let batch = enumerate_directory(temp.path(), &options).expect("ok");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.stats.skipped_hidden, 1);
    }

    #[test]
    fn recursive_walk_prunes_hidden_directories() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join(".hidden")).expect("mkdir");
        fs::write(temp.path().join(".hidden").join("inside.jpg"), b"x").expect("write");
        fs::create_dir(temp.path().join("visible")).expect("mkdir");
        fs::write(temp.path().join("visible").join("shown.jpg"), b"x").expect("write");

        let options = EnumerateOptions {
            recursive: true,
            include_hidden: false,
        };
        let batch = enumerate_directory(temp.path(), &options).expect("ok");
        let names: Vec<&str> = batch.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["visible", "shown.jpg"]);
        assert_eq!(batch.stats.skipped_hidden, 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let err = enumerate_directory(&temp.path().join("nope"), &EnumerateOptions::default())
            .expect_err("must fail");
        assert!(err.to_string().contains("does not exist"));
    }
}
