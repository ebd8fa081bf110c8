use crate::geo::{Coordinates, Dms};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_extension(extension: &str) -> Self {
        if PHOTO_EXTENSIONS.contains(&extension) {
            MediaKind::Photo
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampSource {
    Exif,
    Filesystem,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GeocodeStatus {
    #[default]
    NotAttempted,
    /// GPS block present but one of the four coordinate tags is missing.
    Incomplete,
    Resolved,
    NotFound,
    Failed,
}

/// GPS tags as read from the EXIF GPS IFD.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GpsTags {
    pub latitude: Option<Dms>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<Dms>,
    pub longitude_ref: Option<String>,
    pub raw: BTreeMap<String, String>,
}

impl GpsTags {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.latitude_ref.is_none()
            && self.longitude.is_none()
            && self.longitude_ref.is_none()
            && self.raw.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFileRecord {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
    pub kind: MediaKind,
    pub is_file: bool,
    pub create_timestamp: Option<DateTime<Local>>,
    pub timestamp_source: Option<TimestampSource>,
    pub geo: Option<GpsTags>,
    pub coordinates: Option<Coordinates>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub geocode_status: GeocodeStatus,
    pub new_name: Option<String>,
    pub issues: Vec<String>,
}

impl MediaFileRecord {
    pub fn new(path: PathBuf, is_file: bool) -> Self {
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|v| v.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = if is_file {
            MediaKind::from_extension(&extension)
        } else {
            MediaKind::Other
        };

        Self {
            path,
            name,
            extension,
            kind,
            is_file,
            create_timestamp: None,
            timestamp_source: None,
            geo: None,
            coordinates: None,
            location: None,
            city: None,
            county: None,
            geocode_status: GeocodeStatus::NotAttempted,
            new_name: None,
            issues: Vec::new(),
        }
    }

    pub fn is_media(&self) -> bool {
        self.kind != MediaKind::Other
    }

    /// True when a new name was computed and differs from the current one.
    pub fn needs_rename(&self) -> bool {
        self.new_name
            .as_deref()
            .is_some_and(|new_name| new_name != self.name)
    }

    pub fn push_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub scanned_entries: usize,
    pub directories: usize,
    pub skipped_hidden: usize,
    pub photos: usize,
    pub videos: usize,
    pub other: usize,
    pub with_exif_timestamp: usize,
    pub with_filesystem_timestamp: usize,
    pub geocoded: usize,
    pub geocode_failures: usize,
    pub named: usize,
    pub unchanged: usize,
}

/// The records of one run, handed from stage to stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBatch {
    pub root: PathBuf,
    pub records: Vec<MediaFileRecord>,
    pub stats: BatchStats,
}

impl MediaBatch {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            records: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    pub fn renames(&self) -> impl Iterator<Item = &MediaFileRecord> {
        self.records.iter().filter(|r| r.needs_rename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_lowercased_extension() {
        let photo = MediaFileRecord::new(PathBuf::from("/tmp/IMG_0001.JPG"), true);
        assert_eq!(photo.extension, "jpg");
        assert_eq!(photo.kind, MediaKind::Photo);

        let video = MediaFileRecord::new(PathBuf::from("/tmp/clip.M4V"), true);
        assert_eq!(video.kind, MediaKind::Video);

        let other = MediaFileRecord::new(PathBuf::from("/tmp/notes.txt"), true);
        assert_eq!(other.kind, MediaKind::Other);

        let no_ext = MediaFileRecord::new(PathBuf::from("/tmp/README"), true);
        assert_eq!(no_ext.extension, "");
        assert_eq!(no_ext.kind, MediaKind::Other);
    }

    #[test]
    fn directories_are_never_media() {
        let dir = MediaFileRecord::new(PathBuf::from("/tmp/holiday.jpg"), false);
        assert_eq!(dir.kind, MediaKind::Other);
        assert!(!dir.is_media());
    }

    #[test]
    fn needs_rename_only_when_name_differs() {
        let mut record = MediaFileRecord::new(PathBuf::from("/tmp/a.jpg"), true);
        assert!(!record.needs_rename());

        record.new_name = Some("a.jpg".to_string());
        assert!(!record.needs_rename());

        record.new_name = Some("2021-10-13-14.35 - Foto.jpg".to_string());
        assert!(record.needs_rename());
    }
}
