use crate::geo::Dms;
use crate::record::GpsTags;
use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeDelta, TimeZone};
use exif::{Context as TagContext, Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TIMESTAMP_TAGS: &[Tag] = &[Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse EXIF in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },
}

impl MetadataError {
    /// The file is readable but simply carries no EXIF block.
    pub fn is_missing_exif(&self) -> bool {
        matches!(
            self,
            MetadataError::Parse {
                source: exif::Error::NotFound(_),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExifMetadata {
    pub date: Option<DateTime<Local>>,
    pub gps: Option<GpsTags>,
}

pub fn read_exif_metadata(path: &Path) -> Result<ExifMetadata, MetadataError> {
    let file = File::open(path).map_err(|source| MetadataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let date = TIMESTAMP_TAGS
        .iter()
        .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .find_map(|field| field_text(field).and_then(|raw| parse_date(&raw)));

    Ok(ExifMetadata {
        date,
        gps: read_gps(&exif),
    })
}

fn read_gps(exif: &Exif) -> Option<GpsTags> {
    let mut tags = GpsTags::default();
    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY || field.tag.context() != TagContext::Gps {
            continue;
        }
        tags.raw.insert(
            field.tag.to_string(),
            field.display_value().with_unit(exif).to_string(),
        );
        match field.tag {
            Tag::GPSLatitude => tags.latitude = rational_dms(field),
            Tag::GPSLongitude => tags.longitude = rational_dms(field),
            Tag::GPSLatitudeRef => tags.latitude_ref = field_text(field),
            Tag::GPSLongitudeRef => tags.longitude_ref = field_text(field),
            _ => {}
        }
    }

    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

fn rational_dms(field: &Field) -> Option<Dms> {
    match field.value {
        Value::Rational(ref v) if v.len() >= 3 => {
            let (d, m, s) = (v[0].to_f64(), v[1].to_f64(), v[2].to_f64());
            if d.is_finite() && m.is_finite() && s.is_finite() {
                Some(Dms::new(d, m, s))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn field_text(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_matches('\0').trim().to_string())
            .filter(|v| !v.is_empty()),
        _ => Some(field.display_value().to_string()),
    }
}

pub(crate) fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim().trim_matches('"');

    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = resolve_local(&naive, |n| Local.from_local_datetime(n)) {
                return Some(local);
            }
        }
    }

    None
}

/// Picks the earlier instant for ambiguous wall-clock times. A time inside a
/// spring-forward gap is moved one hour ahead.
fn resolve_local<Tz: TimeZone>(
    naive: &NaiveDateTime,
    lookup: impl Fn(&NaiveDateTime) -> LocalResult<DateTime<Tz>>,
) -> Option<DateTime<Tz>> {
    lookup(naive)
        .earliest()
        .or_else(|| lookup(&(*naive + TimeDelta::hours(1))).earliest())
}
