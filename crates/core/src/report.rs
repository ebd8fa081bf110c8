use crate::record::{GeocodeStatus, MediaBatch, MediaFileRecord, TimestampSource};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const COLUMNS: &[&str] = &[
    "name",
    "extension",
    "kind",
    "create_timestamp",
    "timestamp_source",
    "latitude",
    "longitude",
    "geo",
    "geocode_status",
    "location",
    "city",
    "county",
    "new_name",
    "issues",
];

/// `<prefix>.csv`, keeping any directory part of the prefix.
pub fn report_path(prefix: &Path) -> PathBuf {
    let mut raw = prefix.as_os_str().to_os_string();
    raw.push(".csv");
    PathBuf::from(raw)
}

/// Writes one row per record with every attribute as a column.
pub fn write_csv_report(batch: &MediaBatch, prefix: &Path) -> Result<PathBuf> {
    let path = report_path(prefix);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create report directory: {}", dir.display()))?;
    }

    fs::write(&path, render_csv(batch))
        .with_context(|| format!("cannot write report: {}", path.display()))?;
    info!(path = %path.display(), rows = batch.records.len(), "report written");
    Ok(path)
}

pub fn render_csv(batch: &MediaBatch) -> String {
    let mut out = String::new();
    push_row(&mut out, COLUMNS.iter().map(|c| c.to_string()));
    for record in &batch.records {
        push_row(&mut out, record_fields(record));
    }
    out
}

fn record_fields(record: &MediaFileRecord) -> Vec<String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let geo = record
        .geo
        .as_ref()
        .map(|g| {
            g.raw
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();

    vec![
        record.name.clone(),
        record.extension.clone(),
        record.kind.as_str().to_string(),
        record
            .create_timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        match record.timestamp_source {
            Some(TimestampSource::Exif) => "exif".to_string(),
            Some(TimestampSource::Filesystem) => "filesystem".to_string(),
            None => String::new(),
        },
        record
            .coordinates
            .map(|c| format!("{:.6}", c.latitude))
            .unwrap_or_default(),
        record
            .coordinates
            .map(|c| format!("{:.6}", c.longitude))
            .unwrap_or_default(),
        geo,
        geocode_status_label(record.geocode_status).to_string(),
        opt(&record.location),
        opt(&record.city),
        opt(&record.county),
        opt(&record.new_name),
        record.issues.join("; "),
    ]
}

fn geocode_status_label(status: GeocodeStatus) -> &'static str {
    match status {
        GeocodeStatus::NotAttempted => "",
        GeocodeStatus::Incomplete => "incomplete",
        GeocodeStatus::Resolved => "resolved",
        GeocodeStatus::NotFound => "not_found",
        GeocodeStatus::Failed => "failed",
    }
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row = fields
        .into_iter()
        .map(|f| escape_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
