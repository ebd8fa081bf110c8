use crate::exif_reader::read_exif_metadata;
use crate::record::{MediaBatch, MediaFileRecord, MediaKind, TimestampSource};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Reads embedded timestamp and GPS tags for every photo record.
///
/// Files are independent, so extraction runs in parallel. A file that cannot
/// be opened or parsed keeps empty metadata and gets an issue recorded.
pub fn extract_metadata(mut batch: MediaBatch) -> MediaBatch {
    batch
        .records
        .par_iter_mut()
        .filter(|record| record.kind == MediaKind::Photo)
        .for_each(extract_one);

    batch.stats.with_exif_timestamp = batch
        .records
        .iter()
        .filter(|r| r.timestamp_source == Some(TimestampSource::Exif))
        .count();
    info!(
        with_timestamp = batch.stats.with_exif_timestamp,
        with_gps = batch.records.iter().filter(|r| r.geo.is_some()).count(),
        "metadata extracted"
    );
    batch
}

fn extract_one(record: &mut MediaFileRecord) {
    match read_exif_metadata(&record.path) {
        Ok(meta) => {
            if let Some(date) = meta.date {
                record.create_timestamp = Some(date);
                record.timestamp_source = Some(TimestampSource::Exif);
            }
            record.geo = meta.gps;
            debug!(
                name = %record.name,
                has_date = record.create_timestamp.is_some(),
                has_gps = record.geo.is_some(),
                "read EXIF"
            );
        }
        Err(err) if err.is_missing_exif() => {
            debug!(name = %record.name, "no EXIF block");
        }
        Err(err) => {
            warn!(name = %record.name, error = %err, "metadata unreadable, continuing without it");
            record.push_issue(format!("metadata: {err}"));
        }
    }
}
