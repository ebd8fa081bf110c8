use crate::config::LocationStyle;
use crate::geo::Coordinates;
use crate::geocoder::{GeocodeOutcome, Place, ReverseGeocoder};
use crate::record::{GeocodeStatus, MediaBatch, MediaFileRecord, TimestampSource};
use crate::sanitize::sanitize_location;
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Gap between two consecutive requests, whatever the first one returned.
    pub pacing: Duration,
    pub location_style: LocationStyle,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(1),
            location_style: LocationStyle::Display,
        }
    }
}

/// Resolves a place for every record with a complete GPS block.
///
/// Requests go out strictly one after another. A failed or empty lookup
/// leaves the location fields empty; the record stays in the batch.
pub fn resolve_locations(
    mut batch: MediaBatch,
    geocoder: &dyn ReverseGeocoder,
    options: &ResolveOptions,
) -> MediaBatch {
    let mut requested = false;
    for record in batch.records.iter_mut() {
        let Some(geo) = record.geo.as_ref() else {
            continue;
        };
        let Some(coordinates) = Coordinates::from_gps(geo) else {
            debug!(name = %record.name, "incomplete GPS tags, skipping lookup");
            record.geocode_status = GeocodeStatus::Incomplete;
            continue;
        };
        record.coordinates = Some(coordinates);

        if requested && !options.pacing.is_zero() {
            thread::sleep(options.pacing);
        }
        requested = true;

        match geocoder.reverse(coordinates) {
            GeocodeOutcome::Found(place) => {
                apply_place(record, place, options.location_style);
                batch.stats.geocoded += 1;
            }
            GeocodeOutcome::NotFound => {
                info!(name = %record.name, "no place known for coordinates");
                record.geocode_status = GeocodeStatus::NotFound;
            }
            GeocodeOutcome::Failed(err) => {
                warn!(name = %record.name, error = %err, "reverse geocoding failed");
                record.geocode_status = GeocodeStatus::Failed;
                record.push_issue(format!("geocode: {err}"));
                batch.stats.geocode_failures += 1;
            }
        }
    }

    info!(
        resolved = batch.stats.geocoded,
        failed = batch.stats.geocode_failures,
        "locations resolved"
    );
    batch
}

fn apply_place(record: &mut MediaFileRecord, place: Place, style: LocationStyle) {
    let label = match style {
        LocationStyle::Display => &place.display_name,
        LocationStyle::City => place
            .city
            .as_ref()
            .or(place.county.as_ref())
            .unwrap_or(&place.display_name),
    };
    let location = sanitize_location(label);
    debug!(name = %record.name, location = %location, "resolved location");

    record.location = Some(location).filter(|v| !v.is_empty());
    record.city = place.city;
    record.county = place.county;
    record.geocode_status = GeocodeStatus::Resolved;
}

/// Fills still-missing timestamps from the filesystem.
pub fn apply_timestamp_fallback(mut batch: MediaBatch) -> MediaBatch {
    for record in batch.records.iter_mut() {
        if record.create_timestamp.is_some() || !record.is_media() {
            continue;
        }
        match filesystem_timestamp(&record.path) {
            Some(time) => {
                record.create_timestamp = Some(time);
                record.timestamp_source = Some(TimestampSource::Filesystem);
                batch.stats.with_filesystem_timestamp += 1;
            }
            None => {
                warn!(name = %record.name, "no timestamp available, file will not be renamed");
                record.push_issue("no timestamp available");
            }
        }
    }
    batch
}

/// Creation time where the platform reports one (Windows, statx birth time),
/// otherwise last modification.
pub fn filesystem_timestamp(path: &Path) -> Option<DateTime<Local>> {
    let meta = fs::metadata(path).ok()?;
    let time = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::from(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Dms;
    use crate::geocoder::GeocodeError;
    use crate::record::GpsTags;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::time::Instant;
    use tempfile::tempdir;

    struct FakeGeocoder {
        outcome: fn() -> GeocodeOutcome,
        calls: RefCell<Vec<Coordinates>>,
    }

    impl FakeGeocoder {
        fn new(outcome: fn() -> GeocodeOutcome) -> Self {
            Self {
                outcome,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ReverseGeocoder for FakeGeocoder {
        fn reverse(&self, coordinates: Coordinates) -> GeocodeOutcome {
            self.calls.borrow_mut().push(coordinates);
            (self.outcome)()
        }
    }

    fn found() -> GeocodeOutcome {
        GeocodeOutcome::Found(Place {
            display_name: "Piazza Navona, Roma, Lazio, Italia".to_string(),
            city: Some("Roma".to_string()),
            county: Some("Roma Capitale".to_string()),
        })
    }

    fn failed() -> GeocodeOutcome {
        GeocodeOutcome::Failed(GeocodeError::Status(503))
    }

    fn not_found() -> GeocodeOutcome {
        GeocodeOutcome::NotFound
    }

    fn gps(lat_ref: &str) -> GpsTags {
        GpsTags {
            latitude: Some(Dms::new(41.0, 53.0, 56.0)),
            latitude_ref: Some(lat_ref.to_string()),
            longitude: Some(Dms::new(12.0, 28.0, 23.0)),
            longitude_ref: Some("E".to_string()),
            ..GpsTags::default()
        }
    }

    fn batch_with(records: Vec<MediaFileRecord>) -> MediaBatch {
        let mut batch = MediaBatch::new(PathBuf::from("/tmp"));
        batch.records = records;
        batch
    }

    fn photo(name: &str, geo: Option<GpsTags>) -> MediaFileRecord {
        let mut record = MediaFileRecord::new(PathBuf::from("/tmp").join(name), true);
        record.geo = geo;
        record
    }

    fn no_pacing(style: LocationStyle) -> ResolveOptions {
        ResolveOptions {
            pacing: Duration::ZERO,
            location_style: style,
        }
    }

    #[test]
    fn resolved_place_fills_location_city_and_county() {
        let geocoder = FakeGeocoder::new(found);
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N")))]);
        let batch = resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::Display));

        let record = &batch.records[0];
        assert_eq!(
            record.location.as_deref(),
            Some("Piazza-Navona_Roma_Lazio_Italia")
        );
        assert_eq!(record.city.as_deref(), Some("Roma"));
        assert_eq!(record.county.as_deref(), Some("Roma Capitale"));
        assert_eq!(record.geocode_status, GeocodeStatus::Resolved);
        assert_eq!(batch.stats.geocoded, 1);
    }

    #[test]
    fn city_style_prefers_city() {
        let geocoder = FakeGeocoder::new(found);
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N")))]);
        let batch = resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::City));
        assert_eq!(batch.records[0].location.as_deref(), Some("Roma"));
    }

    #[test]
    fn failure_leaves_location_empty_and_keeps_record() {
        let geocoder = FakeGeocoder::new(failed);
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N")))]);
        let batch = resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::Display));

        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert!(record.location.is_none());
        assert!(record.city.is_none());
        assert!(record.county.is_none());
        assert_eq!(record.geocode_status, GeocodeStatus::Failed);
        assert_eq!(record.issues.len(), 1);
        assert_eq!(batch.stats.geocode_failures, 1);
    }

    #[test]
    fn not_found_is_not_an_issue() {
        let geocoder = FakeGeocoder::new(not_found);
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N")))]);
        let batch = resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::Display));
        assert_eq!(batch.records[0].geocode_status, GeocodeStatus::NotFound);
        assert!(batch.records[0].issues.is_empty());
    }

    #[test]
    fn incomplete_or_missing_gps_skips_lookup() {
        let geocoder = FakeGeocoder::new(found);
        let mut partial = gps("N");
        partial.latitude = None;
        let batch = batch_with(vec![photo("a.jpg", Some(partial)), photo("b.jpg", None)]);
        let batch = resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::Display));

        assert!(geocoder.calls.borrow().is_empty());
        assert_eq!(batch.records[0].geocode_status, GeocodeStatus::Incomplete);
        assert_eq!(batch.records[1].geocode_status, GeocodeStatus::NotAttempted);
    }

    #[test]
    fn southern_reference_reaches_geocoder_negated() {
        let geocoder = FakeGeocoder::new(not_found);
        let batch = batch_with(vec![photo("a.jpg", Some(gps("S")))]);
        resolve_locations(batch, &geocoder, &no_pacing(LocationStyle::Display));
        let calls = geocoder.calls.borrow();
        assert!(calls[0].latitude < 0.0);
        assert!(calls[0].longitude > 0.0);
    }

    #[test]
    fn pacing_separates_consecutive_requests() {
        let options = ResolveOptions {
            pacing: Duration::from_millis(40),
            location_style: LocationStyle::Display,
        };

        let start = Instant::now();
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N"))), photo("b.jpg", Some(gps("N")))]);
        resolve_locations(batch, &FakeGeocoder::new(found), &options);
        assert!(start.elapsed() >= Duration::from_millis(40));

        let start = Instant::now();
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N"))), photo("b.jpg", Some(gps("N")))]);
        resolve_locations(batch, &FakeGeocoder::new(failed), &options);
        assert!(start.elapsed() >= Duration::from_millis(40));

        let start = Instant::now();
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N"))), photo("b.jpg", Some(gps("N")))]);
        resolve_locations(batch, &FakeGeocoder::new(not_found), &options);
        assert!(start.elapsed() >= Duration::from_millis(40));

        let start = Instant::now();
        let batch = batch_with(vec![photo("a.jpg", Some(gps("N")))]);
        resolve_locations(batch, &FakeGeocoder::new(found), &options);
        assert!(start.elapsed() < Duration::from_millis(40));
    }

    #[test]
    fn fallback_uses_filesystem_time_for_media_without_exif() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mp4");
        fs::write(&path, b"x").expect("write");
        let notes = temp.path().join("notes.txt");
        fs::write(&notes, b"x").expect("write");

        let batch = batch_with(vec![
            MediaFileRecord::new(path.clone(), true),
            MediaFileRecord::new(notes, true),
        ]);
        let batch = apply_timestamp_fallback(batch);

        let record = &batch.records[0];
        assert_eq!(record.timestamp_source, Some(TimestampSource::Filesystem));
        assert_eq!(record.create_timestamp, filesystem_timestamp(&path));
        assert!(record.location.is_none());
        assert!(batch.records[1].create_timestamp.is_none());
        assert_eq!(batch.stats.with_filesystem_timestamp, 1);
    }

    #[test]
    fn fallback_keeps_exif_timestamps() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a.jpg");
        fs::write(&path, b"x").expect("write");
        let exif_time = crate::exif_reader::parse_date("2021:10:13 14:35:00");

        let mut record = MediaFileRecord::new(path, true);
        record.create_timestamp = exif_time;
        record.timestamp_source = Some(TimestampSource::Exif);
        let batch = apply_timestamp_fallback(batch_with(vec![record]));

        assert_eq!(batch.records[0].create_timestamp, exif_time);
        assert_eq!(batch.records[0].timestamp_source, Some(TimestampSource::Exif));
    }

    #[test]
    fn missing_file_gets_no_timestamp() {
        let temp = tempdir().expect("tempdir");
        let record = MediaFileRecord::new(temp.path().join("vanished.jpg"), true);
        let batch = batch_with(vec![record]);
        let batch = apply_timestamp_fallback(batch);
        assert!(batch.records[0].create_timestamp.is_none());
        assert_eq!(batch.records[0].issues, vec!["no timestamp available".to_string()]);
    }
}
