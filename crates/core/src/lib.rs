mod apply;
mod config;
mod enumerator;
mod exif_reader;
mod geo;
mod geocoder;
mod metadata;
mod planner;
mod record;
mod report;
mod resolver;
mod sanitize;
mod template;

pub use apply::{
    apply_batch, undo_from, undo_last, ApplyOptions, ApplyResult, RenameFailure, RenameOperation,
    UndoResult,
};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    ConfigError, GeocoderConfig, LocationStyle,
};
pub use enumerator::{enumerate_directory, EnumerateOptions};
pub use exif_reader::{read_exif_metadata, ExifMetadata, MetadataError};
pub use geo::{dms_to_decimal, Coordinates, Dms, Hemisphere};
pub use geocoder::{
    parse_reverse_response, GeocodeError, GeocodeOutcome, NominatimGeocoder, Place,
    ReverseGeocoder,
};
pub use metadata::extract_metadata;
pub use planner::{compose_names, run_pipeline, NamingOptions, PipelineOptions};
pub use record::{
    BatchStats, GeocodeStatus, GpsTags, MediaBatch, MediaFileRecord, MediaKind, TimestampSource,
};
pub use report::{render_csv, report_path, write_csv_report};
pub use resolver::{apply_timestamp_fallback, filesystem_timestamp, resolve_locations, ResolveOptions};
pub use template::{
    parse_template, render_template, validate_template, NameContext, TemplateError, TemplatePart,
    DEFAULT_TEMPLATE,
};
