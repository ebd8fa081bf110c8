use crate::config::AppConfig;
use crate::enumerator::{enumerate_directory, EnumerateOptions};
use crate::geocoder::ReverseGeocoder;
use crate::metadata::extract_metadata;
use crate::record::{MediaBatch, MediaKind};
use crate::resolver::{apply_timestamp_fallback, resolve_locations, ResolveOptions};
use crate::sanitize::{sanitize_filename, truncate_filename_if_needed};
use crate::template::{parse_template, render_template, NameContext, DEFAULT_TEMPLATE};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const MAX_COLLISION_SUFFIX: usize = 9999;

#[derive(Debug, Clone)]
pub struct NamingOptions {
    pub template: String,
    pub pad_date_components: bool,
    pub photo_label: String,
    pub video_label: String,
    pub max_filename_len: usize,
}

impl Default for NamingOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            pad_date_components: false,
            photo_label: config.photo_label,
            video_label: config.video_label,
            max_filename_len: config.max_filename_len,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub root: PathBuf,
    pub enumerate: EnumerateOptions,
    pub resolve: ResolveOptions,
    pub naming: NamingOptions,
}

impl PipelineOptions {
    pub fn from_config(root: PathBuf, config: &AppConfig) -> Self {
        Self {
            root,
            enumerate: EnumerateOptions {
                recursive: config.recursive_default,
                include_hidden: config.include_hidden_default,
            },
            resolve: ResolveOptions {
                pacing: Duration::from_millis(config.geocoder.pacing_ms),
                location_style: config.location_style,
            },
            naming: NamingOptions {
                template: config.template.clone(),
                pad_date_components: config.pad_date_components,
                photo_label: config.photo_label.clone(),
                video_label: config.video_label.clone(),
                max_filename_len: config.max_filename_len,
            },
        }
    }
}

/// Enumerate, extract, resolve, then name. Nothing on disk is modified.
///
/// Without a geocoder the location stage is skipped and every record gets
/// its media-type label.
pub fn run_pipeline(
    options: &PipelineOptions,
    geocoder: Option<&dyn ReverseGeocoder>,
) -> Result<MediaBatch> {
    parse_template(&options.naming.template)?;

    let batch = enumerate_directory(&options.root, &options.enumerate)?;
    let batch = extract_metadata(batch);
    let batch = match geocoder {
        Some(geocoder) => resolve_locations(batch, geocoder, &options.resolve),
        None => batch,
    };
    let batch = apply_timestamp_fallback(batch);
    compose_names(batch, &options.naming)
}

/// Computes `new_name` for every media record that has a timestamp.
///
/// Targets already taken on disk or by an earlier record get a `_001`,
/// `_002`, ... suffix. A record whose computed name equals its current name
/// is left as is, so running over an already renamed directory changes nothing.
pub fn compose_names(mut batch: MediaBatch, options: &NamingOptions) -> Result<MediaBatch> {
    let parts = parse_template(&options.template)?;
    let mut planned_paths = HashSet::<PathBuf>::new();
    let mut named = 0usize;
    let mut unchanged = 0usize;

    for record in batch.records.iter_mut() {
        let Some(date) = record.create_timestamp else {
            continue;
        };
        let label = match (record.location.as_deref(), record.kind) {
            (_, MediaKind::Other) => continue,
            (Some(location), _) => location,
            (None, MediaKind::Photo) => options.photo_label.as_str(),
            (None, MediaKind::Video) => options.video_label.as_str(),
        };

        let original_stem = record
            .path
            .file_stem()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let ctx = NameContext {
            date,
            label,
            original_stem: &original_stem,
        };
        let rendered = render_template(&parts, &ctx, options.pad_date_components);
        let sanitized = sanitize_filename(&rendered);

        let extension = if record.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", record.extension)
        };
        let truncated =
            truncate_filename_if_needed(&sanitized, &extension, options.max_filename_len);
        let target = resolve_collision(
            &record.path,
            &truncated,
            &extension,
            &mut planned_paths,
            options.max_filename_len,
        )?;

        let new_name = target
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .context("computed target has no file name")?;
        if new_name == record.name {
            unchanged += 1;
        }
        debug!(from = %record.name, to = %new_name, "computed name");
        record.new_name = Some(new_name);
        named += 1;
    }

    batch.stats.named = named;
    batch.stats.unchanged = unchanged;
    info!(named, unchanged, "names composed");
    Ok(batch)
}

fn resolve_collision(
    original_path: &Path,
    base: &str,
    extension: &str,
    planned_paths: &mut HashSet<PathBuf>,
    max_len: usize,
) -> Result<PathBuf> {
    let parent = original_path
        .parent()
        .context("cannot determine parent directory")?;

    let mut candidate = parent.join(format!("{}{}", base, extension));
    if is_available(&candidate, original_path, planned_paths) {
        planned_paths.insert(candidate.clone());
        return Ok(candidate);
    }

    let ext_len = extension.chars().count();
    for n in 1..=MAX_COLLISION_SUFFIX {
        let suffix = format!("_{:03}", n);
        let room = max_len.saturating_sub(ext_len + suffix.chars().count());
        let stem: String = base.chars().take(room).collect();
        candidate = parent.join(format!("{}{}{}", stem, suffix, extension));
        if is_available(&candidate, original_path, planned_paths) {
            planned_paths.insert(candidate.clone());
            return Ok(candidate);
        }
    }

    bail!(
        "no free name for {} after {} attempts",
        original_path.display(),
        MAX_COLLISION_SUFFIX
    )
}

fn is_available(candidate: &Path, original_path: &Path, planned_paths: &HashSet<PathBuf>) -> bool {
    if planned_paths.contains(candidate) {
        return false;
    }
    if candidate == original_path {
        return true;
    }
    !candidate.exists()
}
