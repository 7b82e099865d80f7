//! Derivative generation: turn one source image into its size family.
//!
//! The pipeline per source image:
//! 1. identify the file (missing or undecodable source fails the run),
//! 2. persist the natural dimensions on the record,
//! 3. render the aspect-corrected `orig_c` crop (failure aborts the run,
//!    every cropped size depends on it),
//! 4. render each planned target, skipping individual failures,
//! 5. render the thumbnail and stamp the record's thumbnail fields.
//!
//! Each rendered file is registered as a [`Derivative`] keyed on
//! (tenant, source, size label), so re-running is idempotent.

use crate::config::MediaConfig;
use crate::geometry::{self, RenderSource};
use crate::imaging::{ImageCodec, RenderParams};
use crate::model::{size_label, Derivative, Locator, SourceMedia};
use crate::storage::local_fs_path;
use crate::store::Catalog;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extensions kept as-is on derivative files. Anything else falls back to
/// the codec-detected format.
const KNOWN_EXTENSIONS: [&str; 6] = ["png", "jpg", "gif", "bmp", "jpeg", "tiff"];

/// What a generation run produced. Not an error type: a failed run is a
/// normal outcome the caller records and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub success: bool,
    pub message: String,
    pub thumbnail_url: Option<String>,
}

impl GenerateOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            thumbnail_url: None,
        }
    }
}

/// Strip quote, paren and dollar characters and turn whitespace into
/// hyphens, so every derivative file name is shell- and URL-safe.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '(' | ')' | '$'))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

fn split_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    }
}

/// Pick the extension for derivative files: keep a recognized extension
/// from the name, otherwise trust the codec's detected format.
fn output_extension(file_name: &str, detected: Option<&str>) -> String {
    let (_, ext) = split_name(file_name);
    match ext {
        Some(e) if KNOWN_EXTENSIONS.contains(&e.to_lowercase().as_str()) => e.to_lowercase(),
        _ => detected.unwrap_or("jpg").to_string(),
    }
}

/// Renders and registers the derivative family for source images.
pub struct DerivativeGenerator<'a, C: ImageCodec> {
    codec: &'a C,
    config: &'a MediaConfig,
    media_root: &'a Path,
}

impl<'a, C: ImageCodec> DerivativeGenerator<'a, C> {
    pub fn new(codec: &'a C, config: &'a MediaConfig, media_root: &'a Path) -> Self {
        Self {
            codec,
            config,
            media_root,
        }
    }

    fn output_paths(&self, file_name: &str) -> (PathBuf, String) {
        let fs = self
            .media_root
            .join(&self.config.resize_directory)
            .join(file_name);
        let url = format!("/{}/{}", self.config.resize_directory, file_name);
        (fs, url)
    }

    fn register(
        &self,
        catalog: &mut Catalog,
        source: &SourceMedia,
        file_name: String,
        size: String,
        url_path: String,
        width: u32,
        height: u32,
    ) {
        let mut derivative = Derivative::new(
            source.tenant_id,
            source.id,
            file_name,
            size,
            Locator::Local { path: url_path },
        );
        derivative.set_dimensions(width, height);
        derivative.remote_is_public = source.remote_is_public;
        catalog.upsert_derivative(derivative);
    }

    /// Run the pipeline for one source. Mutates `source` in place (natural
    /// dimensions, thumbnail fields); the caller persists the record.
    pub fn generate(&self, catalog: &mut Catalog, source: &mut SourceMedia) -> GenerateOutcome {
        let Some(file_name) = source.file_name.clone() else {
            return GenerateOutcome::failure("no file name on record");
        };
        let Some(source_path) = source
            .locator
            .as_ref()
            .and_then(|l| match l {
                Locator::Local { path } => Some(local_fs_path(self.media_root, path)),
                _ => None,
            })
        else {
            return GenerateOutcome::failure("source bytes are not available locally");
        };

        let info = match self.codec.identify(&source_path) {
            Ok(info) => info,
            Err(e) => {
                return GenerateOutcome::failure(format!(
                    "could not read {}: {e}",
                    source_path.display()
                ));
            }
        };
        // Natural dimensions are recorded even when nothing gets rendered.
        source.width = info.width;
        source.height = info.height;

        if !self.config.resize {
            self.register(
                catalog,
                source,
                file_name.clone(),
                size_label::ORIG.to_string(),
                source
                    .locator
                    .as_ref()
                    .and_then(Locator::url)
                    .unwrap_or_default()
                    .to_string(),
                info.width,
                info.height,
            );
            return GenerateOutcome {
                success: true,
                message: "resizing disabled; registered the original as its only size"
                    .to_string(),
                thumbnail_url: None,
            };
        }

        let stem = sanitize_file_name(split_name(&file_name).0);
        let ext = output_extension(&file_name, info.format.as_deref());

        let plan = geometry::plan_derivatives(
            info.width,
            info.height,
            self.config.horizontal_aspect.as_tuple(),
            self.config.vertical_aspect.as_tuple(),
            &self.config.plan_widths(),
        );

        // The orig_c crop feeds every cropped size, so its failure is fatal.
        let crop_name = format!("{stem}_{}.{ext}", size_label::ORIG_CROPPED);
        let (crop_fs, crop_url) = self.output_paths(&crop_name);
        if let Err(e) = self.codec.crop_to_fit(&RenderParams {
            source: source_path.clone(),
            output: crop_fs.clone(),
            width: plan.crop_width,
            height: plan.crop_height,
        }) {
            return GenerateOutcome::failure(format!("aspect crop failed: {e}"));
        }
        self.register(
            catalog,
            source,
            crop_name,
            size_label::ORIG_CROPPED.to_string(),
            crop_url,
            plan.crop_width,
            plan.crop_height,
        );

        for target in &plan.targets {
            let render_from = match target.source {
                RenderSource::Cropped => crop_fs.clone(),
                RenderSource::Original => source_path.clone(),
            };
            let out_name = format!("{stem}_{}.{ext}", target.label);
            let (out_fs, out_url) = self.output_paths(&out_name);
            if let Err(e) = self.codec.resize(&RenderParams {
                source: render_from,
                output: out_fs,
                width: target.width,
                height: target.height,
            }) {
                warn!(size = %target.label, error = %e, "derivative render failed, skipping");
                continue;
            }
            self.register(
                catalog,
                source,
                out_name,
                target.label.clone(),
                out_url,
                target.width,
                target.height,
            );
        }

        let thumb = &plan.thumbnail;
        let thumb_name = format!("{stem}_{}.{ext}", thumb.label);
        let (thumb_fs, thumb_url) = self.output_paths(&thumb_name);
        let mut thumbnail_url = None;
        match self.codec.resize(&RenderParams {
            source: source_path,
            output: thumb_fs,
            width: thumb.width,
            height: thumb.height,
        }) {
            Ok(()) => {
                self.register(
                    catalog,
                    source,
                    thumb_name,
                    thumb.label.clone(),
                    thumb_url.clone(),
                    thumb.width,
                    thumb.height,
                );
                source.thumbnail_locator = Some(Locator::Local {
                    path: thumb_url.clone(),
                });
                source.thumbnail_width = thumb.width;
                source.thumbnail_height = thumb.height;
                thumbnail_url = Some(thumb_url);
            }
            Err(e) => {
                warn!(error = %e, "thumbnail render failed, skipping");
            }
        }

        GenerateOutcome {
            success: true,
            message: format!(
                "generated {} derivative sizes",
                catalog
                    .derivatives_for_source(source.tenant_id, source.id)
                    .len()
            ),
            thumbnail_url,
        }
    }
}
