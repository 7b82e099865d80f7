//! Pure Rust codec built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | Crop-to-fit | `DynamicImage::resize_to_fill` (Lanczos3) |
//! | Resize | `DynamicImage::resize_exact` (Lanczos3) |
//! | Encode | `DynamicImage::save` (format from output extension) |

use super::backend::{CodecError, ImageCodec, ImageInfo, RenderParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Production codec. See the [module docs](self) for the crate mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, CodecError> {
    ImageReader::open(path)
        .map_err(CodecError::Io)?
        .with_guessed_format()
        .map_err(CodecError::Io)?
        .decode()
        .map_err(|e| CodecError::Decode(format!("failed to decode {}: {e}", path.display())))
}

/// JPEG has no alpha channel; flatten before encoding so saves never fail
/// on RGBA sources.
fn prepare_for_output(img: DynamicImage, output: &Path) -> DynamicImage {
    let jpeg = ImageFormat::from_path(output)
        .map(|f| f == ImageFormat::Jpeg)
        .unwrap_or(false);
    if jpeg && img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    }
}

fn save(img: DynamicImage, output: &Path) -> Result<(), CodecError> {
    prepare_for_output(img, output)
        .save(output)
        .map_err(|e| CodecError::Render(format!("failed to save {}: {e}", output.display())))
}

impl ImageCodec for RustCodec {
    fn identify(&self, path: &Path) -> Result<ImageInfo, CodecError> {
        let reader = ImageReader::open(path)
            .map_err(CodecError::Io)?
            .with_guessed_format()
            .map_err(CodecError::Io)?;
        let format = reader
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .map(str::to_string);
        let (width, height) = reader.into_dimensions().map_err(|e| {
            CodecError::Decode(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    fn crop_to_fit(&self, params: &RenderParams) -> Result<(), CodecError> {
        let img = load_image(&params.source)?;
        let fitted = img.resize_to_fill(params.width, params.height, FilterType::Lanczos3);
        save(fitted, &params.output)
    }

    fn resize(&self, params: &RenderParams) -> Result<(), CodecError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save(resized, &params.output)
    }
}
