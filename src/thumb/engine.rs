//! Image-processing engine boundary.
//!
//! The [`RenderEngine`] trait is the only place pixels are touched. The
//! pipeline asks it for the native size of a source, then for a crop or a
//! scale into an output path. Engines are synchronous; the pipeline runs them
//! on the blocking thread pool.
//!
//! The production implementation, [`ImageEngine`], is pure Rust on top of the
//! `image` crate:
//!
//! | Operation | Implementation |
//! |-----------|----------------|
//! | Native size | `ImageReader::into_dimensions` (header only) |
//! | Crop | fill-resize with `Lanczos3`, then `crop_imm` at the gravity anchor |
//! | Scale | aspect-preserving `resize_exact` to the computed box |
//! | GIF output | first frame only; animated sources are flattened |
//!
//! Output is written in the source's own encoding so the downstream
//! `Content-Type` stays correct. Re-encoding drops embedded metadata; with
//! `preserve_metadata` the ICC profile is carried over where the encoder
//! supports it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::RenderError;
use crate::route::Gravity;

use super::dimensions::{
    calculate_fill_dimensions, calculate_fit_dimensions, calculate_scale_dimensions, RenderMode,
    RenderPlan,
};
use super::source::new_temp_file;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

// =============================================================================
// Engine Trait
// =============================================================================

/// An image-processing engine.
///
/// Implementations fail loudly on unreadable or corrupt input; the pipeline
/// never retries and never turns an engine error into a 400.
pub trait RenderEngine: Send + Sync {
    /// Width and height of the source image.
    fn native_dimensions(&self, source: &Path) -> Result<(u32, u32), RenderError>;

    /// Fill `width`x`height` exactly, cropping the overflow at `gravity`.
    fn render_crop(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        gravity: Gravity,
        output: &Path,
    ) -> Result<(), RenderError>;

    /// Resize preserving aspect ratio to fit the present bounds.
    fn render_scale(
        &self,
        source: &Path,
        width: Option<u32>,
        height: Option<u32>,
        gravity: Gravity,
        shrink_only: bool,
        output: &Path,
    ) -> Result<(), RenderError>;

    /// Dispatch a plan to the crop or scale operation.
    fn render(&self, plan: &RenderPlan, source: &Path, output: &Path) -> Result<(), RenderError> {
        match (plan.mode, plan.width, plan.height) {
            (RenderMode::Crop, Some(width), Some(height)) => {
                self.render_crop(source, width, height, plan.gravity, output)
            }
            _ => self.render_scale(source, plan.width, plan.height, plan.gravity, true, output),
        }
    }
}

// =============================================================================
// image-crate Engine
// =============================================================================

/// Pure-Rust engine backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageEngine {
    jpeg_quality: u8,
    preserve_metadata: bool,
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEngine {
    /// Engine with default quality that strips metadata.
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            preserve_metadata: false,
        }
    }

    /// Set the JPEG output quality (clamped to 1-100).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Keep the source ICC profile in the output.
    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    fn load(&self, path: &Path) -> Result<Loaded, RenderError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| RenderError::UnsupportedFormat(path.display().to_string()))?;

        let mut decoder = reader.into_decoder().map_err(decode_error)?;
        let icc_profile = if self.preserve_metadata {
            decoder.icc_profile().ok().flatten()
        } else {
            None
        };
        let image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;

        Ok(Loaded {
            image,
            format,
            icc_profile,
        })
    }

    fn save(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        icc_profile: Option<Vec<u8>>,
        output: &Path,
    ) -> Result<(), RenderError> {
        let mut writer = BufWriter::new(File::create(output)?);

        match format {
            ImageFormat::Jpeg => {
                let image = jpeg_compatible(image);
                let mut encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                attach_icc_profile(&mut encoder, icc_profile);
                image.write_with_encoder(encoder).map_err(encode_error)?;
            }
            ImageFormat::Png => {
                let mut encoder = PngEncoder::new(&mut writer);
                attach_icc_profile(&mut encoder, icc_profile);
                image.write_with_encoder(encoder).map_err(encode_error)?;
            }
            ImageFormat::Gif => {
                debug!("Re-encoding GIF as a single frame");
                image
                    .write_to(&mut writer, ImageFormat::Gif)
                    .map_err(encode_error)?;
            }
            other => return Err(RenderError::UnsupportedFormat(format!("{:?}", other))),
        }

        writer.flush()?;
        Ok(())
    }
}

/// A decoded source plus what is needed to write it back.
struct Loaded {
    image: DynamicImage,
    format: ImageFormat,
    icc_profile: Option<Vec<u8>>,
}

impl RenderEngine for ImageEngine {
    fn native_dimensions(&self, source: &Path) -> Result<(u32, u32), RenderError> {
        ImageReader::open(source)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(decode_error)
    }

    fn render_crop(
        &self,
        source: &Path,
        width: u32,
        height: u32,
        gravity: Gravity,
        output: &Path,
    ) -> Result<(), RenderError> {
        let Loaded {
            image: img,
            format,
            icc_profile,
        } = self.load(source)?;
        let (width, height) = (width.max(1), height.max(1));

        let (fill_w, fill_h) = calculate_fill_dimensions((img.width(), img.height()), (width, height));
        let filled = if (fill_w, fill_h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(fill_w, fill_h, FilterType::Lanczos3)
        };

        let (x, y) = gravity.crop_offset(fill_w - width, fill_h - height);
        let cropped = filled.crop_imm(x, y, width, height);

        debug!(width, height, %gravity, x, y, "Crop-resized thumbnail");
        self.save(&cropped, format, icc_profile, output)
    }

    fn render_scale(
        &self,
        source: &Path,
        width: Option<u32>,
        height: Option<u32>,
        _gravity: Gravity,
        shrink_only: bool,
        output: &Path,
    ) -> Result<(), RenderError> {
        let Loaded {
            image: img,
            format,
            icc_profile,
        } = self.load(source)?;
        let native = (img.width(), img.height());

        let (w, h) = if shrink_only {
            calculate_scale_dimensions(native, width, height)
        } else {
            calculate_fit_dimensions(native, width, height)
        };

        let scaled = if (w, h) == native {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        };

        debug!(width = w, height = h, "Scaled thumbnail");
        self.save(&scaled, format, icc_profile, output)
    }
}

/// JPEG encodes only 8-bit gray and RGB.
fn jpeg_compatible(image: &DynamicImage) -> std::borrow::Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => std::borrow::Cow::Borrowed(image),
        _ => std::borrow::Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

fn attach_icc_profile(encoder: &mut impl ImageEncoder, profile: Option<Vec<u8>>) {
    if let Some(profile) = profile {
        if encoder.set_icc_profile(profile).is_err() {
            debug!("Encoder does not support ICC profiles, dropping");
        }
    }
}

fn decode_error(err: image::ImageError) -> RenderError {
    RenderError::Decode {
        message: err.to_string(),
    }
}

fn encode_error(err: image::ImageError) -> RenderError {
    RenderError::Encode {
        message: err.to_string(),
    }
}

// =============================================================================
// Thumbnail Artifact
// =============================================================================

/// The rendered thumbnail file, deleted when dropped.
#[derive(Debug)]
pub struct ThumbnailArtifact {
    file: NamedTempFile,
}

impl ThumbnailArtifact {
    /// Reserve an output file in `dir` (or the system temp directory).
    pub fn create(dir: Option<&Path>, suffix: &str) -> Result<Self, RenderError> {
        Ok(Self {
            file: new_temp_file(dir, "thumb-", suffix)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the rendered file in bytes.
    pub fn len(&self) -> Result<u64, RenderError> {
        Ok(std::fs::metadata(self.file.path())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RenderError> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
