//! Dimension parsing and render planning.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::route::Gravity;

// =============================================================================
// Dimension Spec
// =============================================================================

/// Requested thumbnail size, as written in the URL.
///
/// At least one side is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl DimensionSpec {
    /// Parse a `WxH`, `Wx` or `xH` token.
    ///
    /// Returns `None` when a side is zero, has a leading zero, is not a
    /// number, or when both sides are absent.
    pub fn parse(token: &str) -> Option<Self> {
        let mut segments = token.splitn(2, 'x');
        let width = parse_side(segments.next().unwrap_or(""))?;
        let height = parse_side(segments.next().unwrap_or(""))?;

        if width.is_none() && height.is_none() {
            return None;
        }
        Some(Self { width, height })
    }
}

/// `Some(None)` is an absent side, `None` an invalid one.
fn parse_side(segment: &str) -> Option<Option<u32>> {
    if segment.is_empty() {
        return Some(None);
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) || segment.starts_with('0') {
        return None;
    }
    // All digits and no leading zero, so the only failure left is overflow.
    let value = segment.parse::<u32>().unwrap_or(u32::MAX);
    Some(Some(value))
}

/// Parse the digits of an `@Nx` retina group.
///
/// Absent, unparsable and zero multipliers all mean 1.
pub fn parse_multiplier(token: Option<&str>) -> u32 {
    let Some(digits) = token else {
        return 1;
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX).max(1)
}

// =============================================================================
// Render Plan
// =============================================================================

/// How the engine should produce the thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Fill the exact box, cropping at the gravity anchor.
    Crop,

    /// Preserve aspect ratio, shrinking only.
    Scale,
}

/// Concrete render instructions for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    /// Target width after the multiplier and native clamp
    pub width: Option<u32>,

    /// Target height after the multiplier and native clamp
    pub height: Option<u32>,

    /// Crop anchor
    pub gravity: Gravity,

    /// Retina multiplier, at least 1
    pub multiplier: u32,

    /// Crop-to-fill or scale
    pub mode: RenderMode,
}

impl RenderPlan {
    /// Apply the multiplier and clamp each present side to the native size.
    ///
    /// Crop mode is used only when both sides are present and `crop` is set.
    pub fn new(
        spec: DimensionSpec,
        gravity: Gravity,
        multiplier: u32,
        native: (u32, u32),
        crop: bool,
    ) -> Self {
        let multiplier = multiplier.max(1);
        let (native_width, native_height) = native;

        let width = spec
            .width
            .map(|w| w.saturating_mul(multiplier).min(native_width));
        let height = spec
            .height
            .map(|h| h.saturating_mul(multiplier).min(native_height));

        let mode = if crop && width.is_some() && height.is_some() {
            RenderMode::Crop
        } else {
            RenderMode::Scale
        };

        Self {
            width,
            height,
            gravity,
            multiplier,
            mode,
        }
    }

    /// Final pixel size of the thumbnail for a source of `native` size.
    pub fn output_dimensions(&self, native: (u32, u32)) -> (u32, u32) {
        match (self.mode, self.width, self.height) {
            (RenderMode::Crop, Some(w), Some(h)) => (w.max(1), h.max(1)),
            (_, width, height) => calculate_scale_dimensions(native, width, height),
        }
    }
}

/// Aspect-preserving size that fits the given bounds without enlarging.
///
/// A missing bound is unconstrained.
pub fn calculate_scale_dimensions(
    native: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (w, h) = fit_dimensions(native, width, height, 1.0);
    (w.min(native.0.max(1)), h.min(native.1.max(1)))
}

/// Aspect-preserving size that fits the given bounds, enlarging if needed.
pub fn calculate_fit_dimensions(
    native: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    fit_dimensions(native, width, height, f64::INFINITY)
}

fn fit_dimensions(
    native: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    max_ratio: f64,
) -> (u32, u32) {
    let (src_w, src_h) = (native.0.max(1) as f64, native.1.max(1) as f64);

    let width_ratio = width.map(|w| w as f64 / src_w).unwrap_or(f64::INFINITY);
    let height_ratio = height.map(|h| h as f64 / src_h).unwrap_or(f64::INFINITY);
    let ratio = width_ratio.min(height_ratio).min(max_ratio);
    if !ratio.is_finite() {
        return (native.0.max(1), native.1.max(1));
    }

    let w = ((src_w * ratio).round() as u32).max(1);
    let h = ((src_h * ratio).round() as u32).max(1);
    (w, h)
}

/// Size that completely covers `target` while keeping the source aspect
/// ratio. One side matches the target exactly.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w / src_h;
    let tgt_aspect = tgt_w as f64 / tgt_h.max(1) as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height matches, width overflows
        let w = ((tgt_h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, tgt_h)
    } else {
        // Source is taller: width matches, height overflows
        let h = ((tgt_w as f64 / src_aspect).round() as u32).max(tgt_h);
        (tgt_w, h)
    }
}

// =============================================================================
// Tests
// =============================================================================
