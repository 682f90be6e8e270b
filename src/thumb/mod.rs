//! Thumbnail production.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Request Pipeline             │
//! └────────────────────┬────────────────────┘
//!                      │
//!         ┌────────────┼─────────────┐
//!         ▼            ▼             ▼
//! ┌──────────────┐ ┌─────────┐ ┌──────────────┐
//! │ SourceFetch  │ │ Planner │ │ RenderEngine │
//! │ (downstream  │ │ (WxH,   │ │ (crop/scale  │
//! │  → file)     │ │  @Nx)   │ │  → file)     │
//! └──────────────┘ └─────────┘ └──────────────┘
//! ```
//!
//! # Components
//!
//! - [`DimensionSpec`] / [`RenderPlan`]: parse `WxH` tokens and clamp to the source size
//! - [`SourceResponse`] / [`SourceImage`]: classify the downstream response and get a file
//! - [`RenderEngine`] / [`ImageEngine`]: the pixel work
//! - [`ThumbnailArtifact`]: the rendered temp file

mod dimensions;
mod engine;
mod source;

pub use dimensions::{
    calculate_fill_dimensions, calculate_fit_dimensions, calculate_scale_dimensions,
    parse_multiplier, DimensionSpec, RenderMode, RenderPlan,
};
pub use engine::{ImageEngine, RenderEngine, ThumbnailArtifact, DEFAULT_JPEG_QUALITY};
pub use source::{is_image, SourceBody, SourceImage, SourcePath, SourceResponse};
