//! # Thumb Streamer
//!
//! On-demand thumbnails for any HTTP image service.
//!
//! A request for `/path/to/image_{spec}.ext` is intercepted, the size,
//! gravity and retina multiplier are read from the URL, the original
//! `/path/to/image.ext` is fetched from the wrapped service, and the
//! thumbnail is returned with the original headers and a new body.
//!
//! ## Features
//!
//! - **Tower middleware**: wraps any `Service`, e.g. `ServeDir` or an axum `Router`
//! - **URL grammar**: `_WxH`, `_Wx`, `_xH`, gravity, `@Nx` and extensions
//! - **Signed URLs**: truncated SHA-1 (or SHA-256) signatures stop arbitrary renders
//! - **Streaming**: sources and thumbnails go through temporary files, never
//!   fully buffered in memory
//!
//! ## Architecture
//!
//! - [`route`] - URL grammar and gravity
//! - [`thumb`] - Dimension planning, source acquisition and rendering
//! - [`server`] - Tower layer, pipeline, signatures and router
//! - [`config`] - Options and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use thumb_streamer::{create_router, RouterConfig, ThumbOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = ThumbOptions::new()
//!         .with_urls(["/media"])
//!         .with_signing("my-secret", 16);
//!
//!     let router = create_router("public", &options, RouterConfig::new()).unwrap();
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod route;
pub mod server;
pub mod thumb;

// Re-export commonly used types
pub use config::{Cli, Command, ServeConfig, SignConfig, SignOutputFormat, ThumbOptions};
pub use error::{ConfigError, FetchError, GrammarError, RenderError, ThumbError};
pub use route::{Gravity, ParsedRequest, RoutePattern, RouteTable, UrlSelector};
pub use server::{
    create_router, AuthError, DigestAlgorithm, Outcome, RouterConfig, ThumbLayer, ThumbService,
    ThumbSigner, Thumbnailer,
};
pub use thumb::{
    DimensionSpec, ImageEngine, RenderEngine, RenderMode, RenderPlan, SourceImage, SourcePath,
    ThumbnailArtifact,
};
