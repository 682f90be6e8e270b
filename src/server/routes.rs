//! Router configuration for Thumb Streamer.
//!
//! This module wires the thumbnail middleware in front of a static file
//! server and applies CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check
//! /*                               - Files under the root directory
//! /*_WxH[-g][-sig][@Nx][.ext]      - Thumbnails of those files
//! ```
//!
//! # Example
//!
//! ```ignore
//! use thumb_streamer::config::ThumbOptions;
//! use thumb_streamer::server::routes::{create_router, RouterConfig};
//!
//! let options = ThumbOptions::new().with_urls(["/media"]);
//! let router = create_router("public", &options, RouterConfig::new())?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::Path;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::Method;
use serde::{Deserialize, Serialize};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::layer::ThumbLayer;
use crate::config::ThumbOptions;
use crate::error::ConfigError;

// =============================================================================
// Router Configuration
// =============================================================================

/// HTTP-level settings that sit around the thumbnail middleware.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// By default CORS allows any origin and tracing is enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// Files under `root` are served by `ServeDir`; the thumbnail middleware
/// sits between the router and `ServeDir` so thumbnail requests fetch their
/// source from it.
pub fn create_router(
    root: impl AsRef<Path>,
    options: &ThumbOptions,
    config: RouterConfig,
) -> Result<Router, ConfigError> {
    let thumbnails = ThumbLayer::new(options)?;
    Ok(build_router(root, thumbnails, &config))
}

/// Create the router around an already built layer.
pub fn build_router(root: impl AsRef<Path>, thumbnails: ThumbLayer, config: &RouterConfig) -> Router {
    let files = thumbnails.layer(ServeDir::new(root.as_ref()));

    let router = Router::new()
        .route("/health", get(health_handler))
        .fallback_service(files)
        .layer(build_cors_layer(config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, IF_NONE_MATCH, IF_MODIFIED_SINCE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Health
// =============================================================================

/// Response body of the health check.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
