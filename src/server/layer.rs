//! Tower middleware wrapping a downstream image service.
//!
//! # Example
//!
//! ```ignore
//! use thumb_streamer::config::ThumbOptions;
//! use thumb_streamer::server::ThumbLayer;
//! use tower_http::services::ServeDir;
//!
//! let layer = ThumbLayer::new(&ThumbOptions::new().with_urls(["/media"]))?;
//! let app = axum::Router::new().fallback_service(layer.layer(ServeDir::new("public")));
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, HttpBody};
use axum::response::Response;
use axum::BoxError;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::Request;
use tower::{Layer, Service};

use crate::config::ThumbOptions;
use crate::error::ConfigError;

use super::pipeline::Thumbnailer;

/// Layer applying [`ThumbService`] to a downstream service.
#[derive(Debug, Clone)]
pub struct ThumbLayer {
    thumbnailer: Arc<Thumbnailer>,
}

impl ThumbLayer {
    /// Validate `options` and compile the URL grammar.
    pub fn new(options: &ThumbOptions) -> Result<Self, ConfigError> {
        Ok(Self::from_thumbnailer(Thumbnailer::new(options)?))
    }

    /// Use an already built thumbnailer, e.g. one with a custom engine.
    pub fn from_thumbnailer(thumbnailer: Thumbnailer) -> Self {
        Self {
            thumbnailer: Arc::new(thumbnailer),
        }
    }
}

impl<S> Layer<S> for ThumbLayer {
    type Service = ThumbService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ThumbService {
            inner,
            thumbnailer: Arc::clone(&self.thumbnailer),
        }
    }
}

/// Serves thumbnails for matching paths and forwards everything else.
#[derive(Debug, Clone)]
pub struct ThumbService<S> {
    inner: S,
    thumbnailer: Arc<Thumbnailer>,
}

impl<S, B> Service<Request<Body>> for ThumbService<S>
where
    S: Service<Request<Body>, Response = http::Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Keep the instance that was driven to readiness
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let thumbnailer = Arc::clone(&self.thumbnailer);

        Box::pin(async move { thumbnailer.handle(inner, request).await })
    }
}
