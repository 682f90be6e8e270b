//! The per-request thumbnail state machine.
//!
//! ```text
//! request ─► method gate ─► route match ─► signature gate ─► source fetch
//!               │               │               │                │
//!          pass-through    pass-through        400          forward as-is
//!                                                                │
//!                         dimension gate ─► HEAD? ─► render ─► 200
//!                               │             │         │
//!                              400           200       500
//! ```
//!
//! [`Thumbnailer`] holds only immutable configuration and is shared by every
//! request through an `Arc`. Everything that changes during a request lives
//! in locals of [`Thumbnailer::handle`].

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::response::{IntoResponse, Response};
use axum::BoxError;
use bytes::Bytes;
use http::uri::PathAndQuery;
use http::{header, Method, Request, Uri};
use tower::Service;
use tracing::debug;

use crate::config::ThumbOptions;
use crate::error::{ConfigError, RenderError, ThumbError};
use crate::route::{ParsedRequest, RouteTable};
use crate::thumb::{
    parse_multiplier, DimensionSpec, ImageEngine, RenderEngine, RenderPlan, SourceResponse,
    ThumbnailArtifact,
};

use super::auth::ThumbSigner;
use super::response::{bad_request, head_response, rendered_response};

/// Result of the gates that only need the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a thumbnail request; the downstream handles it unchanged
    PassThrough,

    /// A thumbnail path that failed signature verification
    BadRequest,

    /// A thumbnail path ready for the source fetch
    Matched(ParsedRequest),
}

/// Shared, immutable thumbnail middleware state.
pub struct Thumbnailer {
    routes: RouteTable,
    signer: Option<ThumbSigner>,
    crop: bool,
    temp_dir: Option<PathBuf>,
    engine: Arc<dyn RenderEngine>,
}

impl std::fmt::Debug for Thumbnailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnailer")
            .field("routes", &self.routes)
            .field("signer", &self.signer)
            .field("crop", &self.crop)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Thumbnailer {
    /// Build with the default `image`-crate engine.
    pub fn new(options: &ThumbOptions) -> Result<Self, ConfigError> {
        let engine = ImageEngine::new()
            .with_jpeg_quality(options.jpeg_quality)
            .with_preserve_metadata(options.preserve_metadata);
        Self::with_engine(options, Arc::new(engine))
    }

    /// Build with a custom render engine.
    pub fn with_engine(
        options: &ThumbOptions,
        engine: Arc<dyn RenderEngine>,
    ) -> Result<Self, ConfigError> {
        options.validate()?;

        let signer = match (&options.secret, options.keylength) {
            (Some(secret), Some(keylength)) => {
                Some(ThumbSigner::new(secret, keylength, options.digest))
            }
            _ => None,
        };
        let routes = RouteTable::compile(
            &options.urls,
            options.prefix.as_deref(),
            signer.as_ref().map(ThumbSigner::keylength),
        )?;

        Ok(Self {
            routes,
            signer,
            crop: options.crop,
            temp_dir: options.temp_dir.clone(),
            engine,
        })
    }

    /// Run the method, route and signature gates.
    pub fn classify(&self, method: &Method, path: &str) -> Outcome {
        if *method != Method::GET && *method != Method::HEAD {
            return Outcome::PassThrough;
        }

        let Some(parsed) = self.routes.match_path(path) else {
            return Outcome::PassThrough;
        };

        if let Some(signer) = &self.signer {
            if signer.verify(&parsed).is_err() {
                return Outcome::BadRequest;
            }
        }

        Outcome::Matched(parsed)
    }

    /// Drive one request through the pipeline.
    ///
    /// `inner` must be ready; it is called exactly once, either with the
    /// original request or with the rewritten source request.
    pub async fn handle<S, B>(
        &self,
        mut inner: S,
        request: Request<Body>,
    ) -> Result<Response, S::Error>
    where
        S: Service<Request<Body>, Response = http::Response<B>>,
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let path = request.uri().path().to_string();

        let parsed = match self.classify(request.method(), &path) {
            Outcome::PassThrough => {
                return inner.call(request).await.map(|r| r.map(Body::new));
            }
            Outcome::BadRequest => return Ok(bad_request(&path)),
            Outcome::Matched(parsed) => parsed,
        };

        let is_head = *request.method() == Method::HEAD;
        let Some(source_request) = source_request(request, &parsed) else {
            return Ok(bad_request(&path));
        };
        debug!(path = %path, source = %source_request.uri(), "Fetching thumbnail source");

        let response = inner.call(source_request).await?.map(Body::new);
        let source = match SourceResponse::from_downstream(response) {
            Ok(source) => source,
            Err(forwarded) => return Ok(forwarded),
        };

        let Some(spec) = DimensionSpec::parse(&parsed.dimensions) else {
            debug!(path = %path, dimensions = %parsed.dimensions, "Invalid thumbnail dimensions");
            return Ok(bad_request(&path));
        };

        if is_head {
            return Ok(head_response(source.headers));
        }

        match self.render(source, &parsed, spec).await {
            Ok(response) => Ok(response),
            Err(err) => Ok(err.into_response()),
        }
    }

    async fn render(
        &self,
        source: SourceResponse,
        parsed: &ParsedRequest,
        spec: DimensionSpec,
    ) -> Result<Response, ThumbError> {
        let suffix = parsed.extension_token().to_ascii_lowercase();
        let (headers, image) = source.materialize(self.temp_dir.as_deref(), &suffix).await?;

        let engine = Arc::clone(&self.engine);
        let gravity = parsed.gravity();
        let multiplier = parse_multiplier(parsed.retina.as_deref());
        let crop = self.crop;
        let temp_dir = self.temp_dir.clone();

        let (artifact, image) = tokio::task::spawn_blocking(move || {
            let native = engine.native_dimensions(image.path())?;
            let plan = RenderPlan::new(spec, gravity, multiplier, native, crop);
            debug!(?native, ?plan, "Rendering thumbnail");

            let artifact = ThumbnailArtifact::create(temp_dir.as_deref(), &suffix)?;
            engine.render(&plan, image.path(), artifact.path())?;
            Ok::<_, RenderError>((artifact, image))
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        rendered_response(headers, artifact, image).await
    }
}

/// Rewrite the request to fetch the unsuffixed source.
///
/// The mount prefix is dropped and the query string kept. Range headers are
/// removed so the downstream returns the whole image.
fn source_request(request: Request<Body>, parsed: &ParsedRequest) -> Option<Request<Body>> {
    let (mut parts, body) = request.into_parts();

    let source = parsed.source_path();
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", source, query),
        None => source,
    };

    let mut uri_parts = parts.uri.into_parts();
    uri_parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    parts.uri = Uri::from_parts(uri_parts).ok()?;

    parts.headers.remove(header::RANGE);
    parts.headers.remove(header::IF_RANGE);

    Some(Request::from_parts(parts, body))
}

// =============================================================================
// Tests
// =============================================================================
