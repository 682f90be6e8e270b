//! Response assembly.
//!
//! Builds the final response for each terminal state of the pipeline that
//! does not forward the downstream response as-is:
//!
//! - HEAD: 200, downstream headers without `Content-Length`, empty body
//! - GET: 200, downstream headers with the artifact's `Content-Length`,
//!   body streamed from the artifact
//! - bad request: 400 with a plain-text line naming the request path

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::stream;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use tokio::io::AsyncReadExt;
use tracing::error;

use crate::error::{RenderError, ThumbError};
use crate::thumb::{SourceImage, ThumbnailArtifact};

/// Bytes read from the artifact per body frame.
pub const CHUNK_SIZE: usize = 8192;

/// 400 for a recognized thumbnail path with bad parameters or signature.
pub fn bad_request(path: &str) -> Response {
    let body = format!("Bad thumbnail parameters in {}\n", path);
    let length = body.len();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

/// 200 with the downstream headers and no body. Nothing is rendered.
pub fn head_response(mut headers: HeaderMap) -> Response {
    headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::empty());
    *response.headers_mut() = headers;
    response
}

/// 200 streaming the rendered artifact.
///
/// The body owns the artifact and the source image; both temp files are
/// removed once the body is drained or dropped.
pub async fn rendered_response(
    mut headers: HeaderMap,
    artifact: ThumbnailArtifact,
    source: SourceImage,
) -> Result<Response, ThumbError> {
    let length = artifact.len()?;
    let file = tokio::fs::File::open(artifact.path())
        .await
        .map_err(RenderError::from)?;

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let reader = ArtifactReader {
        file,
        _artifact: artifact,
        _source: source,
    };
    let chunks = stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let read = reader.file.read(&mut buf).await?;
        if read == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), reader)))
    });

    let mut response = Response::new(Body::from_stream(chunks));
    *response.headers_mut() = headers;
    Ok(response)
}

/// Open artifact plus the temp files that must outlive the body.
struct ArtifactReader {
    file: tokio::fs::File,
    _artifact: ThumbnailArtifact,
    _source: SourceImage,
}

impl IntoResponse for ThumbError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            ThumbError::Fetch(_) => "source_error",
            ThumbError::Render(_) => "render_error",
        };
        error!(
            error_type = error_type,
            status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            "Server error: {}",
            self
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Internal Server Error\n",
        )
            .into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
