//! Source image acquisition.
//!
//! The downstream service's response is classified once, when it arrives:
//!
//! - a non-success status or a non-`image/*` content type is handed back
//!   verbatim, so the downstream stays the single source of truth for
//!   "does this resource exist";
//! - otherwise the body is either a stable file on disk (the downstream
//!   inserted a [`SourcePath`] extension) or a byte stream that is drained
//!   into a temporary file.

use std::path::{Path, PathBuf};

use axum::body::Body;
use futures_util::StreamExt;
use http::{header, HeaderMap, Response};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::FetchError;

/// Response extension declaring that the body is the content of a file.
///
/// Downstream services that serve files from disk can insert this so the
/// thumbnailer reads the file in place instead of copying the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath(pub PathBuf);

/// Shape of a successful downstream body.
#[derive(Debug)]
pub enum SourceBody {
    /// Body backed by a file that stays in place for the whole request
    File(PathBuf),

    /// Body that must be drained
    Stream(Body),
}

/// A successful image response from the downstream service.
#[derive(Debug)]
pub struct SourceResponse {
    /// Downstream headers, returned on the thumbnail response
    pub headers: HeaderMap,

    pub body: SourceBody,
}

impl SourceResponse {
    /// Classify a downstream response.
    ///
    /// Returns the response unchanged as `Err` unless the status is 2xx and
    /// the content type is `image/*`.
    pub fn from_downstream(response: Response<Body>) -> Result<Self, Response<Body>> {
        if !response.status().is_success() || !is_image(response.headers()) {
            debug!(
                status = response.status().as_u16(),
                "Downstream response is not a usable image, forwarding"
            );
            return Err(response);
        }

        let (mut parts, body) = response.into_parts();
        let body = match parts.extensions.remove::<SourcePath>() {
            Some(SourcePath(path)) => SourceBody::File(path),
            None => SourceBody::Stream(body),
        };

        Ok(Self {
            headers: parts.headers,
            body,
        })
    }

    /// Get a random-access file for the source bytes.
    ///
    /// Streams are drained into a new temporary file in `temp_dir` (or the
    /// system temp directory), named with `suffix`.
    pub async fn materialize(
        self,
        temp_dir: Option<&Path>,
        suffix: &str,
    ) -> Result<(HeaderMap, SourceImage), FetchError> {
        let image = match self.body {
            SourceBody::File(path) => SourceImage::Borrowed(path),
            SourceBody::Stream(body) => {
                let file = new_temp_file(temp_dir, "thumb-src-", suffix)?;
                drain_into(body, &file).await?;
                SourceImage::Temporary(file)
            }
        };
        Ok((self.headers, image))
    }
}

/// Whether the primary content type is `image`.
pub fn is_image(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split('/').next())
        .is_some_and(|primary| primary.trim().eq_ignore_ascii_case("image"))
}

async fn drain_into(body: Body, file: &NamedTempFile) -> Result<(), FetchError> {
    let mut writer = tokio::fs::File::from_std(file.as_file().try_clone()?);
    let mut stream = body.into_data_stream();
    let mut written = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::Body(e.to_string()))?;
        writer.write_all(&chunk).await?;
        written += chunk.len();
    }
    writer.flush().await?;

    debug!(bytes = written, path = %file.path().display(), "Source body written to temp file");
    Ok(())
}

/// Create a named temporary file, deleted on drop.
pub(crate) fn new_temp_file(
    dir: Option<&Path>,
    prefix: &str,
    suffix: &str,
) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

// =============================================================================
// Source Image
// =============================================================================

/// File-backed source bytes, owned for the lifetime of one request.
#[derive(Debug)]
pub enum SourceImage {
    /// The downstream's own file, read in place
    Borrowed(PathBuf),

    /// A drained copy, deleted when dropped
    Temporary(NamedTempFile),
}

impl SourceImage {
    pub fn path(&self) -> &Path {
        match self {
            SourceImage::Borrowed(path) => path,
            SourceImage::Temporary(file) => file.path(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
