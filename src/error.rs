use thiserror::Error;

/// Errors raised while compiling the URL grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// A selector or prefix produced an invalid regular expression
    #[error("Invalid route pattern: {0}")]
    InvalidPattern(String),
}

/// Errors raised while acquiring the source image from the downstream service
#[derive(Debug, Error)]
pub enum FetchError {
    /// The downstream body failed while being drained
    #[error("Failed to read source body: {0}")]
    Body(String),

    /// Temporary file could not be created or written
    #[error("Temporary file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the image-processing engine.
///
/// These indicate an environment problem (unreadable source, corrupt image
/// despite an `image/*` content type) and are never downgraded to a 400.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The source could not be decoded
    #[error("Failed to decode source image: {message}")]
    Decode { message: String },

    /// The thumbnail could not be encoded
    #[error("Failed to encode thumbnail: {message}")]
    Encode { message: String },

    /// The source uses an encoding the engine cannot write back
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Filesystem error while reading the source or writing the output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking render task panicked or was cancelled
    #[error("Render task failed: {0}")]
    Task(String),
}

/// Fatal failures of the thumbnail pipeline.
///
/// Everything resolvable locally (grammar, signature, dimensions) becomes a
/// 400 response instead and never reaches this type.
#[derive(Debug, Error)]
pub enum ThumbError {
    /// Source acquisition failed after the downstream reported success
    #[error("Source error: {0}")]
    Fetch(#[from] FetchError),

    /// The render engine failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Signed mode needs both a secret and a key length
    #[error("Signed URLs need both a secret and a key length")]
    IncompleteSigning,

    /// The secret is empty
    #[error("Signing secret must not be empty")]
    EmptySecret,

    /// Key length is zero or exceeds the digest's hex length
    #[error("Key length must be between 1 and {max}, got {actual}")]
    InvalidKeyLength { actual: usize, max: usize },

    /// JPEG quality is outside 1-100
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// No URL selectors were configured
    #[error("At least one URL selector is required")]
    NoUrls,

    /// A selector or prefix did not compile
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}
