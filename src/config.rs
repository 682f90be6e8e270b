//! Configuration management for Thumb Streamer.
//!
//! Two layers live here:
//!
//! - [`ThumbOptions`]: the construction-time, immutable configuration of the
//!   thumbnail middleware, with a builder API for library users.
//! - [`Cli`]: command-line arguments for the binary (clap), with environment
//!   variables under the `THUMB_` prefix.
//!
//! # Environment Variables
//!
//! - `THUMB_HOST` - Server bind address (default: 0.0.0.0)
//! - `THUMB_PORT` - Server port (default: 3000)
//! - `THUMB_ROOT` - Directory serving the original images (default: .)
//! - `THUMB_URLS` - Comma-separated URL prefixes to thumbnail (default: /)
//! - `THUMB_PREFIX` - Mount prefix stripped before fetching the source
//! - `THUMB_SECRET` - Secret for signed thumbnail URLs
//! - `THUMB_KEYLENGTH` - Hex characters of signature to require
//! - `THUMB_DIGEST` - Signature digest, `sha1` or `sha256` (default: sha1)
//! - `THUMB_CROP` - Crop to fill when both sides are given (default: true)
//! - `THUMB_PRESERVE_METADATA` - Keep the ICC profile (default: false)
//! - `THUMB_JPEG_QUALITY` - JPEG output quality (default: 85)
//! - `THUMB_TEMP_DIR` - Directory for temporary files

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::{ConfigError, GrammarError};
use crate::route::UrlSelector;
use crate::server::auth::DigestAlgorithm;
use crate::thumb::DEFAULT_JPEG_QUALITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Middleware Options
// =============================================================================

/// Immutable configuration of the thumbnail middleware.
#[derive(Debug, Clone)]
pub struct ThumbOptions {
    /// URL selectors to intercept, tried in order
    pub urls: Vec<UrlSelector>,

    /// Mount prefix in front of every selector
    pub prefix: Option<String>,

    /// Shared secret for signed URLs
    pub secret: Option<String>,

    /// Hex characters of signature required in signed mode
    pub keylength: Option<usize>,

    /// Signature digest
    pub digest: DigestAlgorithm,

    /// Crop to fill when both width and height are given
    pub crop: bool,

    /// Keep the source ICC profile instead of stripping all metadata
    pub preserve_metadata: bool,

    /// JPEG output quality (1-100)
    pub jpeg_quality: u8,

    /// Directory for temporary source and thumbnail files
    pub temp_dir: Option<PathBuf>,
}

impl Default for ThumbOptions {
    fn default() -> Self {
        Self {
            urls: vec![UrlSelector::default()],
            prefix: None,
            secret: None,
            keylength: None,
            digest: DigestAlgorithm::default(),
            crop: true,
            preserve_metadata: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            temp_dir: None,
        }
    }
}

impl ThumbOptions {
    /// Options with every default: all paths, unsigned, crop on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the URL selectors.
    pub fn with_urls<I, U>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UrlSelector>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the mount prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable signed mode.
    pub fn with_signing(mut self, secret: impl Into<String>, keylength: usize) -> Self {
        self.secret = Some(secret.into());
        self.keylength = Some(keylength);
        self
    }

    /// Set the signature digest.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Enable or disable crop-to-fill.
    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    /// Enable or disable ICC profile preservation.
    pub fn with_preserve_metadata(mut self, preserve: bool) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    /// Set the JPEG output quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Put temporary files in `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Whether signed mode is configured.
    pub fn signing_enabled(&self) -> bool {
        self.secret.is_some() && self.keylength.is_some()
    }

    /// Check the options for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.is_empty() {
            return Err(ConfigError::NoUrls);
        }

        match (&self.secret, self.keylength) {
            (None, None) => {}
            (Some(secret), Some(keylength)) => {
                if secret.is_empty() {
                    return Err(ConfigError::EmptySecret);
                }
                let max = self.digest.hex_len();
                if keylength == 0 || keylength > max {
                    return Err(ConfigError::InvalidKeyLength {
                        actual: keylength,
                        max,
                    });
                }
            }
            _ => return Err(ConfigError::IncompleteSigning),
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }

        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Thumb Streamer - on-demand thumbnails in front of any image server.
#[derive(Parser, Debug, Clone)]
#[command(name = "thumb-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve a directory of images with thumbnail URLs.
    Serve(ServeConfig),

    /// Print the signed form of a thumbnail path.
    Sign(SignConfig),
}

/// Arguments of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "THUMB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "THUMB_PORT")]
    pub port: u16,

    /// Directory containing the original images.
    #[arg(long, default_value = ".", env = "THUMB_ROOT")]
    pub root: PathBuf,

    // =========================================================================
    // URL Grammar
    // =========================================================================
    /// URL prefixes to intercept (comma-separated). `/` matches everything.
    #[arg(long, default_value = "/", env = "THUMB_URLS", value_delimiter = ',')]
    pub urls: Vec<String>,

    /// Regular expressions used as additional URL selectors.
    #[arg(long = "url-pattern")]
    pub url_patterns: Vec<String>,

    /// Mount prefix in front of every thumbnail URL.
    #[arg(long, env = "THUMB_PREFIX")]
    pub prefix: Option<String>,

    // =========================================================================
    // Signed URLs
    // =========================================================================
    /// Secret for signed thumbnail URLs. Requires --keylength.
    #[arg(long, env = "THUMB_SECRET")]
    pub secret: Option<String>,

    /// Number of hex characters of the signature. Requires --secret.
    #[arg(long, env = "THUMB_KEYLENGTH")]
    pub keylength: Option<usize>,

    /// Digest used for signatures.
    #[arg(long, value_enum, default_value_t = DigestAlgorithm::Sha1, env = "THUMB_DIGEST")]
    pub digest: DigestAlgorithm,

    // =========================================================================
    // Rendering
    // =========================================================================
    /// Crop to fill when both width and height are given.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "THUMB_CROP")]
    pub crop: bool,

    /// Keep the ICC profile of the source image.
    #[arg(long, default_value_t = false, env = "THUMB_PRESERVE_METADATA")]
    pub preserve_metadata: bool,

    /// JPEG output quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "THUMB_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Directory for temporary files (defaults to the system temp directory).
    #[arg(long, env = "THUMB_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "THUMB_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.root.is_dir() {
            return Err(format!(
                "Root directory {} does not exist. Set --root or THUMB_ROOT",
                self.root.display()
            ));
        }

        self.thumb_options()?
            .validate()
            .map_err(|e| e.to_string())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the middleware options. Literal URLs come before patterns.
    pub fn thumb_options(&self) -> Result<ThumbOptions, String> {
        let mut urls: Vec<UrlSelector> = self
            .urls
            .iter()
            .map(|u| UrlSelector::literal(u.trim()))
            .collect();
        for pattern in &self.url_patterns {
            urls.push(UrlSelector::pattern(pattern).map_err(|e: GrammarError| e.to_string())?);
        }

        Ok(ThumbOptions {
            urls,
            prefix: self.prefix.clone(),
            secret: self.secret.clone(),
            keylength: self.keylength,
            digest: self.digest,
            crop: self.crop,
            preserve_metadata: self.preserve_metadata,
            jpeg_quality: self.jpeg_quality,
            temp_dir: self.temp_dir.clone(),
        })
    }
}

/// Output format of the `sign` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    /// The signed path only
    #[default]
    Path,

    /// A full URL (requires --base-url)
    Url,

    /// A JSON object with every component
    Json,
}

/// Arguments of the `sign` command.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret for signed thumbnail URLs.
    #[arg(long, env = "THUMB_SECRET")]
    pub secret: String,

    /// Number of hex characters of the signature.
    #[arg(long, env = "THUMB_KEYLENGTH")]
    pub keylength: usize,

    /// Digest used for signatures.
    #[arg(long, value_enum, default_value_t = DigestAlgorithm::Sha1, env = "THUMB_DIGEST")]
    pub digest: DigestAlgorithm,

    /// Mount prefix to put in front of the signed path.
    #[arg(long, env = "THUMB_PREFIX")]
    pub prefix: Option<String>,

    /// Base URL, e.g. https://img.example.com
    #[arg(long)]
    pub base_url: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Path)]
    pub format: SignOutputFormat,

    /// Unsigned thumbnail path, e.g. /media/photo_50x100-sw.jpg
    pub path: String,
}

impl SignConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        ThumbOptions::new()
            .with_signing(self.secret.clone(), self.keylength)
            .with_digest(self.digest)
            .validate()
            .map_err(|e| e.to_string())?;

        if self.format == SignOutputFormat::Url && self.base_url.is_none() {
            return Err("--format url requires --base-url".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
