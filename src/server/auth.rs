//! Signed thumbnail URLs.
//!
//! In signed mode every thumbnail URL carries a truncated hex digest that
//! proves it was generated by someone holding the shared secret. This stops
//! clients from requesting arbitrary renders.
//!
//! # Signing Scheme
//!
//! ```text
//! signature = hex(DIGEST(source + "_" + dimensions + gravity + extension + secret))[..keylength]
//! ```
//!
//! `gravity` includes its leading dash (`-sw`) and `extension` its dot
//! (`.jpg`); both are empty when absent. The retina multiplier is not signed.
//! The signature is placed after the gravity:
//!
//! ```text
//! /media/photo_50x100-sw-a267c193a7eff046@2x.jpg
//! ```
//!
//! # Example
//!
//! ```rust
//! use thumb_streamer::server::auth::{DigestAlgorithm, ThumbSigner};
//!
//! let signer = ThumbSigner::new("my-secret", 16, DigestAlgorithm::Sha1);
//! let signed = signer.sign_path("/media/photo_50x100-sw.jpg").unwrap();
//! assert!(signed.starts_with("/media/photo_50x100-sw-"));
//! ```

use std::fmt;

use sha1::{Digest, Sha1};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::route::{ParsedRequest, RoutePattern, UrlSelector};

// =============================================================================
// Types
// =============================================================================

/// Hash used for URL signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DigestAlgorithm {
    /// SHA-1, compatible with existing signed URLs
    #[default]
    Sha1,

    /// SHA-256
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the full hex digest.
    pub fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    fn hex_digest(self, message: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(message)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(message)),
        }
    }
}

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Signed mode is on but the URL carries no signature
    MissingSignature,

    /// The signature does not match the URL
    InvalidSignature,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingSignature => write!(f, "Missing signature"),
            AuthError::InvalidSignature => write!(f, "Invalid signature"),
        }
    }
}

impl std::error::Error for AuthError {}

// =============================================================================
// Signer
// =============================================================================

/// Computes and checks thumbnail URL signatures.
#[derive(Clone)]
pub struct ThumbSigner {
    /// Shared secret appended to the signed message
    secret: Vec<u8>,

    /// Number of hex characters kept from the digest
    keylength: usize,

    algorithm: DigestAlgorithm,
}

impl fmt::Debug for ThumbSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbSigner")
            .field("keylength", &self.keylength)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl ThumbSigner {
    /// Create a signer. `keylength` is clamped to the digest length.
    pub fn new(secret: impl AsRef<[u8]>, keylength: usize, algorithm: DigestAlgorithm) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            keylength: keylength.min(algorithm.hex_len()),
            algorithm,
        }
    }

    /// Number of hex characters in a signature.
    pub fn keylength(&self) -> usize {
        self.keylength
    }

    /// Compute the signature for the signed tuple.
    ///
    /// `gravity` and `extension` are passed as they appear in the URL
    /// (`-sw`, `.jpg`) or empty.
    pub fn signature(&self, source: &str, dimensions: &str, gravity: &str, extension: &str) -> String {
        let mut message = Vec::with_capacity(
            source.len() + dimensions.len() + gravity.len() + extension.len() + self.secret.len() + 1,
        );
        message.extend_from_slice(source.as_bytes());
        message.push(b'_');
        message.extend_from_slice(dimensions.as_bytes());
        message.extend_from_slice(gravity.as_bytes());
        message.extend_from_slice(extension.as_bytes());
        message.extend_from_slice(&self.secret);

        let mut digest = self.algorithm.hex_digest(&message);
        digest.truncate(self.keylength);
        digest
    }

    /// Verify the signature carried by a parsed request.
    pub fn verify(&self, request: &ParsedRequest) -> Result<(), AuthError> {
        let presented = request
            .signature
            .as_deref()
            .ok_or(AuthError::MissingSignature)?;

        let expected = self.signature(
            &request.base,
            &request.dimensions,
            &request.gravity_token(),
            request.extension_token(),
        );

        // Constant-time comparison; differing lengths compare unequal
        if presented.as_bytes().ct_eq(expected.as_bytes()).into() {
            Ok(())
        } else {
            warn!(source = %request.base, "Thumbnail signature mismatch");
            Err(AuthError::InvalidSignature)
        }
    }

    /// Insert a signature into an unsigned thumbnail path.
    ///
    /// `/media/photo_50x100-sw@2x.jpg` becomes
    /// `/media/photo_50x100-sw-<sig>@2x.jpg`. Returns `None` when the path
    /// is not a thumbnail path. The path must not include a mount prefix.
    pub fn sign_path(&self, path: &str) -> Option<String> {
        let pattern = RoutePattern::compile(&UrlSelector::default(), None, None).ok()?;
        let parsed = pattern.matches(path)?;

        let gravity = parsed.gravity_token();
        let signature = self.signature(
            &parsed.base,
            &parsed.dimensions,
            &gravity,
            parsed.extension_token(),
        );
        let retina = parsed
            .retina
            .as_deref()
            .map(|n| format!("@{}x", n))
            .unwrap_or_default();

        Some(format!(
            "{}_{}{}-{}{}{}",
            parsed.base,
            parsed.dimensions,
            gravity,
            signature,
            retina,
            parsed.extension_token()
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
