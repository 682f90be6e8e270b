//! Thumbnail URL grammar.
//!
//! Every configured URL selector is compiled into one anchored regular
//! expression. The expression is assembled from fixed fragments in this order:
//!
//! ```text
//! ^ prefix (?P<source> selector / .+ )
//!   _ (?P<dimensions> W x H | W x | x H )
//!   ( - (?P<gravity> nw|ne|sw|se|n|e|s|w|c) )?
//!   - (?P<signature> [0-9a-f]{N} )              signed mode only
//!   ( @ (?P<retina> [0-9]+ ) x )?
//!   (?P<extension> \. (jpg|jpeg|png|gif) )?     case-insensitive
//! $
//! ```
//!
//! Literal prefixes and selectors are escaped. Caller-supplied patterns are
//! embedded inside a non-capturing group so alternations in them cannot bind
//! to the surrounding fragments. Only named groups are read back, so unnamed
//! groups inside caller patterns do not shift the captures.
//!
//! Patterns must not contain their own `^`/`$` anchors.

use regex::Regex;

use crate::error::GrammarError;

use super::gravity::Gravity;

/// Dimension token: `WxH`, `Wx` or `xH`.
const DIMENSIONS: &str = r"(?P<dimensions>[0-9]+x[0-9]*|x[0-9]+)";

/// Optional gravity code. Two-letter codes first.
const GRAVITY: &str = r"(?:-(?P<gravity>nw|ne|sw|se|n|e|s|w|c))?";

/// Optional retina multiplier.
const RETINA: &str = r"(?:@(?P<retina>[0-9]+)x)?";

/// Optional recognised image extension.
const EXTENSION: &str = r"(?P<extension>\.(?i:jpg|jpeg|png|gif))?";

// =============================================================================
// URL Selectors
// =============================================================================

/// One entry of the URL allow-list.
#[derive(Debug, Clone)]
pub enum UrlSelector {
    /// A literal path segment such as `/media`. `/` selects the whole tree.
    Literal(String),

    /// A caller-supplied pattern embedded verbatim.
    Pattern(Regex),
}

impl UrlSelector {
    /// Convenience constructor for a literal selector.
    pub fn literal(path: impl Into<String>) -> Self {
        UrlSelector::Literal(path.into())
    }

    /// Compile a caller-supplied pattern selector.
    pub fn pattern(pattern: &str) -> Result<Self, GrammarError> {
        Regex::new(pattern)
            .map(UrlSelector::Pattern)
            .map_err(|e| GrammarError::InvalidPattern(e.to_string()))
    }

    fn fragment(&self) -> String {
        match self {
            UrlSelector::Literal(path) if path == "/" || path.is_empty() => String::new(),
            UrlSelector::Literal(path) => regex::escape(path.trim_end_matches('/')),
            UrlSelector::Pattern(regex) => format!("(?:{})", regex.as_str()),
        }
    }
}

impl Default for UrlSelector {
    fn default() -> Self {
        UrlSelector::Literal("/".to_string())
    }
}

impl From<&str> for UrlSelector {
    fn from(path: &str) -> Self {
        UrlSelector::literal(path)
    }
}

// =============================================================================
// Parsed Request
// =============================================================================

/// Raw tokens extracted from a matching thumbnail path.
///
/// Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Source path without the suffix or extension, e.g. `/media/photo`
    pub base: String,

    /// Dimension token, e.g. `50x100`
    pub dimensions: String,

    /// Gravity code without the leading dash, e.g. `sw`
    pub gravity: Option<String>,

    /// Hex signature, present in signed mode
    pub signature: Option<String>,

    /// Retina multiplier digits, e.g. `2`
    pub retina: Option<String>,

    /// Extension including the dot, e.g. `.jpg`
    pub extension: Option<String>,
}

impl ParsedRequest {
    /// Path of the original image in the downstream service.
    pub fn source_path(&self) -> String {
        format!("{}{}", self.base, self.extension_token())
    }

    /// Gravity as it appears in the URL (`-sw`), or empty.
    pub fn gravity_token(&self) -> String {
        self.gravity
            .as_deref()
            .map(|code| format!("-{}", code))
            .unwrap_or_default()
    }

    /// Extension as it appears in the URL (`.jpg`), or empty.
    pub fn extension_token(&self) -> &str {
        self.extension.as_deref().unwrap_or("")
    }

    /// Resolved crop anchor; center when absent.
    pub fn gravity(&self) -> Gravity {
        self.gravity
            .as_deref()
            .and_then(Gravity::from_code)
            .unwrap_or_default()
    }
}

// =============================================================================
// Route Patterns
// =============================================================================

/// A compiled matcher for one URL selector.
///
/// Immutable once built; `Regex` is `Send + Sync` so a single pattern can be
/// matched by any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    regex: Regex,
}

impl RoutePattern {
    /// Compile the grammar for one selector.
    ///
    /// `keylength` switches on signed mode: the signature infix becomes
    /// mandatory and must be exactly that many lowercase hex characters.
    pub fn compile(
        selector: &UrlSelector,
        prefix: Option<&str>,
        keylength: Option<usize>,
    ) -> Result<Self, GrammarError> {
        let prefix = prefix
            .map(|p| regex::escape(p.trim_end_matches('/')))
            .unwrap_or_default();
        let signature = keylength
            .map(|len| format!(r"-(?P<signature>[0-9a-f]{{{}}})", len))
            .unwrap_or_default();

        let pattern = format!(
            "^{prefix}(?P<source>{selector}/.+)_{DIMENSIONS}{GRAVITY}{signature}{RETINA}{EXTENSION}$",
            selector = selector.fragment(),
        );

        Regex::new(&pattern)
            .map(|regex| Self { regex })
            .map_err(|e| GrammarError::InvalidPattern(e.to_string()))
    }

    /// The compiled expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Match a request path and extract its tokens.
    pub fn matches(&self, path: &str) -> Option<ParsedRequest> {
        let caps = self.regex.captures(path)?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        Some(ParsedRequest {
            base: group("source")?,
            dimensions: group("dimensions")?,
            gravity: group("gravity"),
            signature: group("signature"),
            retina: group("retina"),
            extension: group("extension"),
        })
    }
}

/// The ordered set of patterns built from the configured selectors.
#[derive(Debug, Clone)]
pub struct RouteTable {
    patterns: Vec<RoutePattern>,
}

impl RouteTable {
    /// Compile one pattern per selector, preserving order.
    pub fn compile(
        selectors: &[UrlSelector],
        prefix: Option<&str>,
        keylength: Option<usize>,
    ) -> Result<Self, GrammarError> {
        let patterns = selectors
            .iter()
            .map(|selector| RoutePattern::compile(selector, prefix, keylength))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// First pattern that matches wins.
    pub fn match_path(&self, path: &str) -> Option<ParsedRequest> {
        self.patterns.iter().find_map(|pattern| pattern.matches(path))
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no patterns were compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
