//! Guard clauses run on an extraction request before any browser is touched.

use serde_json::Value;
use thiserror::Error;

use crate::filter::UrlFilter;

/// Allowed viewport width range, in CSS pixels
pub const WIDTH_RANGE: (i64, i64) = (320, 3840);

/// Allowed viewport height range, in CSS pixels
pub const HEIGHT_RANGE: (i64, i64) = (240, 2160);

/// Viewport used when the request does not specify one
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1920,
    height: 1080,
};

/// Reasons a request is refused. The messages are returned to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Missing URL")]
    MissingUrl,

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Local and private URLs are not allowed")]
    BlockedHost,

    #[error("URL too long (max {max} characters)")]
    UrlTooLong { max: usize },

    #[error("Invalid width (min: {}, max: {})", WIDTH_RANGE.0, WIDTH_RANGE.1)]
    InvalidWidth,

    #[error("Invalid height (min: {}, max: {})", HEIGHT_RANGE.0, HEIGHT_RANGE.1)]
    InvalidHeight,
}

impl ValidationError {
    /// Short description used as the log message for a rejected request
    pub fn log_message(&self) -> &'static str {
        match self {
            Self::InvalidBody => "Request rejected: malformed body",
            Self::MissingUrl => "Request rejected: missing URL",
            Self::InvalidUrl
            | Self::UnsupportedProtocol
            | Self::BlockedHost
            | Self::UrlTooLong { .. } => "Request rejected: invalid URL",
            Self::InvalidWidth | Self::InvalidHeight => "Request rejected: invalid dimensions",
        }
    }
}

/// Browser viewport size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// The URL exactly as submitted; this is what the browser navigates to
    pub url: String,
    pub viewport: Viewport,
}

/// Validates extraction requests
#[derive(Debug, Default)]
pub struct RequestValidator {
    url_filter: UrlFilter,
}

impl RequestValidator {
    /// Create a validator around a URL filter
    pub fn new(url_filter: UrlFilter) -> Self {
        Self { url_filter }
    }

    /// Validate a JSON request body `{url, width?, height?}`
    pub fn validate(&self, body: &Value) -> Result<ExtractRequest, ValidationError> {
        let url = match body.get("url") {
            Some(value) if is_falsy(value) => return Err(ValidationError::MissingUrl),
            None => return Err(ValidationError::MissingUrl),
            Some(Value::String(url)) => url.clone(),
            Some(_) => return Err(ValidationError::InvalidUrl),
        };

        self.url_filter.check(&url)?;
        let viewport = validate_dimensions(body.get("width"), body.get("height"))?;

        Ok(ExtractRequest { url, viewport })
    }
}

/// JSON values that JavaScript treats as false
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Validate optional width and height values, defaulting to 1920x1080
pub fn validate_dimensions(
    width: Option<&Value>,
    height: Option<&Value>,
) -> Result<Viewport, ValidationError> {
    let width = dimension(width, DEFAULT_VIEWPORT.width, WIDTH_RANGE)
        .ok_or(ValidationError::InvalidWidth)?;
    let height = dimension(height, DEFAULT_VIEWPORT.height, HEIGHT_RANGE)
        .ok_or(ValidationError::InvalidHeight)?;

    Ok(Viewport { width, height })
}

fn dimension(value: Option<&Value>, default: u32, (min, max): (i64, i64)) -> Option<u32> {
    let Some(value) = value else {
        return Some(default);
    };

    let parsed = parse_int(value)?;
    if parsed < min || parsed > max {
        return None;
    }
    u32::try_from(parsed).ok()
}

/// Integer coercion with `parseInt` semantics: numbers are truncated, strings
/// yield their leading integer, everything else is not a number.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Some(int);
            }
            let float = number.as_f64()?;
            if !float.is_finite() || float.abs() >= i64::MAX as f64 {
                return None;
            }
            Some(float.trunc() as i64)
        }
        Value::String(text) => parse_int_prefix(text),
        _ => None,
    }
}

fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Values too large for i64 are out of every range anyway
    let magnitude: i64 = digits[..end].parse().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
