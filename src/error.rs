use std::fmt;

use thiserror::Error;

use crate::constants::{ALLOWED_MIME_TYPES, GENERIC_RETRY_MESSAGE, REINSTALL_MESSAGE};

/// Error codes the detection API attaches to a 401 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCode {
    ShopNotAuthenticated,
    SessionExpired,
}

impl AuthCode {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SHOP_NOT_AUTHENTICATED" => Some(Self::ShopNotAuthenticated),
            "SESSION_EXPIRED" => Some(Self::SessionExpired),
            _ => None,
        }
    }
}

impl fmt::Display for AuthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShopNotAuthenticated => write!(f, "SHOP_NOT_AUTHENTICATED"),
            Self::SessionExpired => write!(f, "SESSION_EXPIRED"),
        }
    }
}

/// How an error is surfaced to the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any network call, reported immediately.
    Validation,
    /// Terminal for the session, no retry.
    Authentication,
    /// Recoverable by re-uploading or re-cropping.
    Network,
    /// Logged only.
    Silent,
}

#[derive(Error, Debug)]
pub enum VisualSearchError {
    #[error("File is {size} bytes, the maximum is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Shop not authenticated: {0}")]
    Auth(AuthCode),

    #[error("API Error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Drawer has been disposed")]
    Disposed,
}

impl VisualSearchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileTooLarge { .. } | Self::UnsupportedType(_) => ErrorCategory::Validation,
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Api { .. } | Self::Http(_) | Self::InvalidResponse(_) => ErrorCategory::Network,
            Self::Io(_) | Self::Image(_) | Self::InvalidUrl(_) | Self::InvalidImage(_) => {
                ErrorCategory::Validation
            }
            Self::Config(_) | Self::Disposed => ErrorCategory::Silent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    /// Toast text for the shopper, `None` for errors that are only logged.
    pub fn user_message(&self) -> Option<String> {
        match self.category() {
            ErrorCategory::Validation => Some(match self {
                Self::FileTooLarge { max, .. } => {
                    format!("Image is too large. Maximum size is {}MB.", max / (1024 * 1024))
                }
                Self::UnsupportedType(_) => format!(
                    "Unsupported file type. Please upload one of: {}.",
                    accepted_formats()
                ),
                _ => "We couldn't read that image. Please try another one.".to_string(),
            }),
            ErrorCategory::Authentication => Some(REINSTALL_MESSAGE.to_string()),
            ErrorCategory::Network => Some(GENERIC_RETRY_MESSAGE.to_string()),
            ErrorCategory::Silent => None,
        }
    }
}

/// Accepted formats for display, e.g. "JPEG, PNG, WEBP".
pub fn accepted_formats() -> String {
    ALLOWED_MIME_TYPES
        .iter()
        .filter(|mime| **mime != "image/jpg")
        .map(|mime| mime.trim_start_matches("image/").to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, VisualSearchError>;
