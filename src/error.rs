//! Error types for rotp

use thiserror::Error;

/// Result type alias for rotp operations
pub type Result<T> = std::result::Result<T, OtpError>;

#[derive(Error, Debug)]
pub enum OtpError {
    /// Secret is not valid base32 after normalization
    #[error("secret is not valid base32")]
    InvalidEncoding,

    /// Candidate passcode has the wrong number of characters
    #[error("passcode must be {expected} digits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("issuer is required")]
    MissingIssuer,

    #[error("account name is required")]
    MissingAccountName,

    #[error("random source failed: {0}")]
    RandomSourceFailure(#[source] rand::Error),

    #[error("invalid otpauth URI: {0}")]
    InvalidUri(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported digit count: {0}")]
    UnsupportedDigits(String),

    #[error("HMAC rejected the secret")]
    KeyRejected,

    /// Failure reported by a barcode encoder
    #[error("image encoding failed: {0}")]
    ImageEncoding(String),

    #[error("cannot scale a {symbol}x{symbol} symbol into {width}x{height}")]
    ImageTooSmall { symbol: u32, width: u32, height: u32 },
}

impl From<url::ParseError> for OtpError {
    fn from(e: url::ParseError) -> Self {
        OtpError::InvalidUri(e.to_string())
    }
}
