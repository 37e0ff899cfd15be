//! Passcode configuration: digit count, hash algorithm, period and window.
//!
//! The enums only carry identity. Rendering them for URIs and formatting
//! passcodes live in the free functions below.

use std::str::FromStr;

use crate::error::{OtpError, Result};

pub const DEFAULT_PERIOD: u64 = 30;
pub const DEFAULT_WINDOW: u64 = 1;
pub const DEFAULT_SECRET_SIZE: usize = 20;

/// Passcode length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Digits {
    #[default]
    Six,
    Eight,
}

impl Digits {
    pub fn length(self) -> usize {
        match self {
            Digits::Six => 6,
            Digits::Eight => 8,
        }
    }

    /// `10^length`, applied to the truncated HMAC value.
    pub fn modulus(self) -> u32 {
        10_u32.pow(self.length() as u32)
    }
}

impl TryFrom<u32> for Digits {
    type Error = OtpError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            6 => Ok(Digits::Six),
            8 => Ok(Digits::Eight),
            other => Err(OtpError::UnsupportedDigits(other.to_string())),
        }
    }
}

impl FromStr for Digits {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self> {
        let n = s
            .trim()
            .parse::<u32>()
            .map_err(|_| OtpError::UnsupportedDigits(s.to_string()))?;
        Digits::try_from(n)
    }
}

/// HMAC hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
    /// Legacy, kept for compatibility with older enrollments.
    Md5,
}

/// Legacy ordinal encoding (0 = SHA-1 .. 3 = MD5).
impl TryFrom<u8> for Algorithm {
    type Error = OtpError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Algorithm::Sha1),
            1 => Ok(Algorithm::Sha256),
            2 => Ok(Algorithm::Sha512),
            3 => Ok(Algorithm::Md5),
            other => Err(OtpError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl FromStr for Algorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA1" | "SHA-1" => Ok(Algorithm::Sha1),
            "SHA256" | "SHA-256" => Ok(Algorithm::Sha256),
            "SHA512" | "SHA-512" => Ok(Algorithm::Sha512),
            "MD5" => Ok(Algorithm::Md5),
            _ => Err(OtpError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Label used in the `algorithm` query parameter.
pub fn algorithm_label(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::Sha1 => "SHA1",
        Algorithm::Sha256 => "SHA256",
        Algorithm::Sha512 => "SHA512",
        Algorithm::Md5 => "MD5",
    }
}

/// Label used in the `digits` query parameter.
pub fn digits_label(digits: Digits) -> &'static str {
    match digits {
        Digits::Six => "6",
        Digits::Eight => "8",
    }
}

/// Left-pads `code` with zeros to exactly `digits` characters.
pub fn format_passcode(digits: Digits, code: u32) -> String {
    format!("{:0>width$}", code, width = digits.length())
}

/// A period of zero means "use the default".
pub fn normalize_period(period: u64) -> u64 {
    if period == 0 {
        DEFAULT_PERIOD
    } else {
        period
    }
}

/// Settings shared by the HOTP and TOTP engines.
///
/// HOTP only reads `digits` and `algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpConfig {
    pub period: u64,
    pub window: u64,
    pub digits: Digits,
    pub algorithm: Algorithm,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            window: DEFAULT_WINDOW,
            digits: Digits::default(),
            algorithm: Algorithm::default(),
        }
    }
}

impl OtpConfig {
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period;
        self
    }

    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    pub fn with_digits(mut self, digits: Digits) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Effective period in seconds, never zero.
    pub fn period(&self) -> u64 {
        normalize_period(self.period)
    }
}
