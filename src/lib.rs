//! HOTP/TOTP passcodes and `otpauth://` enrollment keys.
//!
//! - [`hotp`]: RFC 4226 codes from a secret and a counter
//! - [`totp`]: RFC 6238 codes from a secret and the clock, with drift window
//! - [`key`]: enrollment identities, parsed from or serialized to URIs
//! - [`raster`]: the boundary to barcode encoders; [`qr`] implements it
//!   behind the `qr` feature

pub mod codec;
pub mod config;
pub mod error;
pub mod hotp;
pub mod key;
#[cfg(feature = "qr")]
pub mod qr;
pub mod raster;
pub mod totp;

pub use config::{Algorithm, Digits, OtpConfig};
pub use error::{OtpError, Result};
pub use key::{generate_key, generate_key_with_rng, GenerateOptions, Key};
pub use raster::{BarcodeEncoder, RasterImage};
pub use totp::TotpCode;
