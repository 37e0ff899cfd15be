//! Time-based one-time passcodes (RFC 6238).
//!
//! The moving factor is `floor(unix_seconds / period)`; everything else is
//! delegated to [`crate::hotp`].

use std::{
    fmt::{self, Display},
    iter,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::codec::base32_decode;
use crate::config::{normalize_period, OtpConfig};
use crate::error::Result;
use crate::hotp;

/// A passcode together with the seconds left in its time-step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpCode {
    pub passcode: String,
    pub validity_secs: u64,
}

impl Display for TotpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Validity: {}s)", self.passcode, self.validity_secs)
    }
}

/// Whole seconds since the Unix epoch; instants before it map to 0.
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Time-step containing `timestamp`. A zero period means the default.
pub fn derive_counter(timestamp: u64, period: u64) -> u64 {
    timestamp / normalize_period(period)
}

pub fn seconds_remaining(timestamp: u64, period: u64) -> u64 {
    let period = normalize_period(period);
    period - (timestamp % period)
}

/// Counters to try, in order: current, +1, -1, +2, -2, ...
///
/// Steps that would fall outside the `u64` range are skipped. Counters are
/// produced on demand.
pub fn probe_counters(counter: u64, window: u64) -> impl Iterator<Item = u64> {
    iter::once(counter).chain((1..=window).flat_map(move |i| {
        counter
            .checked_add(i)
            .into_iter()
            .chain(counter.checked_sub(i))
    }))
}

/// Passcode for a raw secret at `timestamp` (Unix seconds).
pub fn generate(secret: &[u8], timestamp: u64, config: &OtpConfig) -> Result<String> {
    let counter = derive_counter(timestamp, config.period);
    hotp::generate(secret, counter, config.digits, config.algorithm)
}

/// Accepts `passcode` if it matches any time-step within `config.window`
/// of the one containing `timestamp`.
///
/// The first error from the HOTP check is returned immediately, so a bad
/// candidate length is never hidden by the window search.
pub fn validate(
    passcode: &str,
    secret: &[u8],
    timestamp: u64,
    config: &OtpConfig,
) -> Result<bool> {
    let counter = derive_counter(timestamp, config.period);
    for probe in probe_counters(counter, config.window) {
        if hotp::validate(passcode, probe, secret, config.digits, config.algorithm)? {
            tracing::debug!(drift = probe.wrapping_sub(counter) as i64, "TOTP matched");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Like [`generate`], with a base32 secret and a wall-clock instant.
pub fn generate_code(secret: &str, time: SystemTime, config: &OtpConfig) -> Result<String> {
    let secret = base32_decode(secret)?;
    generate(&secret, unix_seconds(time), config)
}

/// Like [`validate`], with a base32 secret and a wall-clock instant.
pub fn validate_code(
    passcode: &str,
    secret: &str,
    time: SystemTime,
    config: &OtpConfig,
) -> Result<bool> {
    let secret = base32_decode(secret)?;
    validate(passcode, &secret, unix_seconds(time), config)
}

/// Checks against the current time with the default configuration.
/// Any error counts as a failed validation.
pub fn validate_now(passcode: &str, secret: &str) -> bool {
    validate_code(passcode, secret, SystemTime::now(), &OtpConfig::default()).unwrap_or(false)
}

pub fn code_at(secret: &str, timestamp: u64, config: &OtpConfig) -> Result<TotpCode> {
    let secret = base32_decode(secret)?;
    Ok(TotpCode {
        passcode: generate(&secret, timestamp, config)?,
        validity_secs: seconds_remaining(timestamp, config.period),
    })
}

pub fn current_code(secret: &str, config: &OtpConfig) -> Result<TotpCode> {
    code_at(secret, unix_seconds(SystemTime::now()), config)
}
