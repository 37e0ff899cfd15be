//! Enrollment identities as `otpauth://totp/...` URIs.
//!
//! A [`Key`] keeps the exact string it was built from; every accessor is
//! derived from the parsed URL on demand.

use std::{collections::HashMap, fmt};

use percent_encoding::percent_decode_str;
use rand::{rngs::OsRng, RngCore};
use url::Url;

use crate::codec::{base32_encode_no_pad, canonical_query_encode, path_escape};
use crate::config::{
    algorithm_label, digits_label, normalize_period, Algorithm, Digits, OtpConfig,
    DEFAULT_SECRET_SIZE,
};
use crate::error::{OtpError, Result};
use crate::raster::{BarcodeEncoder, RasterImage};

/// Options for [`generate_key`]. Zero values mean "use the default".
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub issuer: String,
    pub account_name: String,
    pub period: u64,
    /// Bytes of randomness drawn when `secret` is empty.
    pub secret_size: usize,
    /// Raw secret to embed instead of a random one.
    pub secret: Vec<u8>,
    pub digits: Digits,
    pub algorithm: Algorithm,
}

impl GenerateOptions {
    pub fn new(issuer: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            account_name: account_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    origin: String,
    url: Url,
}

impl Key {
    /// Parses a previously serialized enrollment string.
    ///
    /// Only URL syntax is checked; missing fields show up as empty accessors.
    pub fn parse(origin: &str) -> Result<Self> {
        let s = origin.trim();
        let url = Url::parse(s)?;
        Ok(Self {
            origin: s.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.origin
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    fn label(&self) -> String {
        let path = self.url.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        percent_decode_str(path).decode_utf8_lossy().into_owned()
    }

    /// The `issuer` parameter, falling back to the label prefix before `:`.
    pub fn issuer(&self) -> String {
        if let Some(issuer) = self.query("issuer").filter(|i| !i.is_empty()) {
            return issuer;
        }

        let label = self.label();
        match label.find(':') {
            Some(i) => label[..i].to_string(),
            None => String::new(),
        }
    }

    /// The label after the first `:`, or the whole label.
    pub fn account_name(&self) -> String {
        let label = self.label();
        match label.find(':') {
            Some(i) => label[i + 1..].to_string(),
            None => label,
        }
    }

    /// The base32 `secret` parameter exactly as stored.
    pub fn secret(&self) -> String {
        self.query("secret").unwrap_or_default()
    }

    /// Passcode settings carried by the URI.
    ///
    /// Absent parameters take the defaults; present but malformed ones are
    /// errors.
    pub fn config(&self) -> Result<OtpConfig> {
        let mut config = OtpConfig::default();
        if let Some(period) = self.query("period") {
            let period = period
                .parse::<u64>()
                .map_err(|_| OtpError::InvalidUri(format!("bad period {:?}", period)))?;
            config = config.with_period(period);
        }
        if let Some(digits) = self.query("digits") {
            config = config.with_digits(digits.parse()?);
        }
        if let Some(algorithm) = self.query("algorithm") {
            config = config.with_algorithm(algorithm.parse()?);
        }
        Ok(config)
    }

    /// Renders the enrollment string through `encoder`.
    pub fn image<E: BarcodeEncoder + ?Sized>(
        &self,
        width: u32,
        height: u32,
        encoder: &E,
    ) -> Result<RasterImage> {
        encoder.encode(&self.origin, width, height)
    }

    #[cfg(feature = "qr")]
    pub fn qr_image(&self, width: u32, height: u32) -> Result<RasterImage> {
        self.image(width, height, &crate::qr::QrEncoder)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

/// Builds a key with a secret from the operating system's CSPRNG.
pub fn generate_key(opts: GenerateOptions) -> Result<Key> {
    generate_key_with_rng(opts, &mut OsRng)
}

/// Builds a key, drawing any random secret from `rng`.
///
/// `rng` should be cryptographically secure; that cannot be checked here.
pub fn generate_key_with_rng<R: RngCore + ?Sized>(
    opts: GenerateOptions,
    rng: &mut R,
) -> Result<Key> {
    if opts.issuer.is_empty() {
        return Err(OtpError::MissingIssuer);
    }
    if opts.account_name.is_empty() {
        return Err(OtpError::MissingAccountName);
    }
    let label = format!("{}:{}", opts.issuer, opts.account_name);
    // URL parsing removes `.` and `..` path segments, which would change the label.
    if label.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(OtpError::InvalidUri(format!(
            "label {:?} contains a dot segment",
            label
        )));
    }

    let period = normalize_period(opts.period);
    let secret_size = if opts.secret_size == 0 {
        DEFAULT_SECRET_SIZE
    } else {
        opts.secret_size
    };

    let secret = if opts.secret.is_empty() {
        let mut secret = vec![0u8; secret_size];
        rng.try_fill_bytes(&mut secret)
            .map_err(OtpError::RandomSourceFailure)?;
        secret
    } else {
        opts.secret
    };

    let mut values = HashMap::new();
    values.insert("secret".to_string(), vec![base32_encode_no_pad(&secret)]);
    values.insert("issuer".to_string(), vec![opts.issuer.clone()]);
    values.insert("period".to_string(), vec![period.to_string()]);
    values.insert(
        "algorithm".to_string(),
        vec![algorithm_label(opts.algorithm).to_string()],
    );
    values.insert(
        "digits".to_string(),
        vec![digits_label(opts.digits).to_string()],
    );

    let uri = format!(
        "otpauth://totp{}?{}",
        path_escape(&format!("/{}", label)),
        canonical_query_encode(&values)
    );
    tracing::debug!(issuer = %opts.issuer, account = %opts.account_name, "generated TOTP key");

    Key::parse(&uri)
}
