//! Counter-based one-time passcodes (RFC 4226).

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::codec::{base32_decode, constant_time_eq, counter_bytes};
use crate::config::{format_passcode, Algorithm, Digits, OtpConfig};
use crate::error::{OtpError, Result};

fn mac_digest<M>(key: &[u8], message: &[u8]) -> Result<Vec<u8>>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| OtpError::KeyRejected)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_digest(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        Algorithm::Sha1 => mac_digest::<Hmac<Sha1>>(key, message),
        Algorithm::Sha256 => mac_digest::<Hmac<Sha256>>(key, message),
        Algorithm::Sha512 => mac_digest::<Hmac<Sha512>>(key, message),
        Algorithm::Md5 => mac_digest::<Hmac<Md5>>(key, message),
    }
}

/* RFC4226 section 5.4 */
fn dt(hmac_output: &[u8]) -> u32 {
    let last = hmac_output[hmac_output.len() - 1];
    // MD5 digests are only 16 bytes long
    let offset = ((last & 0x0f) as usize).min(hmac_output.len() - 4);
    (hmac_output[offset] as u32 & 0x7f) << 24
        | (hmac_output[offset + 1] as u32) << 16
        | (hmac_output[offset + 2] as u32) << 8
        | (hmac_output[offset + 3] as u32)
}

/// Passcode for a raw secret at `counter`.
pub fn generate(
    secret: &[u8],
    counter: u64,
    digits: Digits,
    algorithm: Algorithm,
) -> Result<String> {
    tracing::trace!(counter, ?digits, ?algorithm, "computing HOTP");
    let sum = hmac_digest(algorithm, secret, &counter_bytes(counter))?;
    let code = dt(&sum) % digits.modulus();
    Ok(format_passcode(digits, code))
}

/// Checks `passcode` against the code for `counter`.
///
/// Surrounding whitespace is ignored. A candidate of the wrong length is
/// reported as [`OtpError::LengthMismatch`] rather than `Ok(false)`.
pub fn validate(
    passcode: &str,
    counter: u64,
    secret: &[u8],
    digits: Digits,
    algorithm: Algorithm,
) -> Result<bool> {
    let passcode = passcode.trim();
    if passcode.len() != digits.length() {
        return Err(OtpError::LengthMismatch {
            expected: digits.length(),
            actual: passcode.len(),
        });
    }

    let expected = generate(secret, counter, digits, algorithm)?;
    Ok(constant_time_eq(expected.as_bytes(), passcode.as_bytes()))
}

/// Like [`generate`], with a base32 secret.
pub fn generate_code(secret: &str, counter: u64, config: &OtpConfig) -> Result<String> {
    let secret = base32_decode(secret)?;
    generate(&secret, counter, config.digits, config.algorithm)
}

/// Like [`validate`], with a base32 secret.
pub fn validate_code(
    passcode: &str,
    counter: u64,
    secret: &str,
    config: &OtpConfig,
) -> Result<bool> {
    let secret = base32_decode(secret)?;
    validate(passcode, counter, &secret, config.digits, config.algorithm)
}

/// Six digits, SHA-1. Any error counts as a failed validation.
pub fn validate_default(passcode: &str, counter: u64, secret: &str) -> bool {
    validate_code(passcode, counter, secret, &OtpConfig::default()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base32_encode_no_pad;

    // Secret: "12345678901234567890" (ASCII)
    const RFC4226_SECRET: &[u8] = b"12345678901234567890";
    const RFC4226_SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, exp) in expected.iter().enumerate() {
            let code = generate(RFC4226_SECRET, counter as u64, Digits::Six, Algorithm::Sha1)
                .unwrap();
            assert_eq!(&code, exp, "HOTP mismatch at counter {}", counter);
        }
    }

    #[test]
    fn rfc4226_truncation_values() {
        // Appendix D, decimal values before the modulus
        let expected = [(0, 1284755224), (1, 1094287082), (2, 137359152), (9, 645520489)];
        for (counter, value) in expected {
            let sum = hmac_digest(Algorithm::Sha1, RFC4226_SECRET, &counter_bytes(counter))
                .unwrap();
            assert_eq!(dt(&sum), value, "truncation mismatch at counter {}", counter);
        }
    }

    #[test]
    fn truncation_masks_high_bit() {
        let mut sum = [0xffu8; 20];
        sum[19] = 0x00;
        assert_eq!(dt(&sum), 0x7fff_ffff);
    }

    #[test]
    fn short_digest_offset_is_clamped() {
        let mut sum = [0u8; 16];
        sum[15] = 0x0f;
        sum[12] = 0x01;
        assert_eq!(dt(&sum), 0x0100_000f);
    }

    #[test]
    fn every_algorithm_yields_fixed_width() {
        for alg in [
            Algorithm::Sha1,
            Algorithm::Sha256,
            Algorithm::Sha512,
            Algorithm::Md5,
        ] {
            for digits in [Digits::Six, Digits::Eight] {
                for counter in 0..64 {
                    let code = generate(RFC4226_SECRET, counter, digits, alg).unwrap();
                    assert_eq!(code.len(), digits.length());
                    assert!(code.bytes().all(|b| b.is_ascii_digit()));
                }
            }
        }
    }

    #[test]
    fn generate_is_deterministic() {
        let a = generate(b"secret", 42, Digits::Eight, Algorithm::Sha256).unwrap();
        let b = generate(b"secret", 42, Digits::Eight, Algorithm::Sha256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn validate_accepts_own_code() {
        let code = generate(RFC4226_SECRET, 7, Digits::Six, Algorithm::Sha512).unwrap();
        assert!(validate(&code, 7, RFC4226_SECRET, Digits::Six, Algorithm::Sha512).unwrap());
        assert!(!validate(&code, 8, RFC4226_SECRET, Digits::Six, Algorithm::Sha512).unwrap());
    }

    #[test]
    fn validate_trims_whitespace() {
        assert!(validate(" 755224\n", 0, RFC4226_SECRET, Digits::Six, Algorithm::Sha1).unwrap());
    }

    #[test]
    fn validate_reports_length_mismatch() {
        let err = validate("75522", 0, RFC4226_SECRET, Digits::Six, Algorithm::Sha1).unwrap_err();
        assert!(matches!(
            err,
            OtpError::LengthMismatch {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn base32_wrappers() {
        let config = OtpConfig::default();
        assert_eq!(generate_code(RFC4226_SECRET_B32, 1, &config).unwrap(), "287082");
        assert!(validate_code("287082", 1, RFC4226_SECRET_B32, &config).unwrap());
        assert!(validate_default("359152", 2, RFC4226_SECRET_B32));
        assert!(!validate_default("359152", 3, RFC4226_SECRET_B32));
        assert!(!validate_default("35915", 2, RFC4226_SECRET_B32));
    }

    #[test]
    fn lowercase_unpadded_secret_matches() {
        let b32 = base32_encode_no_pad(b"0123456789abcdef").to_lowercase();
        let config = OtpConfig::default().with_algorithm(Algorithm::Sha256);
        let from_b32 = generate_code(&b32, 99, &config).unwrap();
        let from_raw = generate(b"0123456789abcdef", 99, Digits::Six, Algorithm::Sha256).unwrap();
        assert_eq!(from_b32, from_raw);
    }

    #[test]
    fn malformed_secret_is_an_error() {
        let config = OtpConfig::default();
        assert!(matches!(
            generate_code("GEZDGNB1", 0, &config),
            Err(OtpError::InvalidEncoding)
        ));
        assert!(matches!(
            validate_code("123456", 0, "not base32!", &config),
            Err(OtpError::InvalidEncoding)
        ));
    }
}
