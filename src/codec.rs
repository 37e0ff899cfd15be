//! Byte-level helpers shared by the engines and the key model.

use std::collections::HashMap;

use base32ct::{Base32Upper, Encoding};
use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use subtle::ConstantTimeEq;

use crate::error::{OtpError, Result};

lazy_static! {
    static ref BASE32_REGEX: Regex = Regex::new(r"^[A-Z2-7]+=*$").unwrap();
}

/// Characters left as-is inside a single path segment or a query value.
/// `/`, `;`, `,` and `?` are escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// A whole path: only `?` among the reserved characters is escaped.
const PATH: &AsciiSet = &PATH_SEGMENT.remove(b'/').remove(b',').remove(b';');

/// True iff both slices have the same length and content.
///
/// Content is only compared once the lengths agree, and then in constant time.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Shape check for a padded, upper-case base32 secret.
///
/// This is the single gate in front of the decoder: the input must be whole
/// 8-character quanta, and the last quantum must end in 0, 1, 3, 4 or 6
/// padding characters.
pub fn is_well_formed_base32(input: &str) -> bool {
    if input.len() % 8 != 0 || !BASE32_REGEX.is_match(input) {
        return false;
    }
    let padding = input.len() - input.trim_end_matches('=').len();
    matches!(padding, 0 | 1 | 3 | 4 | 6)
}

/// Trims, upper-cases and pads to a multiple of 8 characters.
pub fn normalize_base32(input: &str) -> String {
    let mut secret = input.trim().to_uppercase();
    let n = secret.len() % 8;
    if n != 0 {
        secret.push_str(&"=".repeat(8 - n));
    }
    secret
}

/// Decodes a base32 secret, tolerating missing padding and lower case.
pub fn base32_decode(input: &str) -> Result<Vec<u8>> {
    let secret = normalize_base32(input);
    if secret.is_empty() {
        return Ok(Vec::new());
    }
    if !is_well_formed_base32(&secret) {
        return Err(OtpError::InvalidEncoding);
    }
    Base32Upper::decode_vec(&secret).map_err(|_| OtpError::InvalidEncoding)
}

/// Upper-case base32 without `=` padding, as embedded in enrollment URIs.
pub fn base32_encode_no_pad(bytes: &[u8]) -> String {
    let mut encoded = Base32Upper::encode_string(bytes);
    let unpadded = encoded.trim_end_matches('=').len();
    encoded.truncate(unpadded);
    encoded
}

/// Big-endian bytes of the moving factor.
pub fn counter_bytes(counter: u64) -> [u8; 8] {
    counter.to_be_bytes()
}

/// Escapes a single path segment or query component.
pub fn path_segment_escape(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Escapes a full path, keeping `/` separators.
pub fn path_escape(s: &str) -> String {
    utf8_percent_encode(s, PATH).to_string()
}

/// `key=value` pairs with keys in byte order, joined by `&`.
///
/// Keys with several values emit one pair per value, in the given order.
pub fn canonical_query_encode(values: &HashMap<String, Vec<String>>) -> String {
    let mut keys: Vec<&String> = values.keys().collect();
    keys.sort();

    let mut buf = String::new();
    for key in keys {
        let key_escaped = path_segment_escape(key);
        for value in &values[key] {
            if !buf.is_empty() {
                buf.push('&');
            }
            buf.push_str(&key_escaped);
            buf.push('=');
            buf.push_str(&path_segment_escape(value));
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn equal_slices() {
        assert!(constant_time_eq(b"287082", b"287082"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn mismatch_position_does_not_change_result() {
        assert!(!constant_time_eq(b"123456", b"654321"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"023456"));
    }

    #[test]
    fn length_mismatch_is_false() {
        assert!(!constant_time_eq(b"12345", b"123456"));
        assert!(!constant_time_eq(b"123456", b""));
    }

    #[test]
    fn decode_rfc_secret() {
        assert_eq!(
            base32_decode(RFC_SECRET_B32).unwrap(),
            b"12345678901234567890"
        );
    }

    #[test]
    fn decode_normalizes_case_whitespace_and_padding() {
        let expected = base32_decode("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(base32_decode("  jbswy3dpehpk3pxp\n").unwrap(), expected);
        // 16 bytes -> 26 characters, 6 of padding restored
        let key = b"0123456789abcdef";
        let unpadded = base32_encode_no_pad(key);
        assert_eq!(unpadded.len(), 26);
        assert_eq!(base32_decode(&unpadded).unwrap(), key);
    }

    #[test]
    fn decode_rejects_invalid_characters() {
        assert!(matches!(
            base32_decode("GEZDGNB1"),
            Err(OtpError::InvalidEncoding)
        ));
        assert!(matches!(
            base32_decode("GEZDGNB0GEZDGNBV"),
            Err(OtpError::InvalidEncoding)
        ));
        assert!(matches!(base32_decode("!!!"), Err(OtpError::InvalidEncoding)));
    }

    #[test]
    fn decode_empty_is_empty() {
        assert_eq!(base32_decode("  ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn decode_rejects_impossible_lengths() {
        // A single data character in the last quantum cannot encode a byte
        assert!(matches!(
            base32_decode("GEZDGNBVG"),
            Err(OtpError::InvalidEncoding)
        ));
    }

    #[test]
    fn well_formed_check() {
        assert!(is_well_formed_base32(RFC_SECRET_B32));
        assert!(is_well_formed_base32("MZXW6===")); // "foo"
        assert!(!is_well_formed_base32("MZXW6"));
        assert!(!is_well_formed_base32("mzxw6==="));
        assert!(!is_well_formed_base32("M======="));
        assert!(!is_well_formed_base32("MZXW6Y=="));
        assert!(!is_well_formed_base32("MZXW6YQ=A"));
    }

    #[test]
    fn encode_without_padding() {
        assert_eq!(base32_encode_no_pad(b"foo"), "MZXW6");
        assert_eq!(base32_encode_no_pad(b"12345678901234567890"), RFC_SECRET_B32);
        assert_eq!(base32_encode_no_pad(b""), "");
    }

    #[test]
    fn counter_is_big_endian() {
        assert_eq!(counter_bytes(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            counter_bytes(0x0102_0304_0506_0708),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn query_keys_sorted_and_escaped() {
        let mut values = HashMap::new();
        values.insert("secret".to_string(), vec!["MZXW6".to_string()]);
        values.insert("issuer".to_string(), vec!["Acme Co/Dev".to_string()]);
        values.insert("algorithm".to_string(), vec!["SHA1".to_string()]);
        values.insert("digits".to_string(), vec!["6".to_string()]);
        assert_eq!(
            canonical_query_encode(&values),
            "algorithm=SHA1&digits=6&issuer=Acme%20Co%2FDev&secret=MZXW6"
        );
    }

    #[test]
    fn query_multiple_values_and_empty() {
        assert_eq!(canonical_query_encode(&HashMap::new()), "");

        let mut values = HashMap::new();
        values.insert("b".to_string(), vec!["2".to_string(), "1".to_string()]);
        values.insert("a".to_string(), vec!["x@y".to_string()]);
        assert_eq!(canonical_query_encode(&values), "a=x@y&b=2&b=1");
    }

    #[test]
    fn path_escape_keeps_separators() {
        assert_eq!(path_escape("/Acme:alice@example.com"), "/Acme:alice@example.com");
        assert_eq!(path_escape("/Acme Co:bob?"), "/Acme%20Co:bob%3F");
        assert_eq!(path_segment_escape("a/b"), "a%2Fb");
    }

    #[test]
    fn segment_escape_covers_comma_and_semicolon() {
        assert_eq!(path_segment_escape("Acme, Inc;x"), "Acme%2C%20Inc%3Bx");
        assert_eq!(path_segment_escape("a$b&c+d:e=f@g"), "a$b&c+d:e=f@g");
        assert_eq!(path_escape("/a,b;c"), "/a,b;c");
    }
}
