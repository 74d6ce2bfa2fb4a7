//! URL-safe binary/text codec
//!
//! Every binary field exchanged with the verification service (challenges,
//! user handles, credential ids, attestation and assertion payloads) travels
//! as unpadded base64url text. This module converts in both directions.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use thiserror::Error;

/// Errors raised while decoding URL-safe text back into bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A character outside the URL-safe alphabet was found
    #[error("invalid character {character:?} at offset {offset}")]
    InvalidCharacter { character: char, offset: usize },

    /// The text length leaves a single dangling symbol, which no padding can fix
    #[error("length {0} cannot be padded to a multiple of four")]
    InvalidLength(usize),

    /// More trailing `=` than the unpadded length calls for
    #[error("{found} pad characters where at most {allowed} fit")]
    InvalidPadding { found: usize, allowed: usize },

    /// The padded text was rejected by the standard-alphabet decoder
    #[error("malformed base64 input: {0}")]
    Malformed(String),
}

/// Encode bytes as URL-safe text with no padding
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe text into bytes
///
/// Input may omit its trailing `=` padding. The URL-safe symbols are mapped
/// back to the standard alphabet, `(4 - len % 4) % 4` pad characters are
/// appended and the result is handed to the standard decoder.
///
/// # Errors
///
/// Returns an error if:
/// - The text contains characters outside the URL-safe alphabet
/// - The text length cannot be padded to a multiple of four
/// - The text carries more `=` padding than its length calls for
/// - The standard decoder rejects the padded text
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let unpadded = text.trim_end_matches('=');

    let mut standard = String::with_capacity(unpadded.len() + 3);
    for (offset, character) in unpadded.char_indices() {
        let mapped = match character {
            '-' => '+',
            '_' => '/',
            'A'..='Z' | 'a'..='z' | '0'..='9' => character,
            _ => return Err(CodecError::InvalidCharacter { character, offset }),
        };
        standard.push(mapped);
    }

    if standard.len() % 4 == 1 {
        return Err(CodecError::InvalidLength(standard.len()));
    }

    let padding = (4 - standard.len() % 4) % 4;
    let supplied = text.len() - unpadded.len();
    if supplied > padding {
        return Err(CodecError::InvalidPadding {
            found: supplied,
            allowed: padding,
        });
    }
    standard.extend(std::iter::repeat('=').take(padding));

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| CodecError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_url_safe_alphabet_without_padding() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet
        let encoded = encode(&[0xfb, 0xff]);
        assert_eq!(encoded, "-_8");
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.ends_with('='));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip_every_length_remainder() {
        for len in 0..=9 {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes, "length {len}");
        }
    }

    #[test]
    fn test_round_trip_large_attestation_sized_buffer() {
        let bytes: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        assert_eq!(decode("AQI=").unwrap(), vec![0x01, 0x02]);
        assert_eq!(decode("AQI").unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_decode_short_challenge() {
        // Three symbols need a single pad character
        assert_eq!(decode("AAA").unwrap(), vec![0x00, 0x00]);
        assert_eq!(decode("QQ").unwrap(), vec![0x41]);
    }

    #[test]
    fn test_decode_rejects_standard_alphabet_symbols() {
        let err = decode("ab+c").unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidCharacter {
                character: '+',
                offset: 2
            }
        );
        assert!(decode("ab/c").is_err());
    }

    #[test]
    fn test_decode_rejects_unpaddable_length() {
        assert_eq!(decode("AAAAA").unwrap_err(), CodecError::InvalidLength(5));
        assert_eq!(decode("A").unwrap_err(), CodecError::InvalidLength(1));
    }

    #[test]
    fn test_decode_rejects_whitespace() {
        assert!(matches!(
            decode("AA AA"),
            Err(CodecError::InvalidCharacter { character: ' ', .. })
        ));
    }

    #[test]
    fn test_bad_character_reported_before_length() {
        assert_eq!(
            decode("AAAA*").unwrap_err(),
            CodecError::InvalidCharacter {
                character: '*',
                offset: 4
            }
        );
    }

    #[test]
    fn test_decode_rejects_excess_padding() {
        assert_eq!(
            decode("AQI====").unwrap_err(),
            CodecError::InvalidPadding {
                found: 4,
                allowed: 1
            }
        );
        assert!(decode("AQI========").is_err());
        assert!(decode("AAAA=").is_err());
        assert_eq!(decode("QQ==").unwrap(), vec![0x41]);
        assert_eq!(decode("QQ=").unwrap(), vec![0x41]);
    }
}
