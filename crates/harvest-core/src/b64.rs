//! Lenient base64 used by subscription bodies and link payloads.
//!
//! Publishers mix the standard and URL-safe alphabets and frequently drop or
//! mangle padding, so both engines accept padded and unpadded input.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decode base64 in either alphabet, ignoring whitespace and padding.
pub fn decode_bytes(input: &str) -> Option<Vec<u8>> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let compact = compact.trim_end_matches('=');
    if compact.is_empty() {
        return None;
    }
    if compact.contains(|c: char| c == '-' || c == '_') {
        URL_SAFE_LENIENT.decode(compact).ok()
    } else {
        STANDARD_LENIENT
            .decode(compact)
            .or_else(|_| URL_SAFE_LENIENT.decode(compact))
            .ok()
    }
}

/// Decode base64 into UTF-8 text.
pub fn decode_text(input: &str) -> Option<String> {
    String::from_utf8(decode_bytes(input)?).ok()
}

/// Encode with the standard alphabet and padding.
pub fn encode(input: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::STANDARD.encode(input)
}
