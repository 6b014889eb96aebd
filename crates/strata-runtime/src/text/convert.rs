//! Encoding conversions between UTF-8, UTF-16 and host wide strings.
//!
//! Decoding is lenient in both directions: invalid UTF-8 sequences and
//! unpaired surrogates are dropped instead of failing, so a conversion never
//! raises. Windows wide strings are UTF-16 and keep every unit.

use widestring::{WideStr, WideString};

/// Decode UTF-8 bytes into UTF-16 code units, skipping invalid sequences.
pub fn utf8_to_utf16(mut bytes: &[u8]) -> Vec<u16> {
    let mut units = Vec::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                units.extend(valid.encode_utf16());
                return units;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    units.extend(valid.encode_utf16());
                }
                match err.error_len() {
                    Some(skip) => bytes = &rest[skip..],
                    // Truncated sequence at the end of input
                    None => return units,
                }
            }
        }
    }
}

/// Encode UTF-16 code units as UTF-8, combining surrogate pairs.
pub fn utf16_to_utf8(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect()
}

/// Convert UTF-16 code units to the host's native wide string.
///
/// On Windows this is UTF-16 already and the units are copied unchanged.
/// Elsewhere wide characters are UTF-32, so surrogate pairs become a single
/// code point and unpaired surrogates are dropped.
#[cfg(windows)]
pub fn utf16_to_wide(units: &[u16]) -> WideString {
    WideString::from_vec(units.to_vec())
}

#[cfg(not(windows))]
pub fn utf16_to_wide(units: &[u16]) -> WideString {
    WideString::from_str(&utf16_to_utf8(units))
}

/// Convert a host wide string to UTF-16 code units.
#[cfg(windows)]
pub fn wide_to_utf16(wide: &WideStr) -> Vec<u16> {
    wide.as_slice().to_vec()
}

#[cfg(not(windows))]
pub fn wide_to_utf16(wide: &WideStr) -> Vec<u16> {
    wide.to_string_lossy().encode_utf16().collect()
}
