//! Tag 35: regular expression patterns carried as their source text.
//!
//! This crate has no host-language regex object to defer to, so the
//! pattern string round-trips through `regex::Regex` for validation on
//! decode and is recovered verbatim via `Regex::as_str` on encode.

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::RegexValue;

pub fn decode_regex(offset: u64, pattern: &str) -> Result<RegexValue, DecodeError> {
    regex::Regex::new(pattern)
        .map(RegexValue)
        .map_err(|e| {
            DecodeError::value(
                offset,
                DecodeValueErrorKind::BadTagPayload {
                    tag: crate::tags::REGEX,
                    reason: e.to_string(),
                },
            )
        })
}

pub fn encode_regex(value: &RegexValue) -> &str {
    value.0.as_str()
}
