//! Tag 37: UUIDs as their raw 16-byte representation.

use crate::error::{DecodeError, DecodeValueErrorKind};

pub fn decode_uuid(offset: u64, bytes: &[u8]) -> Result<uuid::Uuid, DecodeError> {
    uuid::Uuid::from_slice(bytes).map_err(|_| {
        DecodeError::value(
            offset,
            DecodeValueErrorKind::BadTagPayload {
                tag: crate::tags::UUID,
                reason: format!("expected 16 bytes, got {}", bytes.len()),
            },
        )
    })
}

pub fn encode_uuid(value: &uuid::Uuid) -> [u8; 16] {
    *value.as_bytes()
}
