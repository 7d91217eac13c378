//! Tag number registry and the built-in semantic-tag handlers.
//!
//! Tag numbers here must match the specification exactly — "changing
//! assignments changes the wire format." Each submodule is a pair of plain
//! functions (no trait object registry) since the tag number itself already
//! determines which function runs; [`crate::decoder::DecodeOptions::tag_hook`]
//! is the actual extension point for anything not in this table.

pub mod bignum;
pub mod datetime;
pub mod decimal;
pub mod mime;
pub mod net;
pub mod rational;
pub mod regex;
pub mod set;
pub mod sharing;
pub mod stringref;
pub mod uuid;

pub const DATETIME_STRING: u64 = 0;
pub const DATETIME_EPOCH: u64 = 1;
pub const POS_BIGNUM: u64 = 2;
pub const NEG_BIGNUM: u64 = 3;
pub const DECIMAL: u64 = 4;
pub const BIGFLOAT: u64 = 5;
pub const EMBEDDED_CBOR: u64 = 24;
pub const STRINGREF_NAMESPACE: u64 = 256;
pub const STRINGREF: u64 = 25;
pub const SHAREABLE: u64 = 28;
pub const SHAREDREF: u64 = 29;
pub const RATIONAL: u64 = 30;
pub const REGEX: u64 = 35;
pub const MIME: u64 = 36;
pub const UUID: u64 = 37;
pub const IPV4_ADDR_OR_NET: u64 = 52;
pub const IPV6_ADDR_OR_NET: u64 = 54;
pub const SET: u64 = 258;
pub const LEGACY_IP: u64 = 260;
pub const LEGACY_IP_NETWORK: u64 = 261;
pub const COMPLEX: u64 = 1010;
pub const SELF_DESCRIBE: u64 = 55799;

/// `true` for every tag number this crate gives built-in encode/decode
/// behavior to, whether or not that behavior goes through a dedicated
/// `Value` variant. Used by the decoder to decide which tags it handles
/// natively versus falling through to `tag_hook`.
pub fn is_builtin(tag: u64) -> bool {
    matches!(
        tag,
        DATETIME_STRING
            | DATETIME_EPOCH
            | POS_BIGNUM
            | NEG_BIGNUM
            | DECIMAL
            | BIGFLOAT
            | EMBEDDED_CBOR
            | STRINGREF_NAMESPACE
            | STRINGREF
            | SHAREABLE
            | SHAREDREF
            | RATIONAL
            | REGEX
            | MIME
            | UUID
            | IPV4_ADDR_OR_NET
            | IPV6_ADDR_OR_NET
            | SET
            | LEGACY_IP
            | LEGACY_IP_NETWORK
            | COMPLEX
            | SELF_DESCRIBE
    )
}

/// `true` for tags that already have a dedicated `Value` variant (`Date`,
/// `BigInt`, `Decimal`, `Regex`, ...). A user-constructed `Value::Tag`
/// carrying one of these numbers would desynchronize from that variant's
/// own encoding path — two different wire shapes for "a tag-0 value" —
/// so the encoder refuses it. Tags with no dedicated variant (24's
/// embedded-CBOR passthrough, 55799's self-describe wrapper) still go
/// through generic `Value::Tag` encoding and are not refused here; the
/// pure wire-protocol tags (25/28/29/256) are refused for a different
/// reason — they are never meaningful as a user-supplied value.
pub fn has_dedicated_value_variant(tag: u64) -> bool {
    matches!(
        tag,
        DATETIME_STRING
            | DATETIME_EPOCH
            | POS_BIGNUM
            | NEG_BIGNUM
            | DECIMAL
            | BIGFLOAT
            | RATIONAL
            | REGEX
            | MIME
            | UUID
            | IPV4_ADDR_OR_NET
            | IPV6_ADDR_OR_NET
            | SET
            | LEGACY_IP
            | LEGACY_IP_NETWORK
            | COMPLEX
    )
}

/// Pure wire-protocol tags that never carry a meaningful generic
/// `Value::Tag` payload from the caller's side; the encoder refuses to
/// emit them via the generic passthrough path.
pub fn is_protocol_only(tag: u64) -> bool {
    matches!(tag, STRINGREF_NAMESPACE | STRINGREF | SHAREABLE | SHAREDREF)
}
