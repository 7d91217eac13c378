//! A complete encoder/decoder for Concise Binary Object Representation
//! (CBOR, RFC 8949): the eight major types, canonical and default encoding
//! modes, indefinite-length containers, the built-in semantic tags (bignums,
//! decimals, datetimes, rationals, regexes, MIME messages, UUIDs, IP
//! addresses/networks, sets, complex numbers), the value-sharing protocol
//! (tags 28/29) for cyclic and repeated structures, and the string-reference
//! protocol (tags 256/25) for deduplicating repeated strings.
//!
//! Built around a shared `Value` universe plus a pair of dedicated
//! encode/decode modules, rather than a derive-macro codec: `Value` is
//! dynamically typed so there is no fixed struct shape for `#[derive]` to
//! hang off of, and every major type and tag maps onto one of its variants.
//!
//! ```
//! use cbor_codec::{encode_to_vec, decode_from_slice, Value};
//!
//! let value = Value::array(vec![Value::Int(1), Value::Text("two".into())]);
//! let bytes = encode_to_vec(&value).unwrap();
//! let decoded = decode_from_slice(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod float;
pub mod head;
pub mod io;
pub mod tags;
pub mod value;

pub use decoder::{decode_from_slice, decode_from_slice_with, DecodeOptions, Decoder};
pub use encoder::{encode_to_sink, encode_to_vec, Encoder, EncodeOptions};
pub use error::{DecodeError, EncodeError};
pub use value::Value;
