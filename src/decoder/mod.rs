//! The decoder: a tokenizer/dispatcher over the head-byte state machine in
//! [`crate::head`], producing a [`Value`] tree (or graph, once tags 28/29
//! are in play).
//!
//! A shareable slot is reserved *before* its children are decoded, so a
//! self-reference among those children resolves to the same, still-being-
//! built container, and `set_shareable` is invoked by the array/map
//! constructors themselves rather than by the tag-28 handler.
//!
//! Every decoding routine threads an explicit `src: &mut SliceSource<'_>`
//! rather than owning one as a field, so the embedded-CBOR tag (24) can
//! recurse into a short-lived source over its own byte string while still
//! sharing this decoder's shareable-value table and string-reference
//! namespace stack with the enclosing call.

use crate::error::{DecodeError, DecodeResult, DecodeValueErrorKind};
use crate::head;
use crate::io::{ByteSource, SliceSource};
use crate::tags::{self, bignum, datetime, decimal, mime, net, rational, regex as regex_tag, set as set_tag, uuid as uuid_tag};
use crate::tags::sharing::ShareableTable;
use crate::tags::stringref::StringRefTable;
use crate::value::{ImmutableMap, SimpleValue, Tag, Value};
use num_bigint::BigInt;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// How to handle a text string whose payload is not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrErrors {
    /// Fail the decode with [`DecodeValueErrorKind::InvalidUtf8`].
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD, matching `String::from_utf8_lossy`.
    Replace,
    /// Drop invalid bytes and keep the rest.
    Ignore,
}

/// A user hook invoked for a tag number this crate has no built-in handler
/// for. Returns the value to substitute for the tag, or an error to abort
/// the decode.
pub type TagHook = Box<dyn Fn(&mut Decoder, u64, Value) -> DecodeResult<Value>>;

/// A user hook invoked on every freshly decoded map, letting a caller turn
/// `{"__class__": ..., ...}`-shaped maps into richer values.
pub type ObjectHook = Box<dyn Fn(&mut Decoder, Value) -> DecodeResult<Value>>;

/// Decoder configuration.
pub struct DecodeOptions {
    pub tag_hook: Option<TagHook>,
    pub object_hook: Option<ObjectHook>,
    pub str_errors: StrErrors,
    /// Maximum container/tag nesting depth. Defaults to 950, chosen
    /// comfortably below the native stack limit a recursive decode could
    /// otherwise exhaust.
    pub max_depth: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            tag_hook: None,
            object_hook: None,
            str_errors: StrErrors::Strict,
            max_depth: 950,
        }
    }
}

/// Walks CBOR bytes into a [`Value`] tree (or graph, under the
/// value-sharing protocol).
pub struct Decoder {
    options: DecodeOptions,
    shareables: ShareableTable,
    share_index: Option<usize>,
    string_refs: StringRefTable,
    depth: u32,
    immutable_depth: u32,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Decoder {
            options,
            shareables: ShareableTable::new(),
            share_index: None,
            string_refs: StringRefTable::new(),
            depth: 0,
            immutable_depth: 0,
        }
    }

    /// `true` while decoding a value that will be used as a map key. Purely
    /// informational for hook authors — this crate's `Value` has no
    /// separate frozen/hashable representation, so nothing here branches
    /// on it.
    pub fn in_immutable_context(&self) -> bool {
        self.immutable_depth > 0
    }

    fn enter_immutable(&mut self) {
        self.immutable_depth += 1;
    }

    fn exit_immutable(&mut self) {
        self.immutable_depth -= 1;
    }

    /// Decode exactly one top-level item from `src`. Resets all per-decode
    /// state first, so reusing a `Decoder` across multiple top-level calls
    /// is indistinguishable from using a fresh one each time — mirroring
    /// `Encoder::encode`'s own reset-on-entry.
    pub fn decode(&mut self, src: &mut SliceSource<'_>) -> DecodeResult<Value> {
        debug!(max_depth = self.options.max_depth, "decoding top-level item");
        self.shareables = ShareableTable::new();
        self.string_refs = StringRefTable::new();
        self.share_index = None;
        self.depth = 0;
        self.immutable_depth = 0;
        self.decode_step(src)
    }

    /// Decode exactly one item from `src`, without resetting decoder state.
    /// Used for every recursive descent (array/map elements, tag payloads,
    /// embedded CBOR) so a child item shares the enclosing call's
    /// shareable-value table and string-reference namespace stack.
    fn decode_step(&mut self, src: &mut SliceSource<'_>) -> DecodeResult<Value> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            let offset = src.position();
            self.depth -= 1;
            return Err(DecodeError::DepthExceeded {
                offset,
                max_depth: self.options.max_depth,
            });
        }
        let result = self.decode_inner(src);
        self.depth -= 1;
        result
    }

    fn decode_inner(&mut self, src: &mut SliceSource<'_>) -> DecodeResult<Value> {
        let offset = src.position();
        let head = head::read_head(src)?;
        trace!(offset, major = head.major, subtype = head.subtype, "read head");
        match head.major {
            head::MAJOR_UINT => {
                let n = head::decode_length(src, head.subtype, false)?.unwrap();
                Ok(Value::Int(n as i128))
            }
            head::MAJOR_NEGINT => {
                let n = head::decode_length(src, head.subtype, false)?.unwrap();
                Ok(Value::Int(-1 - n as i128))
            }
            head::MAJOR_BYTES => self.decode_bytes(src, head.subtype),
            head::MAJOR_TEXT => self.decode_text(src, head.subtype, offset),
            head::MAJOR_ARRAY => {
                let len = head::decode_length(src, head.subtype, true)?;
                self.decode_array_value(src, len)
            }
            head::MAJOR_MAP => {
                let len = head::decode_length(src, head.subtype, true)?;
                self.decode_map_value(src, len)
            }
            head::MAJOR_TAG => self.decode_tag(src, head.subtype, offset),
            head::MAJOR_SPECIAL => self.decode_special(src, head.subtype, offset),
            _ => unreachable!("major type is a 3-bit field, 0..=7"),
        }
    }

    /// Claim the next shareable slot for whatever container this call's
    /// result ends up being, mirroring `set_shareable` in the reference
    /// decoder. A value filled here is a clone of the `Rc`, not a deep
    /// copy: later mutation of the container (as it's populated) is visible
    /// through the slot too.
    ///
    /// Takes `share_index` rather than just reading it: the index is only
    /// meant for the *immediate* child of a tag-28 wrapper, and clearing it
    /// here keeps a nested array/map further down the tree from claiming
    /// the same slot.
    fn set_shareable(&mut self, value: &Value) {
        if let Some(index) = self.share_index.take() {
            trace!(index, "filling shareable slot with container identity");
            self.shareables.fill(index, value.clone());
        }
    }

    fn decode_bytes(&mut self, src: &mut SliceSource<'_>, subtype: u8) -> DecodeResult<Value> {
        let len = head::decode_length(src, subtype, true)?;
        let bytes = match len {
            Some(n) => src.read_borrowed(n as usize)?.to_vec(),
            None => self.decode_indefinite_chunks(src, head::MAJOR_BYTES)?,
        };
        let value = Value::Bytes(bytes);
        self.string_refs.record(&value);
        Ok(value)
    }

    fn decode_text(&mut self, src: &mut SliceSource<'_>, subtype: u8, offset: u64) -> DecodeResult<Value> {
        let len = head::decode_length(src, subtype, true)?;
        let bytes = match len {
            Some(n) => src.read_borrowed(n as usize)?.to_vec(),
            None => self.decode_indefinite_chunks(src, head::MAJOR_TEXT)?,
        };
        let text = self.bytes_to_string(bytes, offset)?;
        let value = Value::Text(text);
        self.string_refs.record(&value);
        Ok(value)
    }

    /// Concatenate the chunks of an indefinite-length byte/text string.
    /// Each chunk must be a definite-length item of the same major type;
    /// the terminator is the ordinary `break` byte (`0xff`).
    fn decode_indefinite_chunks(&mut self, src: &mut SliceSource<'_>, major: u8) -> DecodeResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let child_offset = src.position();
            let child_head = head::read_head(src)?;
            if child_head.major == head::MAJOR_SPECIAL && child_head.subtype == head::INDEFINITE {
                break;
            }
            if child_head.major != major {
                return Err(DecodeError::value(
                    child_offset,
                    DecodeValueErrorKind::NonMatchingIndefiniteChild,
                ));
            }
            let child_len = head::decode_length(src, child_head.subtype, false)?
                .expect("definite length, allow_indefinite=false");
            out.extend_from_slice(src.read_borrowed(child_len as usize)?);
        }
        Ok(out)
    }

    fn bytes_to_string(&self, bytes: Vec<u8>, offset: u64) -> DecodeResult<String> {
        match String::from_utf8(bytes) {
            Ok(s) => Ok(s),
            Err(e) => match self.options.str_errors {
                StrErrors::Strict => Err(DecodeError::value(offset, DecodeValueErrorKind::InvalidUtf8)),
                StrErrors::Replace => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
                StrErrors::Ignore => Ok(drop_invalid_utf8(e.as_bytes())),
            },
        }
    }

    fn decode_array_value(&mut self, src: &mut SliceSource<'_>, len: Option<u64>) -> DecodeResult<Value> {
        let items = Rc::new(RefCell::new(Vec::new()));
        self.set_shareable(&Value::Array(items.clone()));
        match len {
            Some(n) => {
                for _ in 0..n {
                    let item = self.decode_step(src)?;
                    items.borrow_mut().push(item);
                }
            }
            None => loop {
                let item = self.decode_step(src)?;
                if item.is_break() {
                    break;
                }
                items.borrow_mut().push(item);
            },
        }
        Ok(Value::Array(items))
    }

    fn decode_map_value(&mut self, src: &mut SliceSource<'_>, len: Option<u64>) -> DecodeResult<Value> {
        let pairs = Rc::new(RefCell::new(ImmutableMap::new()));
        self.set_shareable(&Value::Map(pairs.clone()));
        match len {
            Some(n) => {
                for _ in 0..n {
                    self.enter_immutable();
                    let key = self.decode_step(src);
                    self.exit_immutable();
                    let key = key?;
                    let value = self.decode_step(src)?;
                    pairs.borrow_mut().0.push((key, value));
                }
            }
            None => loop {
                self.enter_immutable();
                let key = self.decode_step(src);
                self.exit_immutable();
                let key = key?;
                if key.is_break() {
                    break;
                }
                let value = self.decode_step(src)?;
                pairs.borrow_mut().0.push((key, value));
            },
        }
        let result = Value::Map(pairs);
        self.run_object_hook(result)
    }

    fn run_object_hook(&mut self, value: Value) -> DecodeResult<Value> {
        if let Some(hook) = self.options.object_hook.take() {
            let result = hook(self, value);
            self.options.object_hook = Some(hook);
            result
        } else {
            Ok(value)
        }
    }

    fn decode_special(&mut self, src: &mut SliceSource<'_>, subtype: u8, offset: u64) -> DecodeResult<Value> {
        match subtype {
            0..=19 => Ok(Value::Simple(SimpleValue::new(subtype).expect("0..=19 always valid"))),
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            23 => Ok(Value::Undefined),
            24 => {
                let n = src.read(1)?[0];
                SimpleValue::new(n)
                    .map(Value::Simple)
                    .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::UnknownIntegerSubtype(n)))
            }
            25 => {
                let b = src.read(2)?;
                let bits = u16::from_be_bytes([b[0], b[1]]);
                Ok(Value::Float(half::f16::from_bits(bits).to_f64()))
            }
            26 => {
                let b = src.read(4)?;
                let mut arr = [0u8; 4];
                arr.copy_from_slice(b);
                Ok(Value::Float(f32::from_be_bytes(arr) as f64))
            }
            27 => {
                let b = src.read(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                Ok(Value::Float(f64::from_be_bytes(arr)))
            }
            INDEFINITE_BREAK => Ok(Value::Break),
            _ => unreachable!("reserved subtypes are rejected in read_head"),
        }
    }

    fn decode_tag(&mut self, src: &mut SliceSource<'_>, subtype: u8, offset: u64) -> DecodeResult<Value> {
        let tag_num = head::decode_length(src, subtype, false)?.unwrap();
        match tag_num {
            tags::DATETIME_STRING => {
                let inner = self.decode_step(src)?;
                let s = expect_text(inner, offset, tag_num)?;
                Ok(Value::DateTime(datetime::parse_datetime_string(&s, offset)?))
            }
            tags::DATETIME_EPOCH => {
                let inner = self.decode_step(src)?;
                let seconds = expect_number(&inner, offset, tag_num)?;
                Ok(Value::DateTime(datetime::epoch_to_datetime(seconds, offset)?))
            }
            tags::POS_BIGNUM => {
                let inner = self.decode_step(src)?;
                let bytes = expect_bytes(inner, offset, tag_num)?;
                Ok(Value::BigInt(bignum::decode_positive(&bytes)))
            }
            tags::NEG_BIGNUM => {
                let inner = self.decode_step(src)?;
                let bytes = expect_bytes(inner, offset, tag_num)?;
                Ok(Value::BigInt(bignum::decode_negative(&bytes)))
            }
            tags::DECIMAL => {
                let inner = self.decode_step(src)?;
                let (exponent, mantissa) = self.decode_exp_mantissa_pair(inner, offset, tag_num)?;
                Ok(Value::Decimal(decimal::decode_decimal(offset, exponent, mantissa)?))
            }
            tags::BIGFLOAT => {
                let inner = self.decode_step(src)?;
                let (exponent, mantissa) = self.decode_exp_mantissa_pair(inner, offset, tag_num)?;
                Ok(Value::BigFloat(decimal::decode_bigfloat(offset, exponent, mantissa)?))
            }
            tags::EMBEDDED_CBOR => {
                let inner = self.decode_step(src)?;
                let bytes = expect_bytes(inner, offset, tag_num)?;
                self.decode_embedded(&bytes)
            }
            tags::SHAREABLE => self.decode_shareable(src),
            tags::SHAREDREF => {
                let inner = self.decode_step(src)?;
                let index = expect_uint(&inner, offset, tag_num)?;
                trace!(index, "resolving shared-value back-reference");
                self.shareables.resolve(index, offset)
            }
            tags::RATIONAL => {
                let inner = self.decode_step(src)?;
                let (numerator, denominator) = self.decode_bigint_pair(inner, offset, tag_num)?;
                Ok(Value::Rational(rational::decode_rational(offset, numerator, denominator)?))
            }
            tags::REGEX => {
                let inner = self.decode_step(src)?;
                let pattern = expect_text(inner, offset, tag_num)?;
                Ok(Value::Regex(regex_tag::decode_regex(offset, &pattern)?))
            }
            tags::MIME => {
                let inner = self.decode_step(src)?;
                let source = expect_text(inner, offset, tag_num)?;
                Ok(Value::Mime(mime::decode_mime(source)))
            }
            tags::UUID => {
                let inner = self.decode_step(src)?;
                let bytes = expect_bytes(inner, offset, tag_num)?;
                Ok(Value::Uuid(uuid_tag::decode_uuid(offset, &bytes)?))
            }
            tags::IPV4_ADDR_OR_NET | tags::IPV6_ADDR_OR_NET | tags::LEGACY_IP | tags::LEGACY_IP_NETWORK => {
                let inner = self.decode_step(src)?;
                Ok(Value::Ip(net::decode_ip(offset, tag_num, &inner)?))
            }
            tags::SET => {
                let inner = self.decode_step(src)?;
                let items = expect_array(inner, offset, tag_num)?;
                Ok(set_tag::decode_set(items))
            }
            tags::STRINGREF_NAMESPACE => {
                self.string_refs.push_namespace();
                let result = self.decode_step(src);
                self.string_refs.pop_namespace();
                result
            }
            tags::STRINGREF => {
                let inner = self.decode_step(src)?;
                let index = expect_uint(&inner, offset, tag_num)?;
                self.string_refs.resolve(index, offset)
            }
            tags::COMPLEX => {
                let inner = self.decode_step(src)?;
                let items = expect_array(inner, offset, tag_num)?;
                decimal::validate_pair_len(offset, tag_num, items.len())?;
                let re = expect_number(&items[0], offset, tag_num)?;
                let im = expect_number(&items[1], offset, tag_num)?;
                Ok(Value::Complex(re, im))
            }
            tags::SELF_DESCRIBE => self.decode_step(src),
            _ => {
                let inner = self.decode_step(src)?;
                if let Some(hook) = self.options.tag_hook.take() {
                    let result = hook(self, tag_num, inner);
                    self.options.tag_hook = Some(hook);
                    result
                } else {
                    Ok(Value::Tag(Box::new(Tag::new(tag_num, inner))))
                }
            }
        }
    }

    /// Tag 28: reserve a shareable slot, then decode the tagged value. The
    /// container constructors (`decode_array_value`/`decode_map_value`)
    /// fill the slot themselves via `set_shareable` as soon as the
    /// container identity exists, which is what lets a cycle among this
    /// value's own children resolve correctly.
    fn decode_shareable(&mut self, src: &mut SliceSource<'_>) -> DecodeResult<Value> {
        let previous = self.share_index.take();
        let index = self.shareables.reserve();
        trace!(index, "reserved shareable slot");
        self.share_index = Some(index);
        let result = self.decode_step(src);
        self.share_index = previous;
        let value = result?;
        // Non-container values (an int, a string, a tag...) never call
        // `set_shareable` themselves; fill the slot here so a later
        // back-reference still resolves.
        self.shareables.fill(index, value.clone());
        Ok(value)
    }

    /// Decode embedded CBOR (tag 24): the byte string's content is itself
    /// one CBOR item, decoded against a fresh source but the same
    /// shareable/string-reference scope as the enclosing call.
    fn decode_embedded(&mut self, bytes: &[u8]) -> DecodeResult<Value> {
        let mut nested = SliceSource::new(bytes);
        let inner = self.decode_step(&mut nested)?;
        Ok(Value::Tag(Box::new(Tag::new(tags::EMBEDDED_CBOR, inner))))
    }

    fn decode_exp_mantissa_pair(&self, content: Value, offset: u64, tag: u64) -> DecodeResult<(i64, BigInt)> {
        let items = expect_array(content, offset, tag)?;
        decimal::validate_pair_len(offset, tag, items.len())?;
        let exponent = expect_i64(&items[0], offset, tag)?;
        let mantissa = expect_bigint(items[1].clone(), offset, tag)?;
        Ok((exponent, mantissa))
    }

    fn decode_bigint_pair(&self, content: Value, offset: u64, tag: u64) -> DecodeResult<(BigInt, BigInt)> {
        let items = expect_array(content, offset, tag)?;
        decimal::validate_pair_len(offset, tag, items.len())?;
        let a = expect_bigint(items[0].clone(), offset, tag)?;
        let b = expect_bigint(items[1].clone(), offset, tag)?;
        Ok((a, b))
    }
}

const INDEFINITE_BREAK: u8 = head::INDEFINITE;

fn bad_payload(offset: u64, tag: u64, reason: &str) -> DecodeError {
    DecodeError::value(
        offset,
        DecodeValueErrorKind::BadTagPayload {
            tag,
            reason: reason.to_string(),
        },
    )
}

fn expect_bytes(value: Value, offset: u64, tag: u64) -> DecodeResult<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(bad_payload(offset, tag, "expected a byte string")),
    }
}

fn expect_text(value: Value, offset: u64, tag: u64) -> DecodeResult<String> {
    match value {
        Value::Text(s) => Ok(s),
        _ => Err(bad_payload(offset, tag, "expected a text string")),
    }
}

fn expect_array(value: Value, offset: u64, tag: u64) -> DecodeResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        _ => Err(bad_payload(offset, tag, "expected an array")),
    }
}

fn expect_uint(value: &Value, offset: u64, tag: u64) -> DecodeResult<u64> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(*n as u64),
        _ => Err(bad_payload(offset, tag, "expected a non-negative integer")),
    }
}

fn expect_number(value: &Value, offset: u64, tag: u64) -> DecodeResult<f64> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        _ => Err(bad_payload(offset, tag, "expected a number")),
    }
}

fn expect_bigint(value: Value, offset: u64, tag: u64) -> DecodeResult<BigInt> {
    match value {
        Value::Int(n) => Ok(BigInt::from(n)),
        Value::BigInt(b) => Ok(b),
        _ => Err(bad_payload(offset, tag, "expected an integer")),
    }
}

fn expect_i64(value: &Value, offset: u64, tag: u64) -> DecodeResult<i64> {
    match value {
        Value::Int(n) => i64::try_from(*n).map_err(|_| bad_payload(offset, tag, "exponent out of range")),
        _ => Err(bad_payload(offset, tag, "expected an integer exponent")),
    }
}

/// `StrErrors::Ignore`: walk the byte string, keeping every valid UTF-8 run
/// and silently dropping each invalid byte sequence in between.
fn drop_invalid_utf8(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                out.push_str(std::str::from_utf8(&rest[..valid_up_to]).expect("checked by valid_up_to"));
                let skip = e.error_len().unwrap_or(rest.len() - valid_up_to).max(1);
                rest = &rest[valid_up_to + skip..];
            }
        }
    }
    out
}

/// Decode a single top-level CBOR item from `bytes` with default options.
pub fn decode_from_slice(bytes: &[u8]) -> DecodeResult<Value> {
    decode_from_slice_with(bytes, DecodeOptions::default())
}

/// Decode a single top-level CBOR item from `bytes` with the given options.
pub fn decode_from_slice_with(bytes: &[u8], options: DecodeOptions) -> DecodeResult<Value> {
    let mut decoder = Decoder::new(options);
    let mut src = SliceSource::new(bytes);
    decoder.decode(&mut src)
}
