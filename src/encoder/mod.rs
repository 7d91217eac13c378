//! The encoder: walks a [`Value`], emits canonical or default CBOR bytes,
//! tracks shared containers, and dispatches on the value's own shape
//! (a match over the `Value` enum) rather than a runtime type-handler
//! registry.
//!
//! Internally the encoder always serializes into an owned `Vec<u8>` rather
//! than writing through [`crate::io::ByteSink`] byte-by-byte: canonical
//! map-key ordering and set-member ordering both require measuring the
//! *encoded* form of a value before deciding where it goes, which is far
//! simpler against a buffer that can be sliced and re-ordered than against
//! an arbitrary sink. [`encode_to_sink`] bridges the two once the final
//! bytes are known.

use crate::error::{EncodeError, EncodeResult};
use crate::head;
use crate::io::ByteSink;
use crate::tags::sharing::ContainerIndexes;
use crate::tags::stringref::StringRefEncodeTable;
use crate::tags::{self, bignum, datetime, net};
use crate::value::{ImmutableMap, IpValue, Tag, Value};
use chrono::{DateTime, FixedOffset};
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, trace};

/// Encoder configuration: a struct of independently-toggled options rather
/// than a combinatorial set of encode functions.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// `false` → tag-0 ISO-8601 string, `true` → tag-1 numeric epoch.
    pub datetime_as_timestamp: bool,
    /// If true, a bare `Value::Date` widens to midnight UTC and encodes as
    /// a datetime; if false, encoding a bare date is a `EncodeError::Value`
    /// since the tag table has no dedicated "date only" tag.
    pub date_as_datetime: bool,
    /// Timezone used to localize naive datetimes. This crate's
    /// `Value::DateTime` is always timezone-aware by construction, so naive
    /// datetimes never reach the encoder and this field currently has no
    /// effect; kept so a future caller constructing `Value` from an
    /// external, naive-datetime source has somewhere to plug one in.
    pub default_timezone: Option<FixedOffset>,
    /// `true`: every array/map is marked shareable (tag 28) on first
    /// encounter and a repeat identity becomes a tag-29 back-reference,
    /// which is what makes cyclic graphs encodable at all. `false` (the
    /// default): containers encode as plain, unwrapped CBOR, and a cycle
    /// is a hard `EncodeError` rather than infinite recursion.
    pub value_sharing: bool,
    /// Minimal integer/float widths, deterministic map-key order, minimal
    /// float size.
    pub canonical: bool,
    /// Wrap the top-level value in tag 256 and emit tag-25 references for
    /// repeated strings/byte strings above the size-saving threshold.
    pub string_referencing: bool,
    /// Emit indefinite-length arrays/maps instead of length-prefixed ones.
    /// Ignored when `canonical` is set, since canonical mode requires
    /// deterministic lengths.
    pub indefinite_containers: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            datetime_as_timestamp: false,
            date_as_datetime: false,
            default_timezone: None,
            value_sharing: false,
            canonical: false,
            string_referencing: false,
            indefinite_containers: false,
        }
    }
}

/// Serializes [`Value`]s to CBOR bytes.
pub struct Encoder {
    options: EncodeOptions,
    buf: Vec<u8>,
    containers: ContainerIndexes,
    cycle_guard: HashSet<usize>,
    string_refs: StringRefEncodeTable,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Encoder {
            options,
            buf: Vec::new(),
            containers: ContainerIndexes::new(),
            cycle_guard: HashSet::new(),
            string_refs: StringRefEncodeTable::new(),
        }
    }

    /// Encode one top-level value, returning its bytes. Every piece of
    /// per-encode state is reset first, so reusing an `Encoder` across
    /// multiple top-level calls is indistinguishable from using a fresh one
    /// each time.
    pub fn encode(&mut self, value: &Value) -> EncodeResult<Vec<u8>> {
        debug!(canonical = self.options.canonical, value_sharing = self.options.value_sharing, "encoding top-level value");
        self.buf.clear();
        self.containers = ContainerIndexes::new();
        self.cycle_guard.clear();
        self.string_refs = StringRefEncodeTable::new();

        if self.options.string_referencing {
            self.write_tag_head(tags::STRINGREF_NAMESPACE)?;
            self.string_refs.push_namespace();
            let result = self.encode_value(value);
            self.string_refs.pop_namespace();
            result?;
        } else {
            self.encode_value(value)?;
        }
        Ok(std::mem::take(&mut self.buf))
    }

    fn write_raw(&mut self, bytes: &[u8]) -> EncodeResult<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn write_tag_head(&mut self, tag: u64) -> EncodeResult<()> {
        self.write_raw(&head::encode_length(0xc0, tag))
    }

    /// Encode `value` into a fresh byte range, then lift those bytes back
    /// out of the buffer. Used wherever the encoded *form* of a sub-value
    /// must be inspected before deciding where it goes (canonical map-key
    /// ordering, canonical set-member ordering) without losing any
    /// side-effecting state (container indexes, string-ref table) the
    /// nested encode call established.
    fn encode_to_fragment(&mut self, value: &Value) -> EncodeResult<Vec<u8>> {
        let mark = self.buf.len();
        self.encode_value(value)?;
        Ok(self.buf.split_off(mark))
    }

    fn encode_value(&mut self, value: &Value) -> EncodeResult<()> {
        match value {
            Value::Int(n) => self.encode_int(*n),
            Value::BigInt(b) => self.encode_bigint(b),
            Value::Bytes(bytes) => self.encode_bytes(bytes),
            Value::Text(s) => self.encode_text(s),
            Value::Array(arr) => self.encode_array(arr),
            Value::Map(map) => self.encode_map(map),
            Value::Tag(tag) => self.encode_tag(tag),
            Value::Simple(s) => self.encode_simple(s.value()),
            Value::Float(f) => self.encode_float(*f),
            Value::Bool(b) => self.write_raw(&[if *b { 0xf5 } else { 0xf4 }]),
            Value::Null => self.write_raw(&[0xf6]),
            Value::Undefined => self.write_raw(&[0xf7]),
            Value::Break => Err(EncodeError::value("cannot encode the break sentinel as a value")),
            Value::Date(d) => self.encode_date(*d),
            Value::DateTime(dt) => self.encode_datetime(dt),
            Value::Decimal(d) => self.encode_decimal(d.exponent, &d.mantissa),
            Value::BigFloat(b) => self.encode_bigfloat(b.exponent, &b.mantissa),
            Value::Rational(r) => self.encode_rational(&r.numerator, &r.denominator),
            Value::Regex(r) => self.encode_regex(r.0.as_str()),
            Value::Mime(m) => self.encode_mime(&m.source),
            Value::Uuid(u) => self.encode_uuid(u),
            Value::Ip(ip) => self.encode_ip(ip),
            Value::Set(members) => self.encode_set(members),
            Value::Complex(re, im) => self.encode_complex(*re, *im),
        }
    }

    fn encode_int(&mut self, n: i128) -> EncodeResult<()> {
        if n >= 0 {
            if n <= u64::MAX as i128 {
                self.write_raw(&head::encode_length(0x00, n as u64))
            } else {
                self.encode_bigint(&BigInt::from(n))
            }
        } else {
            let magnitude = -1 - n;
            if magnitude <= u64::MAX as i128 {
                self.write_raw(&head::encode_length(0x20, magnitude as u64))
            } else {
                self.encode_bigint(&BigInt::from(n))
            }
        }
    }

    fn encode_bigint(&mut self, b: &BigInt) -> EncodeResult<()> {
        if b.sign() == Sign::Minus {
            self.write_tag_head(tags::NEG_BIGNUM)?;
            let bytes = bignum::encode_negative(b);
            self.encode_bytes(&bytes)
        } else {
            self.write_tag_head(tags::POS_BIGNUM)?;
            let bytes = bignum::encode_positive(b);
            self.encode_bytes(&bytes)
        }
    }

    fn encode_bytes(&mut self, bytes: &[u8]) -> EncodeResult<()> {
        if self.string_refs.is_active() {
            if let Some(index) = self.string_refs.mark_or_lookup(bytes) {
                if StringRefEncodeTable::should_reference(bytes, index) {
                    trace!(index, "byte string repeat, emitting string-reference");
                    self.write_tag_head(tags::STRINGREF)?;
                    return self.encode_int(index as i128);
                }
            }
        }
        self.write_raw(&head::encode_length(0x40, bytes.len() as u64))?;
        self.write_raw(bytes)
    }

    fn encode_text(&mut self, s: &str) -> EncodeResult<()> {
        let bytes = s.as_bytes();
        if self.string_refs.is_active() {
            if let Some(index) = self.string_refs.mark_or_lookup(bytes) {
                if StringRefEncodeTable::should_reference(bytes, index) {
                    trace!(index, "text string repeat, emitting string-reference");
                    self.write_tag_head(tags::STRINGREF)?;
                    return self.encode_int(index as i128);
                }
            }
        }
        self.write_raw(&head::encode_length(0x60, bytes.len() as u64))?;
        self.write_raw(bytes)
    }

    fn encode_array(&mut self, arr: &Rc<std::cell::RefCell<Vec<Value>>>) -> EncodeResult<()> {
        let identity = Rc::as_ptr(arr) as usize;
        if self.options.value_sharing {
            if let Some(index) = self.containers.mark_or_lookup(identity) {
                trace!(index, "array already shared, emitting back-reference");
                self.write_tag_head(tags::SHAREDREF)?;
                return self.encode_int(index as i128);
            }
            self.write_tag_head(tags::SHAREABLE)?;
            self.encode_array_body(&arr.borrow())
        } else {
            if !self.cycle_guard.insert(identity) {
                return Err(EncodeError::value(
                    "cyclic data structure detected but value sharing is disabled",
                ));
            }
            let result = self.encode_array_body(&arr.borrow());
            self.cycle_guard.remove(&identity);
            result
        }
    }

    fn encode_array_body(&mut self, items: &[Value]) -> EncodeResult<()> {
        if self.options.indefinite_containers && !self.options.canonical {
            self.write_raw(&[head::encode_indefinite_head(0x80)])?;
            for item in items {
                self.encode_value(item)?;
            }
            self.write_raw(&[head::BREAK_BYTE])
        } else {
            self.write_raw(&head::encode_length(0x80, items.len() as u64))?;
            for item in items {
                self.encode_value(item)?;
            }
            Ok(())
        }
    }

    /// A definite-length array with no shareable-container bookkeeping:
    /// used for the synthetic `[exponent, mantissa]`-shaped pairs the
    /// decimal/bigfloat/rational/complex tag handlers build, which never
    /// correspond to a real `Value::Array` the caller could alias.
    fn encode_bare_array(&mut self, items: &[Value]) -> EncodeResult<()> {
        self.write_raw(&head::encode_length(0x80, items.len() as u64))?;
        for item in items {
            self.encode_value(item)?;
        }
        Ok(())
    }

    fn encode_bare_map(&mut self, pairs: &[(Value, Value)]) -> EncodeResult<()> {
        self.write_raw(&head::encode_length(0xa0, pairs.len() as u64))?;
        for (k, v) in pairs {
            self.encode_value(k)?;
            self.encode_value(v)?;
        }
        Ok(())
    }

    fn encode_map(&mut self, map: &Rc<std::cell::RefCell<ImmutableMap>>) -> EncodeResult<()> {
        let identity = Rc::as_ptr(map) as usize;
        if self.options.value_sharing {
            if let Some(index) = self.containers.mark_or_lookup(identity) {
                trace!(index, "map already shared, emitting back-reference");
                self.write_tag_head(tags::SHAREDREF)?;
                return self.encode_int(index as i128);
            }
            self.write_tag_head(tags::SHAREABLE)?;
            self.encode_map_body(&map.borrow())
        } else {
            if !self.cycle_guard.insert(identity) {
                return Err(EncodeError::value(
                    "cyclic data structure detected but value sharing is disabled",
                ));
            }
            let result = self.encode_map_body(&map.borrow());
            self.cycle_guard.remove(&identity);
            result
        }
    }

    fn encode_map_body(&mut self, map: &ImmutableMap) -> EncodeResult<()> {
        if self.options.canonical {
            let mut fragments: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(map.len());
            for (k, v) in map.iter() {
                let kb = self.encode_to_fragment(k)?;
                let vb = self.encode_to_fragment(v)?;
                fragments.push((kb, vb));
            }
            fragments.sort_by(|a, b| a.0.cmp(&b.0));
            self.write_raw(&head::encode_length(0xa0, fragments.len() as u64))?;
            for (k, v) in fragments {
                self.write_raw(&k)?;
                self.write_raw(&v)?;
            }
            Ok(())
        } else if self.options.indefinite_containers {
            self.write_raw(&[head::encode_indefinite_head(0xa0)])?;
            for (k, v) in map.iter() {
                self.encode_value(k)?;
                self.encode_value(v)?;
            }
            self.write_raw(&[head::BREAK_BYTE])
        } else {
            self.write_raw(&head::encode_length(0xa0, map.len() as u64))?;
            for (k, v) in map.iter() {
                self.encode_value(k)?;
                self.encode_value(v)?;
            }
            Ok(())
        }
    }

    fn encode_tag(&mut self, tag: &Tag) -> EncodeResult<()> {
        if tags::has_dedicated_value_variant(tag.tag) {
            return Err(EncodeError::value(format!(
                "tag {} has a dedicated Value variant; construct that instead of a generic Tag",
                tag.tag
            )));
        }
        if tags::is_protocol_only(tag.tag) {
            return Err(EncodeError::value(format!(
                "tag {} is a wire-protocol marker and cannot be emitted as a generic Tag value",
                tag.tag
            )));
        }
        self.write_tag_head(tag.tag)?;
        self.encode_value(&tag.value)
    }

    fn encode_simple(&mut self, n: u8) -> EncodeResult<()> {
        if n <= 19 {
            self.write_raw(&[0xe0 | n])
        } else {
            self.write_raw(&[0xf8, n])
        }
    }

    fn encode_float(&mut self, v: f64) -> EncodeResult<()> {
        if self.options.canonical {
            match crate::float::minimal_encoding(v) {
                crate::float::MinimalFloat::F16(bits) => {
                    self.write_raw(&[0xf9, (bits >> 8) as u8, bits as u8])
                }
                crate::float::MinimalFloat::F32(f) => {
                    self.write_raw(&[0xfa])?;
                    self.write_raw(&f.to_be_bytes())
                }
                crate::float::MinimalFloat::F64(f) => {
                    self.write_raw(&[0xfb])?;
                    self.write_raw(&f.to_be_bytes())
                }
            }
        } else if v.is_nan() {
            self.write_raw(&[0xf9, 0x7e, 0x00])
        } else if v.is_infinite() {
            self.write_raw(if v > 0.0 { &[0xf9, 0x7c, 0x00] } else { &[0xf9, 0xfc, 0x00] })
        } else {
            self.write_raw(&[0xfb])?;
            self.write_raw(&v.to_be_bytes())
        }
    }

    fn encode_date(&mut self, d: chrono::NaiveDate) -> EncodeResult<()> {
        if !self.options.date_as_datetime {
            return Err(EncodeError::value(
                "cannot encode a bare date unless date_as_datetime is enabled",
            ));
        }
        let dt = datetime::date_to_midnight_utc(d);
        self.encode_datetime(&dt)
    }

    fn encode_datetime(&mut self, dt: &DateTime<FixedOffset>) -> EncodeResult<()> {
        if self.options.datetime_as_timestamp {
            self.write_tag_head(tags::DATETIME_EPOCH)?;
            self.encode_int(dt.timestamp() as i128)
        } else {
            self.write_tag_head(tags::DATETIME_STRING)?;
            self.encode_text(&datetime::format_datetime_string(dt))
        }
    }

    fn bigint_to_value(b: &BigInt) -> Value {
        match b.to_i128() {
            Some(n) if n >= -(1i128 << 64) && n < (1i128 << 64) => Value::Int(n),
            _ => Value::BigInt(b.clone()),
        }
    }

    fn encode_decimal(&mut self, exponent: i64, mantissa: &BigInt) -> EncodeResult<()> {
        self.write_tag_head(tags::DECIMAL)?;
        self.encode_bare_array(&[Value::Int(exponent as i128), Self::bigint_to_value(mantissa)])
    }

    fn encode_bigfloat(&mut self, exponent: i64, mantissa: &BigInt) -> EncodeResult<()> {
        self.write_tag_head(tags::BIGFLOAT)?;
        self.encode_bare_array(&[Value::Int(exponent as i128), Self::bigint_to_value(mantissa)])
    }

    fn encode_rational(&mut self, numerator: &BigInt, denominator: &BigInt) -> EncodeResult<()> {
        self.write_tag_head(tags::RATIONAL)?;
        self.encode_bare_array(&[Self::bigint_to_value(numerator), Self::bigint_to_value(denominator)])
    }

    fn encode_regex(&mut self, pattern: &str) -> EncodeResult<()> {
        self.write_tag_head(tags::REGEX)?;
        self.encode_text(pattern)
    }

    fn encode_mime(&mut self, source: &str) -> EncodeResult<()> {
        self.write_tag_head(tags::MIME)?;
        self.encode_text(source)
    }

    fn encode_uuid(&mut self, u: &uuid::Uuid) -> EncodeResult<()> {
        self.write_tag_head(tags::UUID)?;
        self.encode_bytes(u.as_bytes())
    }

    fn encode_ip(&mut self, ip: &IpValue) -> EncodeResult<()> {
        let tag = if net::is_v4(ip) { tags::IPV4_ADDR_OR_NET } else { tags::IPV6_ADDR_OR_NET };
        self.write_tag_head(tag)?;
        match ip {
            IpValue::Address(addr) => self.encode_bytes(&net::addr_octets(*addr)),
            IpValue::Interface(addr, net) => self.encode_bare_array(&[
                Value::Int(net.prefix_len() as i128),
                Value::Bytes(crate::tags::net::addr_octets(*addr)),
            ]),
            IpValue::Network(net) => self.encode_bare_map(&[(
                Value::Bytes(crate::tags::net::addr_octets(net.network())),
                Value::Int(net.prefix_len() as i128),
            )]),
        }
    }

    fn encode_set(&mut self, members: &[Value]) -> EncodeResult<()> {
        self.write_tag_head(tags::SET)?;
        if self.options.canonical {
            let mut fragments: Vec<Vec<u8>> =
                members.iter().map(|m| self.encode_to_fragment(m)).collect::<Result<_, _>>()?;
            fragments.sort();
            self.write_raw(&head::encode_length(0x80, fragments.len() as u64))?;
            for f in fragments {
                self.write_raw(&f)?;
            }
            Ok(())
        } else {
            self.encode_bare_array(members)
        }
    }

    fn encode_complex(&mut self, re: f64, im: f64) -> EncodeResult<()> {
        self.write_tag_head(tags::COMPLEX)?;
        self.encode_bare_array(&[Value::Float(re), Value::Float(im)])
    }
}

/// Encode `value` with default options, returning its bytes directly.
pub fn encode_to_vec(value: &Value) -> EncodeResult<Vec<u8>> {
    Encoder::new(EncodeOptions::default()).encode(value)
}

/// Encode `value` with the given options and write the result through a
/// [`ByteSink`], honoring the byte-sink abstraction at the public boundary
/// even though the encoder buffers internally.
pub fn encode_to_sink<W: ByteSink>(value: &Value, options: EncodeOptions, sink: &mut W) -> EncodeResult<()> {
    let bytes = Encoder::new(options).encode(value)?;
    sink.write(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_small_int() {
        let bytes = encode_to_vec(&Value::Int(1_000_000_000_000)).unwrap();
        assert_eq!(hex::encode(bytes), "1b000000e8d4a51000");
    }

    #[test]
    fn encodes_huge_negative_int_as_bignum() {
        let bytes = Encoder::new(EncodeOptions::default())
            .encode(&Value::BigInt(BigInt::parse_bytes(b"-18446744073709551617", 10).unwrap()))
            .unwrap();
        assert_eq!(hex::encode(bytes), "c349010000000000000000");
    }

    #[test]
    fn encodes_float_non_canonical_as_f64() {
        let bytes = encode_to_vec(&Value::Float(1.1)).unwrap();
        assert_eq!(hex::encode(bytes), "fb3ff199999999999a");
    }

    #[test]
    fn encodes_positive_infinity() {
        let bytes = encode_to_vec(&Value::Float(f64::INFINITY)).unwrap();
        assert_eq!(hex::encode(bytes), "f97c00");
    }

    #[test]
    fn encodes_text() {
        let bytes = encode_to_vec(&Value::Text("IETF".to_string())).unwrap();
        assert_eq!(hex::encode(bytes), "6449455446");
    }

    #[test]
    fn encodes_nested_array() {
        let v = Value::array(vec![
            Value::Int(1),
            Value::array(vec![Value::Int(2), Value::Int(3)]),
            Value::array(vec![Value::Int(4), Value::Int(5)]),
        ]);
        let bytes = encode_to_vec(&v).unwrap();
        assert_eq!(hex::encode(bytes), "8301820203820405");
    }

    #[test]
    fn encodes_cyclic_array_with_sharing() {
        use std::cell::RefCell;
        let inner = Rc::new(RefCell::new(Vec::new()));
        let outer = Rc::new(RefCell::new(vec![Value::Array(inner.clone())]));
        inner.borrow_mut().push(Value::Array(outer.clone()));
        let mut options = EncodeOptions::default();
        options.value_sharing = true;
        let bytes = Encoder::new(options).encode(&Value::Array(outer)).unwrap();
        assert_eq!(hex::encode(bytes), "d81c81d81c81d81d00");
    }

    #[test]
    fn rejects_cycle_when_sharing_disabled() {
        use std::cell::RefCell;
        let inner = Rc::new(RefCell::new(Vec::new()));
        let outer = Rc::new(RefCell::new(vec![Value::Array(inner.clone())]));
        inner.borrow_mut().push(Value::Array(outer.clone()));
        let mut options = EncodeOptions::default();
        options.value_sharing = false;
        let err = Encoder::new(options).encode(&Value::Array(outer));
        assert!(err.is_err());
    }

    #[test]
    fn encodes_uuid() {
        let u = uuid::Uuid::parse_str("5eaffac8-b51e-4805-8127-7fdcc7842faf").unwrap();
        let bytes = encode_to_vec(&Value::Uuid(u)).unwrap();
        assert_eq!(hex::encode(bytes), "d825505eaffac8b51e480581277fdcc7842faf");
    }

    #[test]
    fn encodes_datetime_as_timestamp() {
        let dt = datetime::parse_datetime_string("2013-03-21T20:04:00Z", 0).unwrap();
        let mut options = EncodeOptions::default();
        options.datetime_as_timestamp = true;
        let bytes = Encoder::new(options).encode(&Value::DateTime(dt)).unwrap();
        assert_eq!(hex::encode(bytes), "c11a514b67b0");
    }

    #[test]
    fn encodes_canonical_set() {
        let mut options = EncodeOptions::default();
        options.canonical = true;
        let v = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let bytes = Encoder::new(options).encode(&v).unwrap();
        assert_eq!(hex::encode(bytes), "d9010283010203");
    }

    #[test]
    fn rejects_generic_tag_colliding_with_dedicated_variant() {
        let t = Tag::new(0, Value::Text("x".into()));
        let err = encode_to_vec(&Value::Tag(Box::new(t)));
        assert!(err.is_err());
    }

    #[test]
    fn canonical_map_sorts_by_encoded_key() {
        let mut options = EncodeOptions::default();
        options.canonical = true;
        let v = Value::map(vec![
            (Value::Text("b".into()), Value::Int(1)),
            (Value::Text("a".into()), Value::Int(2)),
        ]);
        let bytes = Encoder::new(options).encode(&v).unwrap();
        // "a" (6161) sorts before "b" (6162) in encoded form.
        assert_eq!(hex::encode(bytes), "a2616102616101");
    }
}
