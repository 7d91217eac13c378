//! Tags 52/54 (current IPv4/IPv6 address, network, or interface) and their
//! legacy counterparts 260/261 (address-only / map-form network), per the
//! spec's built-in tag table. There is no single canonical wire shape for
//! "an IP thing" — the content is inspected structurally:
//!
//! - a byte string of length 4/6/16 is a bare address
//! - `[prefix_length, address]` is an interface (address plus prefix)
//! - a single-entry map `{address: prefix_length}` is a network (legacy
//!   tag 261's own shape, reused here for 52/54 network form too)

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::{IpValue, Value};
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

fn addr_from_bytes(offset: u64, tag: u64, bytes: &[u8]) -> Result<IpAddr, DecodeError> {
    match bytes.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(bytes);
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        n => Err(DecodeError::value(
            offset,
            DecodeValueErrorKind::BadTagPayload {
                tag,
                reason: format!("address must be 4 or 16 bytes, got {n}"),
            },
        )),
    }
}

fn prefix_as_u8(offset: u64, tag: u64, value: &Value) -> Result<u8, DecodeError> {
    match value {
        Value::Int(n) if *n >= 0 && *n <= 128 => Ok(*n as u8),
        _ => Err(DecodeError::value(
            offset,
            DecodeValueErrorKind::BadTagPayload {
                tag,
                reason: "prefix length must be an integer in 0..=128".to_string(),
            },
        )),
    }
}

fn bad_shape(offset: u64, tag: u64) -> DecodeError {
    DecodeError::value(
        offset,
        DecodeValueErrorKind::BadTagPayload {
            tag,
            reason: "unrecognized IP tag content shape".to_string(),
        },
    )
}

pub fn decode_ip(offset: u64, tag: u64, content: &Value) -> Result<IpValue, DecodeError> {
    match content {
        Value::Bytes(bytes) => Ok(IpValue::Address(addr_from_bytes(offset, tag, bytes)?)),
        Value::Array(items) => {
            let items = items.borrow();
            if items.len() != 2 {
                return Err(bad_shape(offset, tag));
            }
            let prefix = prefix_as_u8(offset, tag, &items[0])?;
            let addr = match &items[1] {
                Value::Bytes(b) => addr_from_bytes(offset, tag, b)?,
                _ => return Err(bad_shape(offset, tag)),
            };
            let net = IpNet::new(addr, prefix).map_err(|_| bad_shape(offset, tag))?;
            Ok(IpValue::Interface(addr, net))
        }
        Value::Map(pairs) => {
            let pairs = pairs.borrow();
            if pairs.len() != 1 {
                return Err(bad_shape(offset, tag));
            }
            let (key, value) = &pairs[0];
            let addr = match key {
                Value::Bytes(b) => addr_from_bytes(offset, tag, b)?,
                _ => return Err(bad_shape(offset, tag)),
            };
            let prefix = prefix_as_u8(offset, tag, value)?;
            let net = IpNet::new(addr, prefix).map_err(|_| bad_shape(offset, tag))?;
            Ok(IpValue::Network(net))
        }
        _ => Err(bad_shape(offset, tag)),
    }
}

/// Encode an [`IpValue`] back to its tag content. The caller wraps the
/// result in the appropriate tag number for the address family.
pub fn encode_ip(value: &IpValue) -> Value {
    match value {
        IpValue::Address(addr) => Value::Bytes(addr_octets(*addr)),
        IpValue::Interface(addr, net) => Value::array(vec![
            Value::Int(net.prefix_len() as i128),
            Value::Bytes(addr_octets(*addr)),
        ]),
        IpValue::Network(net) => Value::map(vec![(
            Value::Bytes(addr_octets(net.network())),
            Value::Int(net.prefix_len() as i128),
        )]),
    }
}

pub(crate) fn addr_octets(addr: IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// `true` when the address belongs to the IPv4 family, used to choose
/// between tags 52 and 54 at encode time.
pub fn is_v4(value: &IpValue) -> bool {
    match value {
        IpValue::Address(a) => a.is_ipv4(),
        IpValue::Interface(a, _) => a.is_ipv4(),
        IpValue::Network(n) => n.addr().is_ipv4(),
    }
}
