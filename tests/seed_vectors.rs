use cbor_codec::decoder::decode_from_slice;
use cbor_codec::encoder::{encode_to_vec, Encoder, EncodeOptions};
use cbor_codec::error::DecodeError;
use cbor_codec::value::{IpValue, Value};
use num_bigint::BigInt;
use std::cell::RefCell;
use std::rc::Rc;

fn hex_of(value: &Value) -> String {
    hex::encode(encode_to_vec(value).unwrap())
}

#[test]
fn integer_1000000000000() {
    assert_eq!(hex_of(&Value::Int(1_000_000_000_000)), "1b000000e8d4a51000");
    assert_eq!(decode_from_slice(&hex::decode("1b000000e8d4a51000").unwrap()).unwrap(), Value::Int(1_000_000_000_000));
}

#[test]
fn negative_two_to_the_64_minus_1() {
    let v = Value::BigInt(BigInt::parse_bytes(b"-18446744073709551617", 10).unwrap());
    assert_eq!(hex_of(&v), "c349010000000000000000");
    assert_eq!(decode_from_slice(&hex::decode("c349010000000000000000").unwrap()).unwrap(), v);
}

#[test]
fn float_1_1() {
    assert_eq!(hex_of(&Value::Float(1.1)), "fb3ff199999999999a");
}

#[test]
fn float_positive_infinity() {
    assert_eq!(hex_of(&Value::Float(f64::INFINITY)), "f97c00");
}

#[test]
fn text_ietf() {
    let v = Value::Text("IETF".to_string());
    assert_eq!(hex_of(&v), "6449455446");
    assert_eq!(decode_from_slice(&hex::decode("6449455446").unwrap()).unwrap(), v);
}

#[test]
fn nested_array() {
    let v = Value::array(vec![
        Value::Int(1),
        Value::array(vec![Value::Int(2), Value::Int(3)]),
        Value::array(vec![Value::Int(4), Value::Int(5)]),
    ]);
    assert_eq!(hex_of(&v), "8301820203820405");
    assert_eq!(decode_from_slice(&hex::decode("8301820203820405").unwrap()).unwrap(), v);
}

#[test]
fn cyclic_array_with_sharing_on() {
    let inner = Rc::new(RefCell::new(Vec::new()));
    let outer = Rc::new(RefCell::new(vec![Value::Array(inner.clone())]));
    inner.borrow_mut().push(Value::Array(outer.clone()));
    let mut options = EncodeOptions::default();
    options.value_sharing = true;
    let bytes = Encoder::new(options).encode(&Value::Array(outer)).unwrap();
    assert_eq!(hex::encode(&bytes), "d81c81d81c81d81d00");

    let decoded = decode_from_slice(&bytes).unwrap();
    match &decoded {
        Value::Array(outer) => match &outer.borrow()[0] {
            Value::Array(inner) => match &inner.borrow()[0] {
                Value::Array(back) => assert!(Rc::ptr_eq(back, outer)),
                _ => panic!("expected array"),
            },
            _ => panic!("expected array"),
        },
        _ => panic!("expected array"),
    }
}

#[test]
fn uuid() {
    let u = uuid::Uuid::parse_str("5eaffac8-b51e-4805-8127-7fdcc7842faf").unwrap();
    let v = Value::Uuid(u);
    assert_eq!(hex_of(&v), "d825505eaffac8b51e480581277fdcc7842faf");
    assert_eq!(decode_from_slice(&hex::decode("d825505eaffac8b51e480581277fdcc7842faf").unwrap()).unwrap(), v);
}

#[test]
fn datetime_as_timestamp() {
    let dt = cbor_codec::tags::datetime::parse_datetime_string("2013-03-21T20:04:00Z", 0).unwrap();
    let mut options = EncodeOptions::default();
    options.datetime_as_timestamp = true;
    let bytes = Encoder::new(options).encode(&Value::DateTime(dt)).unwrap();
    assert_eq!(hex::encode(&bytes), "c11a514b67b0");
    match decode_from_slice(&bytes).unwrap() {
        Value::DateTime(decoded) => assert_eq!(decoded.timestamp(), 1363896240),
        _ => panic!("expected datetime"),
    }
}

#[test]
fn canonical_set() {
    let mut options = EncodeOptions::default();
    options.canonical = true;
    let v = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let bytes = Encoder::new(options).encode(&v).unwrap();
    assert_eq!(hex::encode(&bytes), "d9010283010203");
    assert_eq!(decode_from_slice(&bytes).unwrap(), v);
}

#[test]
fn decode_failure_reserved_subtype() {
    let err = decode_from_slice(&hex::decode("1c").unwrap()).unwrap_err();
    assert!(matches!(err, DecodeError::Value { .. }));
}

#[test]
fn decode_failure_indefinite_bytestring_non_matching_child() {
    assert!(decode_from_slice(&hex::decode("5f01ff").unwrap()).is_err());
}

#[test]
fn decode_failure_shared_ref_not_found() {
    let err = decode_from_slice(&hex::decode("d81d05").unwrap()).unwrap_err();
    assert!(matches!(err, DecodeError::Value { .. }));
}

#[test]
fn decode_failure_oversized_length_without_allocating() {
    // bytestring head claiming length 0x8000_0000_0000_0000 with no payload bytes
    let bytes = hex::decode("5b8000000000000000").unwrap();
    assert!(decode_from_slice(&bytes).is_err());
}

#[test]
fn decode_failure_depth_exceeded_with_default_max_depth() {
    let mut bytes = vec![0x81u8; 1000];
    bytes.push(0x00);
    let err = decode_from_slice(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::DepthExceeded { .. }));
}

#[test]
fn ip_network_round_trips() {
    let net: ipnet::IpNet = "10.0.0.0/24".parse().unwrap();
    let v = Value::Ip(IpValue::Network(net));
    let bytes = encode_to_vec(&v).unwrap();
    assert_eq!(decode_from_slice(&bytes).unwrap(), v);
}

#[test]
fn ip_address_round_trips() {
    let v = Value::Ip(IpValue::Address(std::net::IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 1))));
    let bytes = encode_to_vec(&v).unwrap();
    assert_eq!(decode_from_slice(&bytes).unwrap(), v);
}
