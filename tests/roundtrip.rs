use cbor_codec::decoder::{decode_from_slice, decode_from_slice_with, DecodeOptions};
use cbor_codec::encoder::{encode_to_vec, Encoder, EncodeOptions};
use cbor_codec::value::Value;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| Value::Int(n as i128)),
        any::<f64>().prop_filter("finite only, NaN/inf have documented equivalences", |f| f.is_finite())
            .prop_map(Value::Float),
        ".*".prop_map(Value::Text),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::array),
            proptest::collection::vec((inner.clone(), inner), 0..8).prop_map(Value::map),
        ]
    })
}

proptest! {
    #[test]
    fn round_trip_default_mode(v in arb_value()) {
        let bytes = encode_to_vec(&v).unwrap();
        let decoded = decode_from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn round_trip_canonical_mode(v in arb_value()) {
        let mut options = EncodeOptions::default();
        options.canonical = true;
        let bytes = Encoder::new(options).encode(&v).unwrap();
        let decoded = decode_from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn canonical_encoding_is_idempotent(v in arb_value()) {
        let mut options = EncodeOptions::default();
        options.canonical = true;
        let first = Encoder::new(options.clone()).encode(&v).unwrap();
        let decoded = decode_from_slice(&first).unwrap();
        let second = Encoder::new(options).encode(&decoded).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn indefinite_containers_decode_to_the_same_value(v in arb_value()) {
        let mut options = EncodeOptions::default();
        options.indefinite_containers = true;
        let bytes = Encoder::new(options).encode(&v).unwrap();
        let decoded = decode_from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn string_referencing_decodes_to_the_same_value(v in arb_value()) {
        let mut options = EncodeOptions::default();
        options.string_referencing = true;
        let bytes = Encoder::new(options).encode(&v).unwrap();
        let decoded = decode_from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, v);
    }
}

#[test]
fn canonical_map_key_sort_orders_by_encoded_bytes() {
    let mut options = EncodeOptions::default();
    options.canonical = true;
    let v = Value::map(vec![
        (Value::Text("b".into()), Value::Int(1)),
        (Value::Text("a".into()), Value::Int(2)),
        (Value::Int(10), Value::Int(3)),
        (Value::Int(-1), Value::Int(4)),
    ]);
    let bytes = Encoder::new(options).encode(&v).unwrap();
    let decoded = decode_from_slice(&bytes).unwrap();
    match decoded {
        Value::Map(pairs) => {
            let keys: Vec<Value> = pairs.borrow().iter().map(|(k, _)| k.clone()).collect();
            // encoded key order: int 10 (0x0a) < int -1 (0x20) < "a" (0x61 61) < "b" (0x61 62)
            assert_eq!(keys, vec![Value::Int(10), Value::Int(-1), Value::Text("a".into()), Value::Text("b".into())]);
        }
        _ => panic!("expected map"),
    }
}

#[test]
fn minimal_integer_widths_under_canonical_mode() {
    let mut options = EncodeOptions::default();
    options.canonical = true;
    // 23 fits the head byte itself (one byte total); 24 needs a one-byte length extension.
    assert_eq!(Encoder::new(options.clone()).encode(&Value::Int(23)).unwrap().len(), 1);
    assert_eq!(Encoder::new(options).encode(&Value::Int(24)).unwrap().len(), 2);
}

#[test]
fn canonical_float_uses_minimal_width_that_round_trips() {
    let mut options = EncodeOptions::default();
    options.canonical = true;
    // 1.5 is exactly representable in half precision: 3 bytes total (head + 2).
    let bytes = Encoder::new(options).encode(&Value::Float(1.5)).unwrap();
    assert_eq!(bytes.len(), 3);
    assert_eq!(decode_from_slice(&bytes).unwrap(), Value::Float(1.5));
}

#[test]
fn cycle_is_rejected_when_sharing_disabled() {
    let inner = Rc::new(RefCell::new(Vec::new()));
    let outer = Rc::new(RefCell::new(vec![Value::Array(inner.clone())]));
    inner.borrow_mut().push(Value::Array(outer.clone()));
    let options = EncodeOptions::default();
    assert!(Encoder::new(options).encode(&Value::Array(outer)).is_err());
}

#[test]
fn cycle_round_trips_with_sharing_enabled() {
    let inner = Rc::new(RefCell::new(Vec::new()));
    let outer = Rc::new(RefCell::new(vec![Value::Array(inner.clone())]));
    inner.borrow_mut().push(Value::Array(outer.clone()));
    let mut options = EncodeOptions::default();
    options.value_sharing = true;
    let bytes = Encoder::new(options).encode(&Value::Array(outer.clone())).unwrap();
    let decoded = decode_from_slice(&bytes).unwrap();
    match decoded {
        Value::Array(decoded_outer) => match &decoded_outer.borrow()[0] {
            Value::Array(decoded_inner) => match &decoded_inner.borrow()[0] {
                Value::Array(back) => assert!(Rc::ptr_eq(back, &decoded_outer)),
                _ => panic!("expected array"),
            },
            _ => panic!("expected array"),
        },
        _ => panic!("expected array"),
    }
}

#[test]
fn depth_guard_rejects_nesting_past_max_depth() {
    let mut bytes = vec![0x81u8; 1000];
    bytes.push(0x00);
    assert!(decode_from_slice(&bytes).is_err());
}

#[test]
fn depth_guard_accepts_nesting_within_a_raised_max_depth() {
    let mut bytes = vec![0x81u8; 1000];
    bytes.push(0x00);
    let mut options = DecodeOptions::default();
    options.max_depth = 2000;
    assert!(decode_from_slice_with(&bytes, options).is_ok());
}

#[test]
fn reuse_isolation_encoder_matches_fresh_instance() {
    let v = Value::array(vec![Value::Int(1), Value::Text("x".into())]);
    let mut reused = Encoder::new(EncodeOptions::default());
    let _ = reused.encode(&Value::Int(999)).unwrap();
    let second = reused.encode(&v).unwrap();
    let fresh = Encoder::new(EncodeOptions::default()).encode(&v).unwrap();
    assert_eq!(second, fresh);
}

#[test]
fn reuse_isolation_decoder_matches_fresh_instance() {
    use cbor_codec::decoder::Decoder;
    use cbor_codec::io::SliceSource;

    let first_bytes = hex::decode("d81c81d81c81d81d00").unwrap();
    let second_bytes = hex::decode("83010203").unwrap();

    let mut reused = Decoder::new(DecodeOptions::default());
    let mut src1 = SliceSource::new(&first_bytes);
    reused.decode(&mut src1).unwrap();
    let mut src2 = SliceSource::new(&second_bytes);
    let reused_result = reused.decode(&mut src2).unwrap();

    let fresh_result = decode_from_slice(&second_bytes).unwrap();
    assert_eq!(reused_result, fresh_result);
}
