//! Tags 2/3: arbitrary-precision integers carried as big-endian byte
//! strings.

use num_bigint::{BigInt, Sign};

/// Minimal big-endian magnitude bytes for a positive bignum (tag 2), no
/// leading zero byte unless the value itself is zero.
pub fn encode_positive(value: &BigInt) -> Vec<u8> {
    let (_, bytes) = value.to_bytes_be();
    if bytes.is_empty() {
        vec![0]
    } else {
        bytes
    }
}

/// Tag 3 stores `-1 - value` as a positive magnitude.
pub fn encode_negative(value: &BigInt) -> Vec<u8> {
    let magnitude = -(value + BigInt::from(1));
    encode_positive(&magnitude)
}

pub fn decode_positive(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

pub fn decode_negative(bytes: &[u8]) -> BigInt {
    -(decode_positive(bytes) + BigInt::from(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_positive() {
        let v = BigInt::from(18446744073709551616u128); // 2^64
        let bytes = encode_positive(&v);
        assert_eq!(decode_positive(&bytes), v);
    }

    #[test]
    fn round_trip_negative() {
        let v = BigInt::parse_bytes(b"-18446744073709551617", 10).unwrap(); // -2^64-1
        let bytes = encode_negative(&v);
        assert_eq!(decode_negative(&bytes), v);
    }

    #[test]
    fn zero_encodes_as_single_zero_byte() {
        assert_eq!(encode_positive(&BigInt::from(0)), vec![0]);
    }
}
