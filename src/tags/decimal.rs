//! Tags 4/5: decimal fractions and bigfloats, both `[exponent, mantissa]`
//! pairs where the value is `mantissa * base**exponent` (base 10 for tag 4,
//! base 2 for tag 5).

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::{BigFloat, Decimal};
use num_bigint::BigInt;

pub fn decode_decimal(offset: u64, exponent: i64, mantissa: BigInt) -> Result<Decimal, DecodeError> {
    let _ = offset;
    Ok(Decimal { exponent, mantissa })
}

pub fn decode_bigfloat(offset: u64, exponent: i64, mantissa: BigInt) -> Result<BigFloat, DecodeError> {
    let _ = offset;
    Ok(BigFloat { exponent, mantissa })
}

pub fn validate_pair_len(offset: u64, tag: u64, len: usize) -> Result<(), DecodeError> {
    if len != 2 {
        return Err(DecodeError::value(
            offset,
            DecodeValueErrorKind::BadTagPayload {
                tag,
                reason: format!("expected a 2-element array, got {len}"),
            },
        ));
    }
    Ok(())
}
