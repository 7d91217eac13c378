//! Tag 30: rational numbers as `[numerator, denominator]`, normalized to
//! lowest terms with the sign carried on the numerator.

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::Rational;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;

pub fn decode_rational(offset: u64, numerator: BigInt, denominator: BigInt) -> Result<Rational, DecodeError> {
    if denominator == BigInt::from(0) {
        return Err(DecodeError::value(
            offset,
            DecodeValueErrorKind::BadTagPayload {
                tag: crate::tags::RATIONAL,
                reason: "zero denominator".to_string(),
            },
        ));
    }
    let gcd = numerator.gcd(&denominator);
    let (mut numerator, mut denominator) = (numerator / &gcd, denominator / &gcd);
    if denominator.sign() == Sign::Minus {
        numerator = -numerator;
        denominator = -denominator;
    }
    Ok(Rational { numerator, denominator })
}
