// ===============================
// src/tick.rs (32nds price codec)
// ===============================
//
// Treasury prices are quoted as `<handle>-<32nds><frac>`:
//   99-16+  -> 99 + (16*8 + 4)/256 = 99.515625
//   100-027 -> 100 + (2*8 + 7)/256
// `frac` is the eighth of a 32nd (0..=7), `+` being exactly 4/8.
//
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::DeskError;

/// Grid points per price point (32 * 8).
pub const TICKS_PER_POINT: i64 = 256;

/// One 32nd of a point, the crossing tolerance of the algo engine.
pub fn one_32nd() -> Decimal {
    Decimal::ONE / Decimal::from(32)
}

/// Decode a fractional tick price into a decimal.
pub fn decode(text: &str) -> Result<Decimal, DeskError> {
    let text = text.trim();
    let (handle, frac) = text
        .split_once('-')
        .ok_or_else(|| DeskError::parse(format!("tick price {text:?} has no '-'")))?;

    let handle = Decimal::from_str(handle.trim())
        .map_err(|e| DeskError::parse(format!("tick price {text:?}: bad handle ({e})")))?;

    let bytes = frac.as_bytes();
    if bytes.len() != 3 {
        return Err(DeskError::parse(format!(
            "tick price {text:?}: expected two 32nds digits and one fraction char"
        )));
    }
    if !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return Err(DeskError::parse(format!("tick price {text:?}: 32nds not numeric")));
    }
    let thirty_seconds = i64::from(bytes[0] - b'0') * 10 + i64::from(bytes[1] - b'0');
    if thirty_seconds > 31 {
        return Err(DeskError::Range(format!(
            "tick price {text:?}: {thirty_seconds} is not in 0..=31"
        )));
    }

    let eighths = match bytes[2] {
        b'+' => 4,
        b @ b'0'..=b'9' => i64::from(b - b'0'),
        _ => {
            return Err(DeskError::parse(format!(
                "tick price {text:?}: fraction must be a digit or '+'"
            )))
        }
    };
    if eighths > 7 {
        return Err(DeskError::Range(format!(
            "tick price {text:?}: eighths {eighths} is not in 0..=7"
        )));
    }

    Ok(handle + Decimal::from(thirty_seconds * 8 + eighths) / Decimal::from(TICKS_PER_POINT))
}

/// Encode a grid-aligned decimal price. Off-grid and negative prices are refused,
/// never rounded.
pub fn encode(price: Decimal) -> Result<String, DeskError> {
    if price < Decimal::ZERO {
        return Err(DeskError::Range(format!("{price} is negative")));
    }
    let scaled = price * Decimal::from(TICKS_PER_POINT);
    if !scaled.fract().is_zero() {
        return Err(DeskError::Range(format!("{price} is not on the 1/256 grid")));
    }
    let ticks = scaled
        .to_i64()
        .ok_or_else(|| DeskError::Range(format!("{price} does not fit a tick count")))?;

    let handle = ticks.div_euclid(TICKS_PER_POINT);
    let rem = ticks.rem_euclid(TICKS_PER_POINT);
    let (thirty_seconds, eighths) = (rem / 8, rem % 8);
    let frac = if eighths == 4 {
        '+'
    } else {
        char::from(b'0' + eighths as u8)
    };
    Ok(format!("{handle}-{thirty_seconds:02}{frac}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_quarter_marker() {
        assert_eq!(decode("99-16+").unwrap(), dec!(99.515625));
        assert_eq!(decode("99-164").unwrap(), dec!(99.515625));
        assert_eq!(decode("0-00+").unwrap(), dec!(0.015625));
    }

    #[test]
    fn decodes_whole_and_max_grid() {
        assert_eq!(decode("100-000").unwrap(), dec!(100));
        assert_eq!(decode(" 100-317 ").unwrap(), dec!(100) + dec!(255) / dec!(256));
    }

    #[test]
    fn encode_writes_plus_for_four_eighths() {
        assert_eq!(encode(dec!(99.515625)).unwrap(), "99-16+");
        assert_eq!(encode(dec!(101)).unwrap(), "101-000");
        assert_eq!(encode(dec!(0.00390625)).unwrap(), "0-001");
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        for bad in ["99", "99-1", "99-1x+", "99-16x", "x-16+", "99-16+0"] {
            assert!(matches!(decode(bad), Err(DeskError::Parse(_))), "{bad}");
        }
    }

    #[test]
    fn out_of_grid_values_are_range_errors() {
        assert!(matches!(decode("99-32+"), Err(DeskError::Range(_))));
        assert!(matches!(decode("99-168"), Err(DeskError::Range(_))));
        assert!(matches!(encode(dec!(99.001)), Err(DeskError::Range(_))));
        assert!(matches!(encode(dec!(-0.5)), Err(DeskError::Range(_))));
        assert!(matches!(encode(dec!(-1)), Err(DeskError::Range(_))));
    }

    proptest! {
        #[test]
        fn grid_round_trip(handle in 0i64..1_000, t32 in 0i64..32, eighths in 0i64..8) {
            let x = Decimal::from(handle) + Decimal::from(t32 * 8 + eighths) / dec!(256);
            let text = encode(x).unwrap();
            prop_assert_eq!(decode(&text).unwrap(), x);
        }
    }
}
