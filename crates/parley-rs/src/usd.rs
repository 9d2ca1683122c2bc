//! Exact decimal currency amounts.
//!
//! [`Usd`] stores signed nano-dollars so that sums of logged costs are exact
//! regardless of the order entries were appended in.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Decimal places kept by [`Usd`].
pub const USD_SCALE: u32 = 9;

const NANOS_PER_USD: i64 = 1_000_000_000;

/// A US-dollar amount with nano-dollar (10⁻⁹) resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(i64);

/// Returned when text is not a decimal amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid amount '{0}'")]
pub struct ParseUsdError(pub String);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Convert from a floating-point dollar value, rounding to the nearest
    /// nano-dollar. `None` for non-finite values and amounts outside the
    /// representable range.
    pub fn from_f64(dollars: f64) -> Option<Self> {
        let nanos = (dollars * NANOS_PER_USD as f64).round();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
        if !nanos.is_finite() || nanos < i64::MIN as f64 || nanos >= i64::MAX as f64 {
            return None;
        }
        Some(Self(nanos as i64))
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Usd) -> Option<Usd> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Format with exactly `places` decimals (at most 9), rounding half away
    /// from zero.
    pub fn to_fixed(self, places: u32) -> String {
        let places = places.min(USD_SCALE);
        let sign = if self.0 < 0 { "-" } else { "" };
        let divisor = 10u64.pow(USD_SCALE - places);
        let scaled = (self.0.unsigned_abs() + divisor / 2) / divisor;
        let unit = 10u64.pow(places);
        let (int, frac) = (scaled / unit, scaled % unit);
        if places == 0 {
            format!("{sign}{int}")
        } else {
            format!("{sign}{int}.{frac:0width$}", width = places as usize)
        }
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let int = abs / NANOS_PER_USD as u64;
        let frac = abs % NANOS_PER_USD as u64;
        if frac == 0 {
            write!(f, "{sign}{int}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{sign}{int}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Usd {
    type Err = ParseUsdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseUsdError(s.to_string());
        let text = s.trim();

        // Float formatters write tiny values in exponent form (`1.5e-05`).
        if text.contains(['e', 'E']) {
            let value: f64 = text.parse().map_err(|_| err())?;
            return Self::from_f64(value).ok_or_else(err);
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(err());
        }

        let int: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| err())?
        };

        let frac_bytes = frac_part.as_bytes();
        let mut frac: i64 = 0;
        for idx in 0..USD_SCALE as usize {
            let digit = frac_bytes.get(idx).map_or(0, |b| i64::from(b - b'0'));
            frac = frac * 10 + digit;
        }
        if frac_bytes.get(USD_SCALE as usize).is_some_and(|b| *b >= b'5') {
            frac += 1;
        }

        let nanos = int
            .checked_mul(NANOS_PER_USD)
            .and_then(|n| n.checked_add(frac))
            .ok_or_else(err)?;
        Ok(Self(if negative { -nanos } else { nanos }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Usd {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_decimals_exactly() {
        assert_eq!(usd("0.002").nanos(), 2_000_000);
        assert_eq!(usd("0.0035").nanos(), 3_500_000);
        assert_eq!(usd("12").nanos(), 12_000_000_000);
        assert_eq!(usd(".5").nanos(), 500_000_000);
        assert_eq!(usd("-0.25").nanos(), -250_000_000);
    }

    #[test]
    fn addition_is_exact() {
        let total = usd("0.002").checked_add(usd("0.0035")).unwrap();
        assert_eq!(total, usd("0.0055"));
        assert_eq!(total.to_string(), "0.0055");
    }

    #[test]
    fn addition_reports_overflow() {
        let big = usd("5000000000");
        assert_eq!(big.checked_add(big), None);
        assert_eq!(big.checked_add(usd("-1")), Some(usd("4999999999")));
    }

    #[test]
    fn rounds_beyond_nine_places() {
        assert_eq!(usd("0.0000000014").nanos(), 1);
        assert_eq!(usd("0.0000000015").nanos(), 2);
    }

    #[test]
    fn accepts_exponent_notation() {
        assert_eq!(usd("1.5e-05").nanos(), 15_000);
        assert_eq!(usd("2E-3"), usd("0.002"));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "0x10", "1,5", "inf", "NaNe"] {
            assert!(bad.parse::<Usd>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn display_is_shortest_exact() {
        assert_eq!(Usd::ZERO.to_string(), "0");
        assert_eq!(Usd::from_nanos(150_000).to_string(), "0.00015");
        assert_eq!(Usd::from_nanos(-1).to_string(), "-0.000000001");
        assert_eq!(Usd::from_nanos(3_000_000_000).to_string(), "3");
    }

    #[test]
    fn display_parse_roundtrip() {
        let amount = Usd::from_nanos(1_234_567_891);
        assert_eq!(amount.to_string().parse::<Usd>().unwrap(), amount);
    }

    #[test]
    fn fixed_formatting_rounds() {
        assert_eq!(usd("0.0055").to_fixed(6), "0.005500");
        assert_eq!(usd("0.0000005").to_fixed(6), "0.000001");
        assert_eq!(usd("0.0000004").to_fixed(6), "0.000000");
        assert_eq!(usd("1.5").to_fixed(0), "2");
        assert_eq!(usd("-0.125").to_fixed(2), "-0.13");
    }

    #[test]
    fn float_conversion() {
        assert_eq!(Usd::from_f64(0.00015), Some(Usd::from_nanos(150_000)));
        assert_eq!(Usd::from_f64(-2.5), Some(usd("-2.5")));
        assert_eq!(Usd::from_f64(f64::NAN), None);
        assert_eq!(Usd::from_f64(f64::INFINITY), None);
        assert_eq!(Usd::from_f64(1e30), None);
        assert_eq!(Usd::from_f64(-1e30), None);
    }

    #[test]
    fn rejects_out_of_range_amounts() {
        for bad in ["1e30", "-1e30", "1e300", "9300000000000", "-9300000000000"] {
            assert!(bad.parse::<Usd>().is_err(), "{bad:?} should not parse");
        }
        assert_eq!(usd("9000000000").nanos(), 9_000_000_000_000_000_000);
    }
}
