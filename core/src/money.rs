//! Display smoothing and compact formatting for cached amounts.

/// Snap to the nearest tenth when that moves the value by at most 0.03,
/// otherwise return the value untouched.
///
/// Not currency rounding: it hides drift such as 9.98 → 10 while leaving
/// genuinely fractional amounts (1.26789) alone.
pub fn round_to_nearest_cent(value: f64) -> f64 {
    const MAX_ROUNDING: f64 = 0.03;
    let rounded = (value * 10.0).round() / 10.0;
    if (value - rounded).abs() <= MAX_ROUNDING {
        rounded
    } else {
        value
    }
}

/// Below this absolute difference a balance counts as settled.
pub const SETTLED_EPSILON: f64 = 0.05;

/// `tot_iscr - tot_payed`, snapped to zero inside the settle tolerance.
pub fn remaining_balance(tot_iscr: f64, tot_payed: f64) -> f64 {
    let remaining = tot_iscr - tot_payed;
    if remaining.abs() < SETTLED_EPSILON {
        0.0
    } else {
        remaining
    }
}

/// Format like C's `%g`: six significant digits, trailing zeros dropped,
/// exponent notation below 1e-4 and from 1e6 up.
pub fn format_compact(value: f64) -> String {
    if value == 0.0 {
        return "0".into();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".into()
        } else if value > 0.0 {
            "inf".into()
        } else {
            "-inf".into()
        };
    }

    // Rounding to six significant digits decides the exponent.
    let sci = format!("{value:.5e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if !(-4..6).contains(&exp) {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (5 - exp).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

/// Parse a value written by `format_compact`.
pub fn parse_compact(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Round, format and read back: the value exactly as a cache reader sees it.
pub fn normalize_amount(value: f64) -> f64 {
    let formatted = format_compact(round_to_nearest_cent(value));
    parse_compact(&formatted).unwrap_or(value)
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Serde adapter: `f64` on the Rust side, compact string on the wire.
pub mod compact {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_compact(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }
        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(t) => super::parse_compact(&t)
                .ok_or_else(|| de::Error::custom(format!("invalid amount {t:?}"))),
        }
    }

    /// Same adapter for optional fields; `None` is skipped by the caller.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] f64);
            Ok(Option::<Wrapped>::deserialize(d)?.map(|Wrapped(v)| v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_tenth_within_tolerance() {
        assert_eq!(round_to_nearest_cent(1.22), 1.2);
        assert_eq!(round_to_nearest_cent(9.98), 10.0);
        assert_eq!(round_to_nearest_cent(-4.02), -4.0);
    }

    #[test]
    fn keeps_raw_value_outside_tolerance() {
        assert_eq!(round_to_nearest_cent(1.26789), 1.26789);
        assert_eq!(round_to_nearest_cent(1.23456), 1.23456);
        assert_eq!(round_to_nearest_cent(12.55), 12.55);
    }

    #[test]
    fn remaining_snaps_to_zero_both_directions() {
        assert_eq!(remaining_balance(100.0, 99.96), 0.0);
        assert_eq!(remaining_balance(100.0, 100.04), 0.0);
        assert_eq!(remaining_balance(100.0, 60.0), 40.0);
        assert_eq!(remaining_balance(100.0, 110.0), -10.0);
    }

    #[test]
    fn compact_format_matches_percent_g() {
        assert_eq!(format_compact(0.0), "0");
        assert_eq!(format_compact(10.0), "10");
        assert_eq!(format_compact(12.5), "12.5");
        assert_eq!(format_compact(-3.25), "-3.25");
        assert_eq!(format_compact(1.26789), "1.26789");
        assert_eq!(format_compact(1234.5678), "1234.57");
        assert_eq!(format_compact(100000.0), "100000");
        assert_eq!(format_compact(1234567.0), "1.23457e+06");
        assert_eq!(format_compact(0.0001), "0.0001");
        assert_eq!(format_compact(0.00001234), "1.234e-05");
    }

    #[test]
    fn normalized_amount_is_stable() {
        for v in [0.0, 1.22, 1234.5678, 55.55, 1e7 + 0.3] {
            let once = normalize_amount(v);
            assert_eq!(normalize_amount(once), once);
        }
    }
}
