//! Best-effort coercion of raw cells into numbers and dates.
//!
//! Every helper returns `None` for anything it cannot read; none of them fail.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::table::RawValue;

/// Excel serial dates count days from this origin.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Largest serial Excel can represent (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Plain numeric parse.
pub fn to_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Empty => None,
        RawValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
        RawValue::Text(s) => parse_float(s),
    }
}

/// Quantity parse: spaces and thousands separators are dropped.
pub fn to_quantity(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Text(s) => parse_float(&s.replace(' ', "").replace(',', "")),
        other => to_number(other),
    }
}

/// Decimal parse: percent signs are dropped and a decimal comma becomes a dot.
pub fn to_decimal(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Text(s) => parse_float(&s.replace('%', "").replace(',', ".")),
        other => to_number(other),
    }
}

/// Price parse for the stream source: spaces dropped, decimal comma accepted.
pub fn to_spaced_decimal(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Text(s) => parse_float(&s.replace(' ', "").replace(',', ".")),
        other => to_number(other),
    }
}

/// Convert an Excel serial day number to a timestamp.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let origin = NaiveDate::from_ymd_opt(y, m, d)?.and_time(NaiveTime::MIN);
    let millis = (serial * 86_400_000.0).round() as i64;
    origin.checked_add_signed(Duration::milliseconds(millis))
}

/// Timestamp parse accepting ISO, day-first and Excel serial forms.
pub fn to_datetime(value: &RawValue) -> Option<NaiveDateTime> {
    match value {
        RawValue::Empty => None,
        RawValue::Number(n) => from_excel_serial(*n),
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    DATE_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
                .or_else(|| parse_float(s).and_then(from_excel_serial))
        }
    }
}

/// Date parse; the time of day is discarded.
pub fn to_date(value: &RawValue) -> Option<NaiveDate> {
    to_datetime(value).map(|dt| dt.date())
}

/// Non-empty text content.
pub fn to_text(value: &RawValue) -> Option<String> {
    value.as_text().filter(|s| !s.trim().is_empty())
}

/// Round half to even at the given number of decimals.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantity() {
        assert_eq!(to_quantity(&"1 500".into()), Some(1500.0));
        assert_eq!(to_quantity(&"2,000".into()), Some(2000.0));
        assert_eq!(to_quantity(&RawValue::Number(250.0)), Some(250.0));
        assert_eq!(to_quantity(&"n/a".into()), None);
        assert_eq!(to_quantity(&RawValue::Empty), None);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(to_decimal(&"4,25%".into()), Some(4.25));
        assert_eq!(to_decimal(&"-3.1".into()), Some(-3.1));
        assert_eq!(to_decimal(&"nan".into()), None);
    }

    #[test]
    fn test_plain_number_rejects_comma() {
        assert_eq!(to_number(&"101,5".into()), None);
        assert_eq!(to_number(&" 101.5 ".into()), Some(101.5));
        assert_eq!(to_spaced_decimal(&"101,5".into()), Some(101.5));
    }

    #[test]
    fn test_datetime_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(to_datetime(&"2024-03-01 09:30:00".into()), Some(expected));
        assert_eq!(to_datetime(&"2024-03-01T09:30:00".into()), Some(expected));
        assert_eq!(to_datetime(&"01/03/2024 09:30".into()), Some(expected));
        assert_eq!(to_datetime(&"garbage".into()), None);
        assert_eq!(
            to_date(&"2031-05-15".into()),
            NaiveDate::from_ymd_opt(2031, 5, 15)
        );
    }

    #[test]
    fn test_excel_serial() {
        // 45352.5 is 2024-03-01 12:00.
        let dt = to_datetime(&RawValue::Number(45352.5)).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(to_datetime(&"45352.5".into()), Some(dt));
        assert_eq!(from_excel_serial(-4.0), None);
    }

    #[test]
    fn test_round_half_even() {
        assert_relative_eq!(round_to(101.234, 2), 101.23);
        assert_relative_eq!(round_to(2.5, 0), 2.0);
        assert_relative_eq!(round_to(3.5, 0), 4.0);
        assert_relative_eq!(round_to(-12.6, 0), -13.0);
    }
}
