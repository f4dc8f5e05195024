// 🧹 Value Normalizer - Raw cells into typed, comparable values
// Total function: never errors, worst case is Absent

use crate::record::RawValue;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Spreadsheet serial epoch (serial 1 = 1900-01-01 under the 1900 system,
/// including its phantom leap day, hence the two-day offset).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// A serial is only accepted when it lands in this year range; anything
/// outside is a plain number that happens to be in a date-ish column.
const SERIAL_YEAR_MIN: i32 = 1990;
const SERIAL_YEAR_MAX: i32 = 2035;

const SECONDS_PER_DAY: f64 = 86_400.0;

// ============================================================================
// CELL VALUE
// ============================================================================

/// CellValue - The normalized form of one raw cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Nothing usable in the cell
    Absent,

    /// Non-empty text that is not a date. Several source location columns
    /// sometimes hold a decoration (the column's own name) instead of a
    /// date, so presence still counts for classification - it just cannot
    /// participate in temporal ordering.
    Present(String),

    /// A fully resolved timestamp
    Timestamp(NaiveDateTime),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// The timestamp, if this cell resolved to one
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// The presence-marker text, if any
    pub fn marker(&self) -> Option<&str> {
        match self {
            CellValue::Present(text) => Some(text),
            _ => None,
        }
    }
}

// ============================================================================
// TEXT CLEANING
// ============================================================================

/// Strip leading/trailing whitespace (ASCII and full-width U+3000) and
/// collapse internal whitespace runs to single ASCII spaces.
///
/// East-Asian-locale spreadsheet exports pad cells with ideographic spaces;
/// `char::is_whitespace` covers U+3000, so one split/join handles both.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sentinel strings that mean "no value" regardless of column
fn is_null_sentinel(cleaned: &str) -> bool {
    cleaned.is_empty()
        || cleaned.eq_ignore_ascii_case("nan")
        || cleaned.eq_ignore_ascii_case("none")
        || cleaned.eq_ignore_ascii_case("null")
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize one raw cell into a typed value.
///
/// Rules, in order:
/// 1. Clean whitespace; null sentinels ("", "nan", "none", "null") → Absent.
/// 2. Text parsing under the configured ordered format list → Timestamp.
/// 3. A numeric value that is a plausible spreadsheet date serial
///    (maps to a year 1990..=2035) → Timestamp.
/// 4. Any other non-empty text → Present (a marker without a timestamp).
pub fn normalize(raw: &RawValue, formats: &[String]) -> CellValue {
    match raw {
        RawValue::Empty => CellValue::Absent,

        RawValue::Number(n) => match serial_to_timestamp(*n) {
            Some(ts) => CellValue::Timestamp(ts),
            None => CellValue::Present(format_number(*n)),
        },

        RawValue::Text(text) => {
            let cleaned = clean_text(text);

            if is_null_sentinel(&cleaned) {
                return CellValue::Absent;
            }

            if let Some(ts) = parse_timestamp_text(&cleaned, formats) {
                return CellValue::Timestamp(ts);
            }

            CellValue::Present(cleaned)
        }
    }
}

/// Try every configured format in order; each format is attempted both as a
/// datetime and as a date-only pattern (midnight assumed).
fn parse_timestamp_text(cleaned: &str, formats: &[String]) -> Option<NaiveDateTime> {
    for format in formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(ts);
        }

        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Convert a spreadsheet date serial to a timestamp, if plausible.
///
/// Fractional days carry the time of day. Serials outside the configured
/// plausible year window are rejected (they are quantities, not dates).
fn serial_to_timestamp(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }

    let (ey, em, ed) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(ey, em, ed)?;

    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * SECONDS_PER_DAY).round() as i64;

    let date = epoch.checked_add_signed(Duration::days(days))?;

    use chrono::Datelike;
    if date.year() < SERIAL_YEAR_MIN || date.year() > SERIAL_YEAR_MAX {
        return None;
    }

    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Render a non-serial number the way a spreadsheet would display it
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        vec![
            "%Y-%m-%d %H:%M:%S".to_string(),
            "%Y-%m-%d".to_string(),
            "%d/%m/%Y".to_string(),
        ]
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_null_sentinels_are_absent() {
        for raw in ["", "   ", "nan", "NaN", "None", "NULL", "\u{3000}\u{3000}"] {
            assert_eq!(
                normalize(&RawValue::text(raw), &formats()),
                CellValue::Absent,
                "expected Absent for {:?}",
                raw
            );
        }
        assert_eq!(normalize(&RawValue::Empty, &formats()), CellValue::Absent);
    }

    #[test]
    fn test_date_text_parses() {
        assert_eq!(
            normalize(&RawValue::text("2024-01-20"), &formats()),
            CellValue::Timestamp(ymd(2024, 1, 20))
        );
        assert_eq!(
            normalize(&RawValue::text(" 15/03/2024 "), &formats()),
            CellValue::Timestamp(ymd(2024, 3, 15))
        );
        assert_eq!(
            normalize(&RawValue::text("2024-01-20 14:30:05"), &formats()),
            CellValue::Timestamp(
                NaiveDate::from_ymd_opt(2024, 1, 20)
                    .unwrap()
                    .and_hms_opt(14, 30, 5)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_full_width_space_handling() {
        // "\u{3000}MOSB\u{3000}" must clean to the same marker as "MOSB",
        // and both must be Present, not Absent
        let padded = normalize(&RawValue::text("\u{3000}MOSB\u{3000}"), &formats());
        let plain = normalize(&RawValue::text("MOSB"), &formats());

        assert_eq!(padded, plain);
        assert_eq!(padded, CellValue::Present("MOSB".to_string()));
    }

    #[test]
    fn test_internal_whitespace_collapses() {
        assert_eq!(clean_text("DSV \u{3000} Indoor"), "DSV Indoor");
        assert_eq!(clean_text("  DSV   Indoor  "), "DSV Indoor");
    }

    #[test]
    fn test_spreadsheet_serial() {
        // 45321 = 2024-01-30 under the 1900 system
        assert_eq!(
            normalize(&RawValue::Number(45321.0), &formats()),
            CellValue::Timestamp(ymd(2024, 1, 30))
        );

        // Fractional day carries the time: 45321.5 = noon
        assert_eq!(
            normalize(&RawValue::Number(45321.5), &formats()),
            CellValue::Timestamp(
                NaiveDate::from_ymd_opt(2024, 1, 30)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_implausible_serial_is_marker() {
        // 12 maps to 1900; 3,000,000 maps far past 2035 - neither is a date
        assert_eq!(
            normalize(&RawValue::Number(12.0), &formats()),
            CellValue::Present("12".to_string())
        );
        assert_eq!(
            normalize(&RawValue::Number(3_000_000.0), &formats()),
            CellValue::Present("3000000".to_string())
        );
    }

    #[test]
    fn test_decoration_text_is_marker() {
        // A location column holding its own name instead of a date
        assert_eq!(
            normalize(&RawValue::text("DSV Indoor"), &formats()),
            CellValue::Present("DSV Indoor".to_string())
        );
    }

    #[test]
    fn test_round_trip_every_format() {
        // normalize(format(ts)) == ts, checked per format with only that
        // format configured (a mixed list is allowed to be order-sensitive
        // for ambiguous day/month text)
        let all_formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%d",
            "%d/%m/%Y",
            "%m/%d/%Y",
            "%Y/%m/%d",
            "%d-%m-%Y",
            "%d.%m.%Y",
        ];

        for fmt in all_formats {
            let ts = if fmt.contains("%H") {
                NaiveDate::from_ymd_opt(2024, 3, 7)
                    .unwrap()
                    .and_hms_opt(14, 30, 0)
                    .unwrap()
            } else {
                ymd(2024, 3, 7)
            };

            let text = ts.format(fmt).to_string();
            let single = vec![fmt.to_string()];

            assert_eq!(
                normalize(&RawValue::text(&text), &single),
                CellValue::Timestamp(ts),
                "round trip failed for format {:?} (text {:?})",
                fmt,
                text
            );
        }
    }
}
