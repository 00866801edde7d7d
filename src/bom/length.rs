//! Length parsing for free-text BOM notes
//!
//! Cut-to-length lines carry their length in the note ("Cut to 12.75 inches").
//! Only the first number is trusted, and only a unit token directly after it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?|\.\d+").expect("number pattern"));

// Longer spellings come first so "mm" never stops at "m".
static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+\.?\d*|\.\d+)\s*(millimeters?|centimeters?|meters?|inches?|feet|mm|cm|in|ft|m)?",
    )
    .expect("number-with-unit pattern")
});

/// A number found in a note, with the unit written right after it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthWithUnit {
    pub value: f64,
    /// Lower-cased unit token, `None` when the number stands alone
    pub unit: Option<String>,
}

/// First decimal number in `text`, or `None` if there is none
pub fn extract_length(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    NUMBER.find(text)?.as_str().parse().ok()
}

/// First decimal number in `text` plus the unit token adjacent to it
pub fn extract_length_with_unit(text: &str) -> Option<LengthWithUnit> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let caps = NUMBER_WITH_UNIT.captures(text)?;
    let value = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
    Some(LengthWithUnit { value, unit })
}

/// Message describing a disagreement between the unit in `notes` and `part_unit`
///
/// Returns `None` when either side is empty, the note has no unit, or the units
/// agree ignoring case.
pub fn check_unit_mismatch(notes: &str, part_unit: &str) -> Option<String> {
    if notes.trim().is_empty() || part_unit.is_empty() {
        return None;
    }
    let unit = extract_length_with_unit(notes)?.unit?;
    if unit == part_unit.to_lowercase() {
        return None;
    }
    Some(format!(
        "BOM notes specify '{}' but part uses '{}'",
        unit, part_unit
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_length_variants() {
        assert_eq!(extract_length("100"), Some(100.0));
        assert_eq!(extract_length("100mm"), Some(100.0));
        assert_eq!(extract_length("Length: 50.5"), Some(50.5));
        assert_eq!(extract_length("Cut to 12.75 inches"), Some(12.75));
        assert_eq!(extract_length(".5 in"), Some(0.5));
        assert_eq!(extract_length("Non-numeric text"), None);
        assert_eq!(extract_length(""), None);
        assert_eq!(extract_length("   "), None);
    }

    #[test]
    fn test_extract_length_takes_first_number() {
        assert_eq!(extract_length("2 pieces at 300mm"), Some(2.0));
    }

    #[test]
    fn test_extract_length_with_unit() {
        let got = extract_length_with_unit("100mm").unwrap();
        assert_eq!(got.value, 100.0);
        assert_eq!(got.unit.as_deref(), Some("mm"));

        let got = extract_length_with_unit("50.5 Inches").unwrap();
        assert_eq!(got.value, 50.5);
        assert_eq!(got.unit.as_deref(), Some("inches"));

        let got = extract_length_with_unit("Cut 12mm from stock").unwrap();
        assert_eq!(got.unit.as_deref(), Some("mm"));

        let got = extract_length_with_unit("100").unwrap();
        assert_eq!(got.unit, None);

        assert!(extract_length_with_unit("No numbers").is_none());
    }

    #[test]
    fn test_unit_only_counts_when_adjacent() {
        let got = extract_length_with_unit("300 long, then 5 mm chamfer").unwrap();
        assert_eq!(got.value, 300.0);
        assert_eq!(got.unit, None);
    }

    #[test]
    fn test_check_unit_mismatch() {
        assert_eq!(
            check_unit_mismatch("12 in", "mm").as_deref(),
            Some("BOM notes specify 'in' but part uses 'mm'")
        );
        assert_eq!(check_unit_mismatch("300MM", "mm"), None);
        assert_eq!(check_unit_mismatch("300", "mm"), None);
        assert_eq!(check_unit_mismatch("", "mm"), None);
        assert_eq!(check_unit_mismatch("12 in", ""), None);
    }
}
