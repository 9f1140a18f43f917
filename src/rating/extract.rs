//! Numeric signal extraction from free-form answers.

/// Lowest value on the rating scale.
pub const SCALE_MIN: f64 = 1.0;
/// Highest value on the rating scale.
pub const SCALE_MAX: f64 = 5.0;

/// Extract a 1-5 rating from a raw answer.
///
/// Accepts a bare number (`"4"`, `"3.0"`) or a rating-scale option with a
/// leading integer (`"5 - Strongly Agree"`). Anything else, including
/// numbers outside the scale, yields `None`; that is the normal outcome for
/// open-ended answers.
pub fn extract_numeric_value(answer: &str) -> Option<f64> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = trimmed.parse::<f64>() {
        if in_scale(value) {
            return Some(value);
        }
    }

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return None;
    }

    // Overflowing runs are out of scale anyway
    let value = trimmed[..digits_end].parse::<u32>().ok()? as f64;
    in_scale(value).then_some(value)
}

fn in_scale(value: f64) -> bool {
    (SCALE_MIN..=SCALE_MAX).contains(&value)
}
