//! Internal helpers for input validation and date handling.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Collapse inner whitespace of a display name; rejects blank names.
pub(crate) fn normalize_category_display(input: &str) -> ResultEngine<String> {
    let display = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
        return Err(EngineError::InvalidName(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(display)
}

/// Comparison key for category names: lower-case, accents stripped,
/// punctuation folded into single spaces.
pub(crate) fn normalize_category_key(input: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "category name '{input}' has no letters or digits"
        )));
    }
    Ok(normalized.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn require_actor(actor_id: &str) -> ResultEngine<&str> {
    let trimmed = actor_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Forbidden("missing actor id".to_string()));
    }
    Ok(trimmed)
}

/// `[start, end)` of a local calendar day, in UTC.
pub(crate) fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date);
    let end = date
        .succ_opt()
        .map(local_midnight)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Local calendar day of an instant.
pub(crate) fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// `YYYYMMDD` stamp used in entry references.
pub(crate) fn day_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
