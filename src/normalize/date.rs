// src/normalize/date.rs

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::NOT_FOUND;

static CANONICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());
static DOTTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());

/// Carry-forward normalization of the date column.
///
/// An explicit fold over the rows in order, threading the last valid date
/// as the accumulator. Per cell:
/// - already canonical `MM/DD/YYYY`: kept, becomes the new carry value;
/// - empty or the "Not found" sentinel: replaced by the carry value;
/// - `D(D).M(M).YYYY` naming a real calendar day: rewritten zero-padded to
///   `MM/DD/YYYY`, becomes the new carry value;
/// - anything else: replaced by the carry value.
///
/// Before any valid date has been seen the carry value is the empty
/// string, the same marker the store uses for absent values. Row order is
/// a first-class input here; callers must pass the full column.
pub fn carry_forward_dates(cells: &mut [String]) {
    let mut previous: Option<String> = None;
    for cell in cells.iter_mut() {
        let value = cell.trim();

        if CANONICAL.is_match(value) {
            previous = Some(value.to_string());
            *cell = value.to_string();
            continue;
        }

        if value.is_empty() || value == NOT_FOUND {
            *cell = previous.clone().unwrap_or_default();
            continue;
        }

        if let Some(rewritten) = rewrite_dotted(value) {
            previous = Some(rewritten.clone());
            *cell = rewritten;
            continue;
        }

        *cell = previous.clone().unwrap_or_default();
    }
}

/// `D(D).M(M).YYYY` → zero-padded `MM/DD/YYYY`, rejecting impossible
/// calendar dates.
fn rewrite_dotted(value: &str) -> Option<String> {
    let caps = DOTTED.captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?;
    Some(format!("{:02}/{:02}/{}", month, day, year))
}
