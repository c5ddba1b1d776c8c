// src/normalize/field.rs
//
// Stateless per-cell normalizers. Each is total: unrecognized input maps to
// `None`, which the store writes back as the empty marker. Nothing here
// raises to the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static SPACED_FLIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{2} \d+$").unwrap());
static JOINED_FLIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{2}\d+$").unwrap());
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
static LEADING_8_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{8})").unwrap());
static NAME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]\s*\.\.").unwrap());

/// Flight designator: `XX 1234` passes through, `XX1234` gains the missing
/// space after the two-character designator. Idempotent.
pub fn clean_flight_code(raw: &str) -> Option<String> {
    let value = raw.trim();
    if SPACED_FLIGHT.is_match(value) {
        return Some(value.to_string());
    }
    if JOINED_FLIGHT.is_match(value) {
        return Some(format!("{} {}", &value[..2], &value[2..]));
    }
    None
}

/// Station code: exactly 3 alphabetic characters, uppercased.
pub fn clean_airport_code(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(value.to_uppercase())
    } else {
        None
    }
}

/// Clock time: anything after a `|` annotation separator is dropped, the
/// rest must be `H:MM`/`HH:MM` with hour 0–23 and minute 0–59.
pub fn clean_clock_time(raw: &str) -> Option<String> {
    let value = raw.trim().split('|').next().unwrap_or_default().trim();
    let caps = CLOCK.captures(value)?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    if hours <= 23 && minutes <= 59 {
        Some(value.to_string())
    } else {
        None
    }
}

/// Reference identifier: leading run of exactly 8 digits; a `/A`-style
/// suffix is discarded.
pub fn extract_identifier(raw: &str) -> Option<String> {
    LEADING_8_DIGITS
        .captures(raw.trim())
        .map(|caps| caps[1].to_string())
}

/// Strict person-name validator: surrounding dots trimmed, remainder must
/// be purely alphabetic and not one of the configured reject tokens.
pub fn clean_person_name(raw: &str, reject: &HashSet<String>) -> Option<String> {
    let value = raw.trim().trim_matches('.');
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if reject.contains(value) {
        return None;
    }
    Some(value.to_string())
}

/// Looser cosmetic pass for name columns, applied after the strict
/// validator and sentinel replacement: strip leading dot/space runs and a
/// leading `J ..`-style single-letter prefix.
pub fn scrub_name(raw: &str) -> String {
    let value = raw.trim_start_matches(['.', ' ']).trim();
    NAME_PREFIX.replace(value, "").trim().to_string()
}

/// Remove configured noise tokens from the free-text aircraft-type cell.
pub fn scrub_aircraft(raw: &str, noise: &Regex) -> String {
    noise.replace_all(raw, "").trim().to_string()
}

/// Build the aircraft-noise alternation from literal config tokens.
pub fn compile_noise(tokens: &[String]) -> Option<Regex> {
    if tokens.is_empty() {
        return None;
    }
    let escaped: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
    Some(Regex::new(&format!("({})", escaped.join("|"))).expect("escaped literals always compile"))
}
