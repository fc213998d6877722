//! Environment variable loading helpers.
//!
//! Keeps the primary-then-aliases fallback chain in one place.

use std::env;

fn lookup(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
}

/// Read the primary variable or the first set alias. Empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Boolean variable: 0/false/no/off are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    parse_bool(lookup(primary, aliases).as_deref(), default)
}

/// Positive whole-second duration. Invalid or zero values fall back to `default`.
pub fn env_secs(primary: &str, aliases: &[&str], default: u64) -> u64 {
    let raw = env_optional(primary, aliases);
    match parse_secs(raw.as_deref()) {
        Some(secs) => secs,
        None => {
            if let Some(bad) = raw {
                tracing::warn!(
                    key = primary,
                    value = %bad,
                    default,
                    "Ignoring invalid timeout value"
                );
            }
            default
        }
    }
}

pub(crate) fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

pub(crate) fn parse_secs(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}
