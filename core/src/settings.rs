//! Typed reads of the per-association and per-event config tables.
//!
//! Values are stored as text. A missing row or a value that does not
//! parse as `T` yields the caller's default.

use crate::{
    error::RegResult,
    store::RegStore,
    types::{AssocId, EventId},
};
use std::str::FromStr;

pub fn get_association_config<T: FromStr>(
    store: &RegStore,
    assoc_id: AssocId,
    key: &str,
    default: T,
) -> RegResult<T> {
    Ok(parse_or(store.association_config_value(assoc_id, key)?, key, default))
}

pub fn get_event_config<T: FromStr>(
    store: &RegStore,
    event_id: EventId,
    key: &str,
    default: T,
) -> RegResult<T> {
    Ok(parse_or(store.event_config_value(event_id, key)?, key, default))
}

/// Boolean event flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn event_flag(store: &RegStore, event_id: EventId, key: &str) -> RegResult<bool> {
    Ok(store
        .event_config_value(event_id, key)?
        .map(|v| parse_flag(&v))
        .unwrap_or(false))
}

/// Boolean association flag, same spellings as `event_flag`.
pub fn association_flag(store: &RegStore, assoc_id: AssocId, key: &str) -> RegResult<bool> {
    Ok(store
        .association_config_value(assoc_id, key)?
        .map(|v| parse_flag(&v))
        .unwrap_or(false))
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(v) => match v.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("config {key}={v:?} is not valid, using default");
                default
            }
        },
        None => default,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for v in ["true", "True", "1", "yes", " on "] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["false", "0", "", "maybe"] {
            assert!(!parse_flag(v), "{v}");
        }
    }

    #[test]
    fn unparsable_value_falls_back() {
        assert_eq!(parse_or(Some("abc".into()), "k", 30i64), 30);
        assert_eq!(parse_or(Some(" 14 ".into()), "k", 30i64), 14);
        assert_eq!(parse_or(None, "k", 30i64), 30);
    }
}
