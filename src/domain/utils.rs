//! Domain-specific shared formatting utilities

use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;
use serde_json::Value;

/// Keeps at most `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(text: &str) -> String {
    let mut previous_alphabetic = false;
    text.chars()
        .flat_map(|character| {
            let mapped: Vec<char> = if !character.is_alphabetic() {
                vec![character]
            } else if previous_alphabetic {
                character.to_lowercase().collect()
            } else {
                character.to_uppercase().collect()
            };
            previous_alphabetic = character.is_alphabetic();
            mapped
        })
        .collect()
}

/// Renders a loosely typed backend field, printing strings without quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn ticket_reference_for(date: NaiveDate, suffix: u16) -> String {
    format!(
        "INC{:04}{:02}{:02}{:04}",
        date.year(),
        date.month(),
        date.day(),
        suffix
    )
}

/// `INC` + local date as `YYYYMMDD` + a random number in `1000..=9999`.
pub fn generate_ticket_reference() -> String {
    let suffix = rand::thread_rng().gen_range(1000..=9999);
    ticket_reference_for(Local::now().date_naive(), suffix)
}
