use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::models::Contact;

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\d{8,15}$").expect("Failed to compile phone pattern"));

/// International format: a plus sign followed by 8 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

pub struct DialCode {
    pub code: &'static str,
    pub label: &'static str,
}

const fn dial(code: &'static str, label: &'static str) -> DialCode {
    DialCode { code, label }
}

pub const DEFAULT_DIAL_CODE: &str = "+65";

pub const DIAL_CODES: &[DialCode] = &[
    dial("+65", "Singapore"),
    dial("+60", "Malaysia"),
    dial("+62", "Indonesia"),
    dial("+66", "Thailand"),
    dial("+63", "Philippines"),
    dial("+84", "Vietnam"),
    dial("+86", "China"),
    dial("+852", "Hong Kong"),
    dial("+886", "Taiwan"),
    dial("+81", "Japan"),
    dial("+82", "South Korea"),
    dial("+1", "USA / Canada"),
    dial("+44", "United Kingdom"),
    dial("+61", "Australia"),
];

/// Joins a dial code and a local number typed with spaces.
/// The result still has to pass [`is_valid_phone`].
pub fn compose_phone(dial_code: &str, local: &str) -> String {
    let local: String = local.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}{}", dial_code.trim(), local)
}

/// Client-side search over an already category-scoped list.
/// Name and email match case-insensitively, phone matches as typed.
pub fn search<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.to_lowercase();
    contacts
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.phone.contains(query)
                || c
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
