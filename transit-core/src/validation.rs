//! Form validation rules
//!
//! The admin panel and the mobile app check these rules before submitting;
//! the backend checks them again because client code is not a trust
//! boundary. Each rule returns a human-readable message on failure, and
//! [`ValidationErrors`] collects one message per field so a form can show
//! every problem at once.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 80;

/// Outcome of a single rule: the parsed value or a message for the field
pub type RuleResult<T = ()> = Result<T, String>;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

// Philippine mobile numbers: 09 followed by nine digits
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^09\d{9}$").expect("Invalid phone regex"));

static POSTAL_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("Invalid postal code regex"));

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("Invalid date regex"));

static PLATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{3})[ -]?(\d{3,4})$").expect("Invalid plate regex"));

/// Field-level validation failures, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field; the first message per field is kept
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record the failure of a rule, passing its value through on success
    pub fn check<T>(&mut self, field: &str, result: RuleResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, (field, message)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, field, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Non-blank after trimming; returns the trimmed value
pub fn required(value: &str) -> RuleResult<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("This field is required".to_string())
    } else {
        Ok(trimmed)
    }
}

pub fn validate_email(value: &str) -> RuleResult {
    let value = required(value)?;
    if EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err("Enter a valid email address".to_string())
    }
}

/// `09XXXXXXXXX`, eleven digits in total
pub fn validate_phone(value: &str) -> RuleResult {
    if PHONE_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err("Phone number must be 11 digits starting with 09".to_string())
    }
}

pub fn validate_postal_code(value: &str) -> RuleResult {
    if POSTAL_CODE_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err("Postal code must be 4 digits".to_string())
    }
}

/// At least eight characters with an uppercase letter, a lowercase letter and a digit
pub fn validate_password(value: &str) -> RuleResult {
    let length = value.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        ));
    }

    let has_upper = value.chars().any(|c| c.is_uppercase());
    let has_lower = value.chars().any(|c| c.is_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(
            "Password must contain an uppercase letter, a lowercase letter and a number"
                .to_string(),
        );
    }

    Ok(())
}

/// Gregorian leap year
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in a month, `None` for a month outside 1..=12
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return None,
    };
    Some(days)
}

/// Parse a `YYYY-MM-DD` date, rejecting days past the end of the month
pub fn parse_date(value: &str) -> RuleResult<NaiveDate> {
    let invalid = || "Enter a valid date (YYYY-MM-DD)".to_string();

    let caps = DATE_PATTERN.captures(value.trim()).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;

    let max_day = days_in_month(year, month).ok_or_else(invalid)?;
    if day == 0 || day > max_day {
        return Err(invalid());
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Whole years between `birthdate` and `today`
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// A real calendar date, not in the future, at least `min_age` years before `today`
pub fn validate_birthdate(value: &str, today: NaiveDate, min_age: u32) -> RuleResult<NaiveDate> {
    let birthdate = parse_date(value)?;
    if birthdate > today {
        return Err("Birthdate cannot be in the future".to_string());
    }
    if age_on(birthdate, today) < min_age {
        return Err(format!("Must be at least {} years old", min_age));
    }
    Ok(birthdate)
}

/// Plate numbers like `ABC 1234`, `ABC-123` or `ABC1234`.
///
/// Returns the plate uppercased with a single space before the digits, so
/// every spelling of one plate compares equal.
pub fn validate_plate_number(value: &str) -> RuleResult<String> {
    let plate = value.trim().to_ascii_uppercase();
    match PLATE_PATTERN.captures(&plate) {
        Some(parts) => Ok(format!("{} {}", &parts[1], &parts[2])),
        None => Err("Plate number must look like ABC 1234".to_string()),
    }
}
