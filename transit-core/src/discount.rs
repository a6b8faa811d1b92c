//! Fare discount categories

use serde::{Deserialize, Serialize};

/// Fraction taken off the regular fare for an approved discount
pub const DISCOUNT_RATE: f64 = 0.20;

/// Passenger groups entitled to a discounted fare once verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountCategory {
    Pwd,
    Senior,
    Student,
    Pregnant,
}

impl DiscountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountCategory::Pwd => "pwd",
            DiscountCategory::Senior => "senior",
            DiscountCategory::Student => "student",
            DiscountCategory::Pregnant => "pregnant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pwd" => Some(DiscountCategory::Pwd),
            "senior" => Some(DiscountCategory::Senior),
            "student" => Some(DiscountCategory::Student),
            "pregnant" => Some(DiscountCategory::Pregnant),
            _ => None,
        }
    }
}

/// Regular fare less the discount, rounded to centavos
///
/// Every category gets the same rate; the category is taken so callers
/// cannot compute a discount without naming one.
pub fn discounted_fare(fare: f64, _category: DiscountCategory) -> f64 {
    (fare * (1.0 - DISCOUNT_RATE) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_rounds_to_centavos() {
        assert_eq!(discounted_fare(12.0, DiscountCategory::Student), 9.6);
        assert_eq!(discounted_fare(13.0, DiscountCategory::Senior), 10.4);
        assert_eq!(discounted_fare(0.0, DiscountCategory::Pwd), 0.0);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(DiscountCategory::parse("PWD"), Some(DiscountCategory::Pwd));
        assert_eq!(DiscountCategory::parse("veteran"), None);
    }
}
