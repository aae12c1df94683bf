//! Closed set of filter comparators with their URL keys and display labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Prefix,
    Regex,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl Comparator {
    pub const ALL: [Comparator; 13] = [
        Comparator::Equals,
        Comparator::NotEquals,
        Comparator::In,
        Comparator::NotIn,
        Comparator::Contains,
        Comparator::StartsWith,
        Comparator::EndsWith,
        Comparator::Prefix,
        Comparator::Regex,
        Comparator::GreaterThan,
        Comparator::GreaterThanOrEqualTo,
        Comparator::LessThan,
        Comparator::LessThanOrEqualTo,
    ];

    /// Identifier used inside `filters[<key>][<COMPARATOR>]`.
    pub fn as_key(self) -> &'static str {
        match self {
            Comparator::Equals => "EQUALS",
            Comparator::NotEquals => "NOT_EQUALS",
            Comparator::In => "IN",
            Comparator::NotIn => "NOT_IN",
            Comparator::Contains => "CONTAINS",
            Comparator::StartsWith => "STARTS_WITH",
            Comparator::EndsWith => "ENDS_WITH",
            Comparator::Prefix => "PREFIX",
            Comparator::Regex => "REGEX",
            Comparator::GreaterThan => "GREATER_THAN",
            Comparator::GreaterThanOrEqualTo => "GREATER_THAN_OR_EQUAL_TO",
            Comparator::LessThan => "LESS_THAN",
            Comparator::LessThanOrEqualTo => "LESS_THAN_OR_EQUAL_TO",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Comparator::Equals => "Is",
            Comparator::NotEquals => "Is not",
            Comparator::In => "Is one of",
            Comparator::NotIn => "Is not one of",
            Comparator::Contains => "Contains",
            Comparator::StartsWith => "Starts with",
            Comparator::EndsWith => "Ends with",
            Comparator::Prefix => "Prefix",
            Comparator::Regex => "Matches regex",
            Comparator::GreaterThan => "Greater than",
            Comparator::GreaterThanOrEqualTo => "Greater than or equal to",
            Comparator::LessThan => "Less than",
            Comparator::LessThanOrEqualTo => "Less than or equal to",
        }
    }

    /// Text comparators only ever carry a single value, even on multi-select keys.
    pub fn is_text(self) -> bool {
        matches!(self, Comparator::StartsWith | Comparator::EndsWith | Comparator::Contains)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Comparator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL
            .iter()
            .copied()
            .find(|c| c.as_key() == s)
            .ok_or_else(|| FilterError::InvalidComparator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_back() {
        for c in Comparator::ALL {
            assert_eq!(c.as_key().parse::<Comparator>().unwrap(), c);
        }
        assert!("equals".parse::<Comparator>().is_err());
    }

    #[test]
    fn serde_uses_url_keys() {
        let json = serde_json::to_string(&Comparator::GreaterThanOrEqualTo).unwrap();
        assert_eq!(json, "\"GREATER_THAN_OR_EQUAL_TO\"");
        let back: Comparator = serde_json::from_str("\"NOT_IN\"").unwrap();
        assert_eq!(back, Comparator::NotIn);
    }

    #[test]
    fn text_comparators() {
        assert!(Comparator::Contains.is_text());
        assert!(Comparator::StartsWith.is_text());
        assert!(!Comparator::Prefix.is_text());
        assert!(!Comparator::In.is_text());
    }
}
