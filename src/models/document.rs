//! Document model representing an RFC and its canonical identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a document reference contains no parseable RFC number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid RFC identifier '{input}': no RFC number found")]
pub struct InvalidIdentifier {
    /// The reference as the caller supplied it
    pub input: String,
}

impl InvalidIdentifier {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Canonical numeric identifier of an RFC.
///
/// Parsed from free-form user references such as `"7540"`, `"RFC7540"` or
/// `"RFC 7540"`: everything that is not an ASCII digit is stripped and the
/// remaining digit run is the number. No upper bound is enforced beyond the
/// integer width; whether the number names a published RFC is for the
/// upstream index to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfcNumber(u64);

impl RfcNumber {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The lowercase document name used by the upstream index, e.g. `"rfc7540"`.
    pub fn doc_name(&self) -> String {
        format!("rfc{}", self.0)
    }
}

impl FromStr for RfcNumber {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(InvalidIdentifier::new(s));
        }
        // A digit run too long for u64 is as unusable as no digits at all.
        digits
            .parse::<u64>()
            .map(RfcNumber)
            .map_err(|_| InvalidIdentifier::new(s))
    }
}

impl fmt::Display for RfcNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RfcNumber {
    fn from(number: u64) -> Self {
        Self(number)
    }
}

/// Metadata record of a single RFC
///
/// Field values are carried verbatim from the upstream index; presence is the
/// only thing checked. Empty strings and `None` both mean the index had
/// nothing for that field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document name as the index knows it, e.g. "rfc7540"
    pub name: String,

    /// Document title
    pub title: String,

    /// Author names, in document order
    pub authors: Vec<String>,

    /// Page count
    pub pages: Option<u64>,

    /// Publication stream label
    pub stream: Option<String>,

    /// Working group label
    pub group: Option<String>,

    /// Standardization level label
    pub std_level: Option<String>,

    /// Intended standardization level, used when `std_level` is absent
    pub intended_std_level: Option<String>,

    /// The index's own RFC number field
    pub rfc_number: Option<String>,

    /// Document revision
    pub rev: String,

    /// Abstract text
    pub r#abstract: String,
}

impl DocumentMetadata {
    /// The standardization level to display, falling back to the intended one.
    pub fn effective_std_level(&self) -> Option<&str> {
        self.std_level
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.intended_std_level.as_deref())
    }
}
