//! Minimum PII pattern set.
//!
//! Matching is purely syntactic. A hit never records the matched text, only
//! its category and position.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Ssn,
    Phone,
    PostalAddress,
}

impl PiiCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PiiCategory::Ssn => "ssn",
            PiiCategory::Phone => "phone",
            PiiCategory::PostalAddress => "postal_address",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PiiMatch {
    pub category: PiiCategory,
    /// Byte offsets into the scanned text.
    pub start: usize,
    pub end: usize,
}

static PATTERNS: LazyLock<Vec<(PiiCategory, Regex)>> = LazyLock::new(|| {
    [
        (PiiCategory::Ssn, r"\b\d{3}[- ]\d{2}[- ]\d{4}\b"),
        (
            PiiCategory::Phone,
            r"\b(\+1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
        ),
        (
            PiiCategory::PostalAddress,
            r"\b\d{1,5}\s+[A-Za-z0-9\s,.]+(?:Street|St|Avenue|Ave|Boulevard|Blvd|Road|Rd|Drive|Dr|Lane|Ln|Way|Court|Ct)\b",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| (category, Regex::new(pattern).expect("pii pattern compiles")))
    .collect()
});

/// Every match of every pattern, in pattern order.
pub fn scan(text: &str) -> Vec<PiiMatch> {
    PATTERNS
        .iter()
        .flat_map(|(category, re)| {
            re.find_iter(text).map(move |m| PiiMatch {
                category: *category,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(text: &str) -> Vec<PiiCategory> {
        scan(text).into_iter().map(|m| m.category).collect()
    }

    #[test]
    fn ssn_with_hyphens_or_spaces() {
        assert!(categories("id 123-45-6789 here").contains(&PiiCategory::Ssn));
        assert!(categories("id 123 45 6789 here").contains(&PiiCategory::Ssn));
    }

    #[test]
    fn phone_formats() {
        for text in ["call (212) 555-0199", "call 212.555.0199", "call +1 212 555 0199"] {
            assert!(categories(text).contains(&PiiCategory::Phone), "{text}");
        }
    }

    #[test]
    fn street_address() {
        assert_eq!(
            categories("sent to 9 East 71st Street"),
            vec![PiiCategory::PostalAddress]
        );
    }

    #[test]
    fn document_identifiers_are_not_pii() {
        assert!(scan(r#"{"document":"EFTA00039186","verdict":"verified"}"#).is_empty());
    }
}
