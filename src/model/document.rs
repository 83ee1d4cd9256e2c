//! Document identifiers, corpus partitions, and canonical retrieval URLs.
//!
//! All three reject malformed input at construction, so anything holding one
//! of these types is already format-valid.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed four-letter prefix of every document identifier.
pub const DOCUMENT_PREFIX: &str = "EFTA";

/// Largest number that fits in the eight zero-padded digits.
pub const MAX_DOCUMENT_NUMBER: u32 = 99_999_999;

pub const PARTITION_MIN: u8 = 1;
pub const PARTITION_MAX: u8 = 12;

static DOCUMENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^EFTA(\d{8})$").expect("document id pattern compiles"));

static DOCUMENT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[^/\s]+(?:/[^/\s]+)*/files/DataSet%20(\d{1,2})/EFTA(\d{8})\.pdf$")
        .expect("document url pattern compiles")
});

// ---------------------------------------------------------------------------
// DocumentNumber
// ---------------------------------------------------------------------------

/// Numeric part of a document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DocumentNumber(u32);

impl DocumentNumber {
    pub fn new(value: u32) -> Result<Self> {
        if value > MAX_DOCUMENT_NUMBER {
            return Err(Error::FormatInvalid(format!(
                "document number {value} does not fit in 8 digits"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for DocumentNumber {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DocumentNumber> for u32 {
    fn from(n: DocumentNumber) -> Self {
        n.0
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// One of the twelve corpus partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Partition(u8);

impl Partition {
    pub fn new(value: u8) -> Result<Self> {
        if !(PARTITION_MIN..=PARTITION_MAX).contains(&value) {
            return Err(Error::FormatInvalid(format!(
                "partition {value} outside {PARTITION_MIN}..={PARTITION_MAX}"
            )));
        }
        Ok(Self(value))
    }

    /// Like `new`, but for arithmetic results that may fall off either end.
    pub fn checked(value: i32) -> Option<Self> {
        u8::try_from(value).ok().and_then(|v| Self::new(v).ok())
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Partition {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Partition> for u8 {
    fn from(p: Partition) -> Self {
        p.0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Canonical document identifier, e.g. `EFTA00039186`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(DocumentNumber);

impl DocumentId {
    pub fn parse(s: &str) -> Result<Self> {
        let caps = DOCUMENT_ID_RE.captures(s).ok_or_else(|| {
            Error::FormatInvalid(format!(
                "invalid document identifier {s:?}: expected {DOCUMENT_PREFIX} followed by 8 digits"
            ))
        })?;
        let number: u32 = caps[1]
            .parse()
            .map_err(|e| Error::FormatInvalid(format!("invalid document number in {s:?}: {e}")))?;
        Ok(Self(DocumentNumber::new(number)?))
    }

    pub fn from_number(number: DocumentNumber) -> Self {
        Self(number)
    }

    pub fn number(self) -> DocumentNumber {
        self.0
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DOCUMENT_PREFIX}{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentUrl
// ---------------------------------------------------------------------------

/// Canonical retrieval URL for one document in one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentUrl {
    url: String,
    partition: Partition,
    document: DocumentId,
}

impl DocumentUrl {
    /// Validate an externally supplied URL against the canonical pattern.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = DOCUMENT_URL_RE
            .captures(s)
            .ok_or_else(|| Error::FormatInvalid(format!("invalid document url {s:?}")))?;
        let partition: u8 = caps[1]
            .parse()
            .map_err(|e| Error::FormatInvalid(format!("invalid partition in {s:?}: {e}")))?;
        let document = DocumentId::parse(&format!("{DOCUMENT_PREFIX}{}", &caps[2]))?;
        Ok(Self {
            url: s.to_string(),
            partition: Partition::new(partition)?,
            document,
        })
    }

    /// Built by the locator only; the components are valid by construction.
    pub(crate) fn from_parts(base_url: &str, document: DocumentId, partition: Partition) -> Self {
        Self {
            url: format!("{base_url}/DataSet%20{partition}/{document}.pdf"),
            partition,
            document,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }
}

impl TryFrom<String> for DocumentUrl {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DocumentUrl> for String {
    fn from(u: DocumentUrl) -> Self {
        u.url
    }
}

impl fmt::Display for DocumentUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
