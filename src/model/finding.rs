//! Findings: validated worker results and the citations backing them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::unit::{UnitId, UnitType};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FindingId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingId(String);

impl FindingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for FindingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FindingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FindingStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pending,
    Accepted,
    Disputed,
    /// Flagged by the PII scan. Recorded but excluded from default exports.
    Quarantined,
}

impl FindingStatus {
    pub const ALL: [FindingStatus; 4] = [
        FindingStatus::Pending,
        FindingStatus::Accepted,
        FindingStatus::Disputed,
        FindingStatus::Quarantined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FindingStatus::Pending => "pending",
            FindingStatus::Accepted => "accepted",
            FindingStatus::Disputed => "disputed",
            FindingStatus::Quarantined => "quarantined",
        }
    }
}

impl FromStr for FindingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(FindingStatus::Pending),
            "accepted" => Ok(FindingStatus::Accepted),
            "disputed" => Ok(FindingStatus::Disputed),
            "quarantined" => Ok(FindingStatus::Quarantined),
            other => Err(Error::InvalidArgument(format!(
                "unknown finding status {other:?}"
            ))),
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Result payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    Disputed,
    InsufficientEvidence,
}

/// A document reference inside a worker's result.
///
/// `document` stays a plain string here: malformed identifiers must reach the
/// provenance check and come back as itemized errors, not as a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedDocument {
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

/// One edge of a decision chain's communication graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEdge {
    pub from: String,
    pub to: String,
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// A worker's result, tagged by the unit type it answers.
///
/// Unknown keys land in `extensions` so newer workers can add fields without
/// breaking older validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit_type", rename_all = "snake_case")]
pub enum ResultPayload {
    VerifyFinding {
        verdict: Verdict,
        #[serde(default)]
        reasoning: String,
        #[serde(default)]
        citations: Vec<CitedDocument>,
        #[serde(flatten)]
        extensions: Map<String, Value>,
    },
    DecisionChain {
        #[serde(default)]
        communication_graph: Vec<ChainEdge>,
        #[serde(default)]
        patterns_observed: Vec<String>,
        #[serde(flatten)]
        extensions: Map<String, Value>,
    },
    /// A stored payload this build cannot decode. Only produced on load.
    #[serde(skip_deserializing)]
    Unrecognized { raw: String },
}

impl ResultPayload {
    /// Decode a payload read back from storage, keeping undecodable text as-is.
    pub fn from_stored(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| ResultPayload::Unrecognized {
            raw: raw.to_string(),
        })
    }

    pub fn unit_type(&self) -> Option<UnitType> {
        match self {
            ResultPayload::VerifyFinding { .. } => Some(UnitType::VerifyFinding),
            ResultPayload::DecisionChain { .. } => Some(UnitType::DecisionChain),
            ResultPayload::Unrecognized { .. } => None,
        }
    }

    /// Every document identifier the payload cites, in order of appearance.
    pub fn cited_documents(&self) -> Vec<CitedDocument> {
        match self {
            ResultPayload::VerifyFinding { citations, .. } => citations.clone(),
            ResultPayload::DecisionChain {
                communication_graph,
                ..
            } => communication_graph
                .iter()
                .map(|edge| CitedDocument {
                    document: edge.document.clone(),
                    page: None,
                    quote: None,
                })
                .collect(),
            ResultPayload::Unrecognized { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Finding and Citation
// ---------------------------------------------------------------------------

/// Supporting reference attached to a finding.
///
/// The document identifier is checked by the store before anything is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub citation_id: String,
    pub finding_id: FindingId,
    pub document_id: String,
    pub page: Option<u32>,
    pub quote: Option<String>,
}

impl Citation {
    pub fn new(finding_id: &FindingId, cited: &CitedDocument) -> Self {
        Self {
            citation_id: Uuid::new_v4().to_string(),
            finding_id: finding_id.clone(),
            document_id: cited.document.clone(),
            page: cited.page,
            quote: cited.quote.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: FindingId,
    pub unit_id: UnitId,
    pub unit_type: UnitType,
    pub worker_id: String,
    pub submitted_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub status: FindingStatus,
    pub result: ResultPayload,
    pub quorum_count: u32,
    pub pii_detected: bool,
    pub citations: Vec<Citation>,
}

/// Accepted share of all findings recorded for one unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub unit_type: UnitType,
    pub completed: u64,
    pub total: u64,
    /// Always within 0.0..=100.0, rounded to two decimals.
    pub percent: f64,
}

impl CoverageStats {
    pub fn new(unit_type: UnitType, completed: u64, total: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            let raw = completed.min(total) as f64 / total as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        Self {
            unit_type,
            completed,
            total,
            percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Submission and validation outcome
// ---------------------------------------------------------------------------

/// A worker's result for one assigned unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub unit_id: UnitId,
    pub worker_id: String,
    pub result: ResultPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumStatus {
    Achieved,
}

/// What the validator decided, in the shape the transport layer returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub quorum_status: QuorumStatus,
    pub pii_detected: bool,
    pub errors: Vec<String>,
    pub finding_id: Option<FindingId>,
    /// Status of the recorded finding; `None` when nothing was persisted.
    pub status: Option<FindingStatus>,
}

impl ValidationOutcome {
    pub(crate) fn accepted(finding_id: FindingId) -> Self {
        Self {
            accepted: true,
            quorum_status: QuorumStatus::Achieved,
            pii_detected: false,
            errors: Vec::new(),
            finding_id: Some(finding_id),
            status: Some(FindingStatus::Accepted),
        }
    }

    pub(crate) fn quarantined(finding_id: FindingId, errors: Vec<String>) -> Self {
        Self {
            accepted: false,
            quorum_status: QuorumStatus::Achieved,
            pii_detected: true,
            errors,
            finding_id: Some(finding_id),
            status: Some(FindingStatus::Quarantined),
        }
    }

    pub(crate) fn rejected(errors: Vec<String>) -> Self {
        Self {
            accepted: false,
            quorum_status: QuorumStatus::Achieved,
            pii_detected: false,
            errors,
            finding_id: None,
            status: None,
        }
    }

    /// True when the outcome left a row in the store.
    pub fn is_recorded(&self) -> bool {
        self.finding_id.is_some()
    }
}
