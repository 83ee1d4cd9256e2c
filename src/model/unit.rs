//! Work units: the self-contained tasks handed to workers.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{DocumentId, DocumentUrl};
use crate::error::{Error, Result};

/// Appended verbatim to every unit's instructions, whatever its type.
pub const NON_RECOVERY_CLAUSE: &str =
    "Do not attempt to infer or recover redacted content. Analyze patterns only.";

// ---------------------------------------------------------------------------
// UnitId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Fresh id of the form `<prefix>-<12 hex>`.
    pub fn generate(unit_type: UnitType) -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", unit_type.id_prefix(), &hex[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// UnitType
// ---------------------------------------------------------------------------

/// The two kinds of work the generator knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// One claim, its cited documents, and their resolved URLs.
    VerifyFinding,
    /// A batch of document references from one time window.
    DecisionChain,
}

impl UnitType {
    pub const ALL: [UnitType; 2] = [UnitType::VerifyFinding, UnitType::DecisionChain];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitType::VerifyFinding => "verify_finding",
            UnitType::DecisionChain => "decision_chain",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            UnitType::VerifyFinding => "verify",
            UnitType::DecisionChain => "dc",
        }
    }
}

impl FromStr for UnitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verify_finding" => Ok(UnitType::VerifyFinding),
            "decision_chain" => Ok(UnitType::DecisionChain),
            other => Err(Error::InvalidArgument(format!(
                "unknown unit type {other:?}; supported: verify_finding, decision_chain"
            ))),
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UnitState
// ---------------------------------------------------------------------------

/// Assignment lifecycle of a generated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Handed out by the generator, no worker yet.
    Generated,
    /// Claimed by exactly one worker.
    Assigned,
    /// Result recorded. Terminal.
    Completed,
    /// Given up by the caller; backing resource returned to the pool. Terminal.
    Released,
}

impl UnitState {
    pub fn can_transition_to(self, to: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, to),
            (Generated, Assigned)
                | (Assigned, Completed)
                | (Generated, Released)
                | (Assigned, Released)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Released)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitState::Generated => "generated",
            UnitState::Assigned => "assigned",
            UnitState::Completed => "completed",
            UnitState::Released => "released",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Unit metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    Linear,
    Multiplying,
}

/// Hard limits and flags the worker must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub max_output_tokens: u32,
    pub pii_filter: bool,
    pub requires_quorum: bool,
}

/// One document reference inside a decision-chain batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document: DocumentId,
    pub url: DocumentUrl,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
}

/// Type-specific payload of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitInput {
    VerifyFinding {
        claim: String,
        cited_documents: Vec<DocumentId>,
        document_urls: Vec<DocumentUrl>,
        source_verified: bool,
    },
    DecisionChain {
        time_window_start: NaiveDate,
        time_window_end: NaiveDate,
        documents: Vec<DocumentRef>,
    },
}

// ---------------------------------------------------------------------------
// WorkUnit
// ---------------------------------------------------------------------------

/// A unit of analytical work. Regenerated from backing records, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    pub unit_id: UnitId,
    pub unit_type: UnitType,
    /// Research path the unit belongs to (1-5).
    pub path: u8,
    pub difficulty: Difficulty,
    pub scaling: Scaling,
    pub optimal_batch: String,
    pub input: UnitInput,
    pub instructions: String,
    pub constraints: Constraints,
    /// Advisory only. Nothing in the crate acts on expiry.
    pub deadline: DateTime<Utc>,
    pub source_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        use UnitState::*;
        assert!(Generated.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Completed));
        assert!(!Generated.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Assigned));
        assert!(!Completed.can_transition_to(Assigned));
        assert!(!Released.can_transition_to(Assigned));
    }

    #[test]
    fn unknown_unit_type_is_invalid_argument() {
        assert!(matches!(
            "timeline".parse::<UnitType>(),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            "decision_chain".parse::<UnitType>().unwrap(),
            UnitType::DecisionChain
        );
    }

    #[test]
    fn generated_ids_carry_type_prefix() {
        let id = UnitId::generate(UnitType::DecisionChain);
        assert!(id.as_str().starts_with("dc-"));
        assert_eq!(id.as_str().len(), "dc-".len() + 12);
    }
}
