//! Core data model.
//!
//! Documents are addressed by identifier and partition. Work units are handed
//! to workers; the results they send back become findings.

pub mod document;
pub mod finding;
pub mod unit;

pub use document::{DocumentId, DocumentNumber, DocumentUrl, Partition};
pub use finding::{
    ChainEdge, Citation, CitedDocument, CoverageStats, Finding, FindingId, FindingStatus,
    QuorumStatus, ResultPayload, Submission, ValidationOutcome, Verdict,
};
pub use unit::{
    Constraints, Difficulty, DocumentRef, Scaling, UnitId, UnitInput, UnitState, UnitType,
    WorkUnit, NON_RECOVERY_CLAUSE,
};
