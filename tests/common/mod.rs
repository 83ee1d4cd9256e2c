//! Shared fixtures for integration tests.

#![allow(dead_code)]

use casework::catalog::{Catalog, CitedRef, ClaimRecord, PartitionRange, RelationshipRecord};
use casework::model::{
    CitedDocument, DocumentId, DocumentNumber, Partition, ResultPayload, Submission, UnitId,
    Verdict,
};
use chrono::NaiveDate;
use serde_json::Map;

pub fn partition(n: u8) -> Partition {
    Partition::new(n).unwrap()
}

pub fn number(n: u32) -> DocumentNumber {
    DocumentNumber::new(n).unwrap()
}

pub fn doc(n: u32) -> DocumentId {
    DocumentId::from_number(number(n))
}

pub fn range(p: u8, start: u32, end: u32) -> PartitionRange {
    PartitionRange::new(partition(p), number(start), number(end)).unwrap()
}

pub fn claim(id: &str, docs: &[(u32, Option<u8>)]) -> ClaimRecord {
    ClaimRecord {
        claim_id: id.to_string(),
        claim: format!("Claim {id} is supported by the cited records."),
        cited: docs
            .iter()
            .map(|&(n, p)| CitedRef {
                document: doc(n),
                partition: p.map(partition),
            })
            .collect(),
        source_verified: false,
    }
}

pub fn relationship(date: NaiveDate, n: u32, p: u8) -> RelationshipRecord {
    RelationshipRecord {
        date,
        document: doc(n),
        partition: Some(partition(p)),
        relationship_type: Some("correspondence".to_string()),
        source_entity: Some("entity-a".to_string()),
        target_entity: Some("entity-b".to_string()),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `count` references in partition 9, one per document, all in January 2005.
pub fn january_relationships(first_doc: u32, count: u32) -> Vec<RelationshipRecord> {
    (0..count)
        .map(|i| relationship(date(2005, 1, 1 + i % 28), first_doc + i, 9))
        .collect()
}

/// Partition 9 covers 39000..=40999; one claim cites EFTA00039186.
pub fn single_claim_catalog() -> Catalog {
    Catalog {
        claims: vec![claim("c-1", &[(39186, Some(9))])],
        relationships: Vec::new(),
        ranges: vec![range(9, 39_000, 40_999)],
        entities: Vec::new(),
    }
}

pub fn verified(documents: &[&str]) -> ResultPayload {
    ResultPayload::VerifyFinding {
        verdict: Verdict::Verified,
        reasoning: "The cited record supports the claim as written.".to_string(),
        citations: documents
            .iter()
            .map(|d| CitedDocument {
                document: d.to_string(),
                page: Some(1),
                quote: None,
            })
            .collect(),
        extensions: Map::new(),
    }
}

pub fn submission(unit_id: &UnitId, worker: &str, result: ResultPayload) -> Submission {
    Submission {
        unit_id: unit_id.clone(),
        worker_id: worker.to_string(),
        result,
    }
}
