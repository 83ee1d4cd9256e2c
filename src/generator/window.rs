//! Time-window pool backing `decision_chain` units.
//!
//! References are bucketed into 30-day windows anchored at the earliest date
//! still available. A window qualifies once it holds `MIN_BATCH` distinct
//! documents nobody is working on; the batch is capped at `MAX_BATCH`.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::warn;

use super::MEDIA_PARTITION;
use crate::catalog::RelationshipRecord;
use crate::locator::Locator;
use crate::model::{
    Constraints, Difficulty, DocumentId, DocumentRef, NON_RECOVERY_CLAUSE, Scaling, UnitId,
    UnitInput, UnitType, WorkUnit,
};

pub const WINDOW_DAYS: i64 = 30;
pub const MIN_BATCH: usize = 20;
pub const MAX_BATCH: usize = 50;

const PATH: u8 = 3;
const OPTIMAL_BATCH: &str = "20-50 docs (same 30-day period)";
const CONSTRAINTS: Constraints = Constraints {
    max_output_tokens: 8000,
    pii_filter: true,
    requires_quorum: true,
};

/// A window chosen for one unit.
#[derive(Debug, Clone)]
pub(crate) struct Batch {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub documents: Vec<DocumentRef>,
}

impl Batch {
    pub(crate) fn document_ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.document).collect()
    }

    pub(crate) fn into_unit(self, deadline: DateTime<Utc>) -> WorkUnit {
        WorkUnit {
            unit_id: UnitId::generate(UnitType::DecisionChain),
            unit_type: UnitType::DecisionChain,
            path: PATH,
            difficulty: Difficulty::High,
            scaling: Scaling::Multiplying,
            optimal_batch: OPTIMAL_BATCH.to_string(),
            input: UnitInput::DecisionChain {
                time_window_start: self.start,
                time_window_end: self.end,
                documents: self.documents,
            },
            instructions: instructions(),
            constraints: CONSTRAINTS,
            deadline,
            source_verified: false,
        }
    }
}

/// All located references sorted by date, plus the documents currently out
/// on a live unit.
#[derive(Debug, Default)]
pub(crate) struct WindowPool {
    refs: Vec<DocumentRef>,
    active: HashSet<DocumentId>,
}

impl WindowPool {
    pub(crate) fn new(records: &[RelationshipRecord], locator: &Locator) -> Self {
        let mut refs: Vec<DocumentRef> = records
            .iter()
            .filter_map(|record| locate(record, locator))
            .collect();
        refs.sort_by_key(|r| r.date);
        Self {
            refs,
            active: HashSet::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.refs.len()
    }

    /// Earliest qualifying window, scanning forward from the first available date.
    pub(crate) fn select(&self) -> Option<Batch> {
        let available: Vec<&DocumentRef> = self
            .refs
            .iter()
            .filter(|r| !self.active.contains(&r.document))
            .collect();
        let first = available.first()?.date;
        let last = available.last()?.date;
        let span = Duration::days(WINDOW_DAYS);

        let mut start = first;
        while start <= last {
            let end = start + span;
            let mut seen = HashSet::new();
            let documents: Vec<DocumentRef> = available
                .iter()
                .filter(|r| start <= r.date && r.date < end)
                .filter(|r| seen.insert(r.document))
                .take(MAX_BATCH)
                .map(|r| (*r).clone())
                .collect();
            if documents.len() >= MIN_BATCH {
                return Some(Batch {
                    start,
                    end,
                    documents,
                });
            }
            start = end;
        }
        None
    }

    pub(crate) fn take(&mut self, documents: &[DocumentId]) {
        self.active.extend(documents.iter().copied());
    }

    /// Documents become eligible for future windows again.
    pub(crate) fn give_back(&mut self, documents: &[DocumentId]) {
        for doc in documents {
            self.active.remove(doc);
        }
    }
}

fn locate(record: &RelationshipRecord, locator: &Locator) -> Option<DocumentRef> {
    let partition = record
        .partition
        .or_else(|| locator.get_primary_partition(record.document.number()));
    let Some(partition) = partition else {
        warn!(document = %record.document, "no partition for relationship reference, dropping");
        return None;
    };
    if partition.get() == MEDIA_PARTITION {
        return None;
    }
    Some(DocumentRef {
        document: record.document,
        url: locator.build_url(record.document.number(), partition),
        date: record.date,
        relationship_type: record.relationship_type.clone(),
        source_entity: record.source_entity.clone(),
        target_entity: record.target_entity.clone(),
    })
}

fn instructions() -> String {
    format!(
        "You have a batch of {MIN_BATCH}-{MAX_BATCH} document references from one {WINDOW_DAYS}-day \
         window. Fetch each document from `input.documents[*].url` and map who communicated \
         with whom, and when. Return JSON with `unit_type` set to \"decision_chain\", \
         `communication_graph` (objects with `from`, `to`, `document`, optional `date` and \
         `method`) and `patterns_observed` (list of strings). {NON_RECOVERY_CLAUSE}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, n: u32) -> RelationshipRecord {
        RelationshipRecord {
            date: NaiveDate::from_ymd_opt(2005, 1, day).unwrap(),
            document: DocumentId::parse(&format!("EFTA{n:08}")).unwrap(),
            partition: Some(crate::model::Partition::new(9).unwrap()),
            relationship_type: None,
            source_entity: None,
            target_entity: None,
        }
    }

    #[test]
    fn duplicate_documents_count_once_per_window() {
        // 25 references, but only 15 distinct documents
        let mut records: Vec<_> = (1..=15).map(|n| record(1, n)).collect();
        records.extend((1..=10).map(|n| record(2, n)));
        let pool = WindowPool::new(&records, &Locator::default());
        assert!(pool.select().is_none());
    }

    #[test]
    fn batch_is_capped_and_window_ends_thirty_days_later() {
        let records: Vec<_> = (1..=60).map(|n| record(1 + n % 28, n)).collect();
        let pool = WindowPool::new(&records, &Locator::default());
        let batch = pool.select().unwrap();
        assert_eq!(batch.documents.len(), MAX_BATCH);
        assert_eq!(batch.end - batch.start, Duration::days(WINDOW_DAYS));
    }
}
