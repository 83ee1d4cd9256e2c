//! Backing records the generator and validator work from.
//!
//! The catalog is the ingest boundary: claims, relationship references,
//! partition ranges and entities arrive here already parsed. Nothing past this
//! module reads raw files.

use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{DocumentId, DocumentNumber, Partition};

pub const CLAIMS_FILE: &str = "claims.json";
pub const RELATIONSHIPS_FILE: &str = "relationships.json";
pub const PARTITION_RANGES_FILE: &str = "partition_ranges.json";
pub const ENTITIES_FILE: &str = "entities.json";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A document a claim cites, optionally with the partition it was filed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedRef {
    #[serde(alias = "efta_number", alias = "efta")]
    pub document: DocumentId,
    #[serde(default, alias = "dataset")]
    pub partition: Option<Partition>,
}

/// One checkable statement drawn from prior research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(alias = "id")]
    pub claim_id: String,
    #[serde(alias = "text")]
    pub claim: String,
    #[serde(default, alias = "cited_eftas", alias = "citations")]
    pub cited: Vec<CitedRef>,
    #[serde(default)]
    pub source_verified: bool,
}

/// A dated reference linking two entities through one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub date: NaiveDate,
    #[serde(
        alias = "efta_number",
        alias = "efta",
        alias = "source_efta",
        alias = "efta_source",
        alias = "document_id"
    )]
    pub document: DocumentId,
    #[serde(default, alias = "dataset")]
    pub partition: Option<Partition>,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub source_entity: Option<String>,
    #[serde(default)]
    pub target_entity: Option<String>,
}

/// Inclusive span of document numbers filed under one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRange {
    #[serde(alias = "dataset", alias = "dataset_number")]
    pub partition: Partition,
    #[serde(alias = "range_start", alias = "efta_start")]
    pub start: DocumentNumber,
    #[serde(alias = "range_end", alias = "efta_end")]
    pub end: DocumentNumber,
}

impl PartitionRange {
    pub fn new(partition: Partition, start: DocumentNumber, end: DocumentNumber) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "partition {partition} range starts after it ends ({start} > {end})"
            )));
        }
        Ok(Self {
            partition,
            start,
            end,
        })
    }

    pub fn contains(&self, number: DocumentNumber) -> bool {
        self.start <= number && number <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(alias = "id")]
    pub entity_id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub claims: Vec<ClaimRecord>,
    pub relationships: Vec<RelationshipRecord>,
    pub ranges: Vec<PartitionRange>,
    pub entities: Vec<EntityRecord>,
}

impl Catalog {
    /// Load every record file from `dir`.
    ///
    /// A missing file is an empty list. A file that is not a JSON array is an
    /// error. Individual records that fail to decode are skipped with a warning.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let ranges: Vec<PartitionRange> = load_records(&dir.join(PARTITION_RANGES_FILE))?;
        let ranges = ranges
            .into_iter()
            .filter(|r| {
                let ok = r.start <= r.end;
                if !ok {
                    warn!(partition = %r.partition, start = %r.start, end = %r.end, "dropping inverted partition range");
                }
                ok
            })
            .collect();

        let catalog = Self {
            claims: load_records(&dir.join(CLAIMS_FILE))?,
            relationships: load_records(&dir.join(RELATIONSHIPS_FILE))?,
            ranges,
            entities: load_records(&dir.join(ENTITIES_FILE))?,
        };
        debug!(
            claims = catalog.claims.len(),
            relationships = catalog.relationships.len(),
            ranges = catalog.ranges.len(),
            entities = catalog.entities.len(),
            dir = %dir.display(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "record file missing, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let values: Vec<serde_json::Value> = serde_json::from_str(&text)?;
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), index, error = %e, "skipping malformed record"),
        }
    }
    Ok(records)
}
