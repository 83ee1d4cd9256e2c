//! Finding writes and reads.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    Citation, CoverageStats, DocumentId, Finding, FindingId, FindingStatus, ResultPayload,
    UnitId, UnitType,
};
use crate::telemetry::metrics;

/// Result of [`Store::store_finding`](super::Store::store_finding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFinding {
    /// The finding now on record: the one just written, or the one that
    /// already held its id or its unit's accepted slot.
    pub finding_id: FindingId,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub accepted: u64,
    pub disputed: u64,
    pub quarantined: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.accepted + self.disputed + self.quarantined
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FindingRow {
    finding_id: String,
    unit_id: String,
    unit_type: String,
    worker_id: String,
    submitted_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
    status: String,
    result_json: String,
    quorum_count: i64,
    pii_detected: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct CitationRow {
    citation_id: String,
    finding_id: String,
    document_id: String,
    page: Option<i64>,
    quote: Option<String>,
}

pub(super) const FINDING_COLUMNS: &str = "finding_id, unit_id, unit_type, worker_id, submitted_at, \
     validated_at, status, result_json, quorum_count, pii_detected";

/// Reject the whole finding if any citation is malformed.
fn validate_citations(finding: &Finding) -> Result<()> {
    for citation in &finding.citations {
        DocumentId::parse(&citation.document_id)?;
        if citation.finding_id != finding.finding_id {
            return Err(Error::InvalidArgument(format!(
                "citation {} belongs to finding {}, not {}",
                citation.citation_id, citation.finding_id, finding.finding_id
            )));
        }
    }
    Ok(())
}

impl super::Store {
    /// Persist a finding and its citations atomically.
    ///
    /// Idempotent: if the finding id already exists, or the unit already has
    /// an accepted finding, nothing is written and the existing id is returned.
    /// Any malformed citation rejects the entire write.
    pub async fn store_finding(&self, finding: &Finding) -> Result<StoredFinding> {
        validate_citations(finding)?;
        let started = std::time::Instant::now();
        let result_json = serde_json::to_string(&finding.result)?;

        let mut tx = self.pool().begin().await?;

        let inserted: Option<(String,)> = sqlx::query_as(
            "INSERT INTO findings (finding_id, unit_id, unit_type, worker_id, submitted_at, validated_at, status, result_json, quorum_count, pii_detected)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT DO NOTHING
             RETURNING finding_id",
        )
        .bind(finding.finding_id.as_str())
        .bind(finding.unit_id.as_str())
        .bind(finding.unit_type.as_str())
        .bind(&finding.worker_id)
        .bind(finding.submitted_at)
        .bind(finding.validated_at)
        .bind(finding.status.as_str())
        .bind(&result_json)
        .bind(i64::from(finding.quorum_count))
        .bind(finding.pii_detected)
        .fetch_optional(&mut *tx)
        .await?;

        let stored = if inserted.is_some() {
            for citation in &finding.citations {
                insert_citation(&mut tx, citation).await?;
            }
            StoredFinding {
                finding_id: finding.finding_id.clone(),
                created: true,
            }
        } else {
            let existing = existing_for(&mut tx, finding).await?;
            debug!(
                finding_id = %finding.finding_id,
                existing = %existing,
                "finding already on record, nothing written"
            );
            StoredFinding {
                finding_id: existing,
                created: false,
            }
        };

        tx.commit().await?;

        if stored.created {
            info!(
                finding_id = %stored.finding_id,
                unit_id = %finding.unit_id,
                status = %finding.status,
                citations = finding.citations.len(),
                "finding stored"
            );
        }
        metrics::store_writes().add(
            1,
            &[
                KeyValue::new("status", finding.status.as_str()),
                KeyValue::new("created", stored.created.to_string()),
            ],
        );
        metrics::record_duration("store_finding", started);
        Ok(stored)
    }

    pub async fn get_finding(&self, finding_id: &str) -> Result<Finding> {
        let row: Option<FindingRow> = sqlx::query_as(&format!(
            "SELECT {FINDING_COLUMNS} FROM findings WHERE finding_id = ?"
        ))
        .bind(finding_id)
        .fetch_optional(self.pool())
        .await?;
        let row = row.ok_or_else(|| Error::NotFound(format!("finding {finding_id}")))?;
        self.hydrate(row).await
    }

    pub async fn accepted_finding_for_unit(&self, unit_id: &str) -> Result<Option<FindingId>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT finding_id FROM findings WHERE unit_id = ? AND status = 'accepted'",
        )
        .bind(unit_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(id,)| FindingId::from(id)))
    }

    /// Findings with at least one citation of `document_id`, oldest first.
    pub async fn get_findings_for_document(&self, document_id: &str) -> Result<Vec<Finding>> {
        let document = DocumentId::parse(document_id)?;
        let rows: Vec<FindingRow> = sqlx::query_as(&format!(
            "SELECT {FINDING_COLUMNS} FROM findings
             WHERE finding_id IN (SELECT finding_id FROM citations WHERE document_id = ?)
             ORDER BY submitted_at, finding_id"
        ))
        .bind(document.to_string())
        .fetch_all(self.pool())
        .await?;
        self.hydrate_all(rows).await
    }

    /// Accepted share of all findings recorded for `unit_type`.
    pub async fn get_coverage(&self, unit_type: UnitType) -> Result<CoverageStats> {
        let (total, accepted): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'accepted' THEN 1 ELSE 0 END), 0)
             FROM findings WHERE unit_type = ?",
        )
        .bind(unit_type.as_str())
        .fetch_one(self.pool())
        .await?;
        Ok(CoverageStats::new(
            unit_type,
            accepted.max(0) as u64,
            total.max(0) as u64,
        ))
    }

    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM findings GROUP BY status")
                .fetch_all(self.pool())
                .await?;
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            let n = n.max(0) as u64;
            match status.parse::<FindingStatus>()? {
                FindingStatus::Pending => counts.pending = n,
                FindingStatus::Accepted => counts.accepted = n,
                FindingStatus::Disputed => counts.disputed = n,
                FindingStatus::Quarantined => counts.quarantined = n,
            }
        }
        Ok(counts)
    }

    pub(super) async fn hydrate_all(&self, rows: Vec<FindingRow>) -> Result<Vec<Finding>> {
        let mut findings = Vec::with_capacity(rows.len());
        for row in rows {
            findings.push(self.hydrate(row).await?);
        }
        Ok(findings)
    }

    async fn hydrate(&self, row: FindingRow) -> Result<Finding> {
        let citations: Vec<CitationRow> = sqlx::query_as(
            "SELECT citation_id, finding_id, document_id, page, quote
             FROM citations WHERE finding_id = ? ORDER BY rowid",
        )
        .bind(&row.finding_id)
        .fetch_all(self.pool())
        .await?;

        Ok(Finding {
            finding_id: FindingId::from(row.finding_id),
            unit_id: UnitId::from(row.unit_id),
            unit_type: row.unit_type.parse()?,
            worker_id: row.worker_id,
            submitted_at: row.submitted_at,
            validated_at: row.validated_at,
            status: row.status.parse()?,
            result: ResultPayload::from_stored(&row.result_json),
            quorum_count: u32::try_from(row.quorum_count).unwrap_or(0),
            pii_detected: row.pii_detected,
            citations: citations
                .into_iter()
                .map(|c| Citation {
                    citation_id: c.citation_id,
                    finding_id: FindingId::from(c.finding_id),
                    document_id: c.document_id,
                    page: c.page.and_then(|p| u32::try_from(p).ok()),
                    quote: c.quote,
                })
                .collect(),
        })
    }
}

async fn insert_citation(tx: &mut Transaction<'_, Sqlite>, citation: &Citation) -> Result<()> {
    sqlx::query(
        "INSERT INTO citations (citation_id, finding_id, document_id, page, quote)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (citation_id) DO NOTHING",
    )
    .bind(&citation.citation_id)
    .bind(citation.finding_id.as_str())
    .bind(&citation.document_id)
    .bind(citation.page.map(i64::from))
    .bind(&citation.quote)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The finding that blocked an insert: same id first, else the unit's accepted one.
async fn existing_for(tx: &mut Transaction<'_, Sqlite>, finding: &Finding) -> Result<FindingId> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT finding_id FROM findings
         WHERE finding_id = ? OR (unit_id = ? AND status = 'accepted')
         ORDER BY finding_id = ? DESC
         LIMIT 1",
    )
    .bind(finding.finding_id.as_str())
    .bind(finding.unit_id.as_str())
    .bind(finding.finding_id.as_str())
    .fetch_optional(&mut **tx)
    .await?;
    row.map(|(id,)| FindingId::from(id)).ok_or_else(|| {
        Error::Other(format!(
            "insert of finding {} conflicted but no existing row was found",
            finding.finding_id
        ))
    })
}
