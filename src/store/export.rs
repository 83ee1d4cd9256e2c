//! Public snapshots of the findings store.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use super::findings::{FINDING_COLUMNS, FindingRow};
use crate::error::{Error, Result};
use crate::model::{Finding, FindingStatus, UnitType};

/// License marker attached to every export.
pub const LICENSE: &str = "CC0-1.0";

const CSV_HEADER: [&str; 12] = [
    "finding_id",
    "unit_id",
    "unit_type",
    "worker_id",
    "submitted_at",
    "validated_at",
    "status",
    "quorum_count",
    "pii_detected",
    "cited_documents",
    "result",
    "license",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::InvalidArgument(format!(
                "unsupported export format {other:?}; supported: json, csv"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        })
    }
}

/// Restrict an export. Quarantined findings are only included when `status`
/// asks for them explicitly.
#[derive(Debug, Clone, Default)]
pub struct ExportFilters {
    pub status: Option<FindingStatus>,
    pub unit_type: Option<UnitType>,
    pub worker_id: Option<String>,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    license: &'static str,
    findings: &'a [Finding],
}

impl super::Store {
    pub async fn export(&self, format: ExportFormat, filters: &ExportFilters) -> Result<Vec<u8>> {
        let findings = self.select_for_export(filters).await?;
        let bytes = match format {
            ExportFormat::Json => serde_json::to_vec_pretty(&JsonExport {
                license: LICENSE,
                findings: &findings,
            })?,
            ExportFormat::Csv => to_csv(&findings)?,
        };
        info!(%format, findings = findings.len(), bytes = bytes.len(), "export written");
        Ok(bytes)
    }

    async fn select_for_export(&self, filters: &ExportFilters) -> Result<Vec<Finding>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {FINDING_COLUMNS} FROM findings WHERE 1 = 1"));

        match filters.status {
            Some(status) => {
                qb.push(" AND status = ").push_bind(status.as_str());
            }
            None => {
                qb.push(" AND status <> ")
                    .push_bind(FindingStatus::Quarantined.as_str());
            }
        }
        if let Some(unit_type) = filters.unit_type {
            qb.push(" AND unit_type = ").push_bind(unit_type.as_str());
        }
        if let Some(worker_id) = &filters.worker_id {
            qb.push(" AND worker_id = ").push_bind(worker_id.clone());
        }
        qb.push(" ORDER BY submitted_at, finding_id");

        let rows: Vec<FindingRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        self.hydrate_all(rows).await
    }
}

fn to_csv(findings: &[Finding]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for f in findings {
        let cited = f
            .citations
            .iter()
            .map(|c| c.document_id.as_str())
            .collect::<Vec<_>>()
            .join(";");
        writer.write_record([
            f.finding_id.to_string(),
            f.unit_id.to_string(),
            f.unit_type.to_string(),
            f.worker_id.clone(),
            f.submitted_at.to_rfc3339(),
            f.validated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            f.status.to_string(),
            f.quorum_count.to_string(),
            f.pii_detected.to_string(),
            cited,
            serde_json::to_string(&f.result)?,
            LICENSE.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}
