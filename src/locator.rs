//! Document location: canonical URLs and partition gap resolution.
//!
//! Upstream filing is inconsistent, so a document is not always in the
//! partition its number says it should be in. [`Locator::resolve`] tries the
//! primary partition and then its neighbours before calling a document missing.
//! The existence check is injected; the locator itself never does I/O.

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::PartitionRange;
use crate::error::{Error, Result};
use crate::model::{DocumentId, DocumentNumber, DocumentUrl, Partition};
use crate::telemetry::metrics;

pub const DEFAULT_BASE_URL: &str = "https://www.justice.gov/epstein/files";

/// Answers whether a URL points at a retrievable document.
///
/// Production wiring performs a real request at the boundary; tests pass a
/// closure.
pub trait ExistenceCheck {
    fn exists(&self, url: &DocumentUrl) -> bool;
}

impl<F> ExistenceCheck for F
where
    F: Fn(&DocumentUrl) -> bool,
{
    fn exists(&self, url: &DocumentUrl) -> bool {
        self(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub document: DocumentId,
    pub found: bool,
    pub url: Option<DocumentUrl>,
    pub partition: Option<Partition>,
    /// The document was found, but not in its primary partition.
    pub was_adjacent: bool,
    /// Every reachable candidate partition was tried and none had it.
    pub genuinely_missing: bool,
}

#[derive(Debug, Clone)]
pub struct Locator {
    base_url: String,
    ranges: Vec<PartitionRange>,
}

impl Locator {
    /// Fails with `FormatInvalid` when URLs built on `base_url` would not
    /// parse back as canonical document URLs.
    pub fn new(base_url: impl Into<String>, ranges: Vec<PartitionRange>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let sample = DocumentUrl::from_parts(
            &base_url,
            DocumentId::from_number(DocumentNumber::new(0)?),
            Partition::new(1)?,
        );
        DocumentUrl::parse(sample.as_str()).map_err(|_| {
            Error::FormatInvalid(format!(
                "base url {base_url:?} does not yield canonical document urls (expected https://<host>/.../files)"
            ))
        })?;
        Ok(Self { base_url, ranges })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, document: DocumentNumber, partition: Partition) -> DocumentUrl {
        DocumentUrl::from_parts(&self.base_url, DocumentId::from_number(document), partition)
    }

    /// Smallest partition whose range covers `document`, if any.
    pub fn get_primary_partition(&self, document: DocumentNumber) -> Option<Partition> {
        self.ranges
            .iter()
            .filter(|r| r.contains(document))
            .map(|r| r.partition)
            .min()
    }

    /// Candidate partitions in the order they are tried.
    pub fn candidates(primary: Partition) -> Vec<Partition> {
        let p = i32::from(primary.get());
        [p, p - 1, p + 1]
            .into_iter()
            .filter_map(Partition::checked)
            .collect()
    }

    pub fn resolve(
        &self,
        document: DocumentNumber,
        primary: Partition,
        exists: &dyn ExistenceCheck,
    ) -> ResolutionResult {
        let id = DocumentId::from_number(document);

        for candidate in Self::candidates(primary) {
            let url = self.build_url(document, candidate);
            if !exists.exists(&url) {
                debug!(document = %id, partition = %candidate, "not in candidate partition");
                continue;
            }

            let was_adjacent = candidate != primary;
            if was_adjacent {
                info!(document = %id, primary = %primary, found_in = %candidate, "document found in adjacent partition");
            }
            metrics::gap_resolutions().add(
                1,
                &[KeyValue::new(
                    "result",
                    if was_adjacent { "adjacent" } else { "primary" },
                )],
            );
            return ResolutionResult {
                document: id,
                found: true,
                url: Some(url),
                partition: Some(candidate),
                was_adjacent,
                genuinely_missing: false,
            };
        }

        warn!(document = %id, primary = %primary, "document missing from primary and adjacent partitions");
        metrics::gap_resolutions().add(1, &[KeyValue::new("result", "missing")]);
        ResolutionResult {
            document: id,
            found: false,
            url: None,
            partition: None,
            was_adjacent: false,
            genuinely_missing: true,
        }
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ranges: Vec::new(),
        }
    }
}
