//! Which documents a citation may point at.

use std::collections::HashSet;

use crate::catalog::{Catalog, PartitionRange};
use crate::model::{CitedDocument, DocumentId};

/// Known documents: anything inside a partition range, any entity id or alias
/// written as a document identifier, and every document a relationship record
/// references. Citations must be well-formed before they are looked up.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    ranges: Vec<PartitionRange>,
    entities: HashSet<String>,
    related: HashSet<DocumentId>,
}

impl ProvenanceIndex {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let entities = catalog
            .entities
            .iter()
            .flat_map(|e| std::iter::once(e.entity_id.clone()).chain(e.aliases.iter().cloned()))
            .collect();
        let related = catalog.relationships.iter().map(|r| r.document).collect();
        Self {
            ranges: catalog.ranges.clone(),
            entities,
            related,
        }
    }

    /// Whether a well-formed identifier points at a known document.
    pub fn is_known(&self, id: DocumentId) -> bool {
        self.related.contains(&id)
            || self.entities.contains(&id.to_string())
            || self.ranges.iter().any(|r| r.contains(id.number()))
    }

    /// One error per citation that is malformed or unknown.
    pub fn check(&self, cited: &[CitedDocument]) -> Vec<String> {
        cited
            .iter()
            .filter_map(|c| match DocumentId::parse(&c.document) {
                Err(_) => Some(format!(
                    "citation {:?} is not a valid document identifier",
                    c.document
                )),
                Ok(id) if !self.is_known(id) => {
                    Some(format!("citation {id} does not match any known document"))
                }
                Ok(_) => None,
            })
            .collect()
    }
}
