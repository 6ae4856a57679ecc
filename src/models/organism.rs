use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Resource, lazy_fields};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismRecord {
    pub name: Option<String>,
    pub taxonomy_id: Option<i64>,
    pub has_compendia: Option<bool>,
    pub has_quantfile_compendia: Option<bool>,
}

impl Resource for OrganismRecord {
    const NAME: &'static str = "Organism";
    const ENDPOINT: &'static str = "organisms";
    type Key = String;

    fn key(&self) -> Option<String> {
        self.name.clone()
    }

    fn keyed(name: String) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }
}

/// An organism, keyed by its upper-case scientific name (e.g. `HOMO_SAPIENS`).
///
/// Search filters: `has_compendia`, `has_quantfile_compendia`.
pub type Organism = Entity<OrganismRecord>;

lazy_fields!(OrganismRecord {
    name: Option<String>,
    taxonomy_id: Option<i64>,
    has_compendia: Option<bool>,
    has_quantfile_compendia: Option<bool>,
});
