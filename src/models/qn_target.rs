use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Api;
use crate::entity::{Entity, Reference, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::computational_result::{ComputationalResult, ComputationalResultRecord};
use crate::models::organism::{Organism, OrganismRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QnTargetRecord {
    /// Part of the URL, not of the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organism_name: Option<String>,
    pub id: Option<i64>,
    pub filename: Option<String>,
    pub size_in_bytes: Option<i64>,
    pub is_qn_target: Option<bool>,
    pub sha1: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_url: Option<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub result: Option<Reference<ComputationalResultRecord>>,
}

impl Resource for QnTargetRecord {
    const NAME: &'static str = "QnTarget";
    const ENDPOINT: &'static str = "qn_targets";
    type Key = String;

    fn key(&self) -> Option<String> {
        self.organism_name.clone()
    }

    fn keyed(organism_name: String) -> Self {
        Self {
            organism_name: Some(organism_name),
            ..Self::default()
        }
    }

    fn restore_key(mut self, organism_name: &String) -> Self {
        self.organism_name = Some(organism_name.clone());
        self
    }
}

/// The quantile-normalization target for one organism, keyed by organism
/// name.
pub type QnTarget = Entity<QnTargetRecord>;

lazy_fields!(QnTargetRecord {
    organism_name: Option<String>,
    id: Option<i64>,
    filename: Option<String>,
    size_in_bytes: Option<i64>,
    is_qn_target: Option<bool>,
    sha1: Option<String>,
    s3_bucket: Option<String>,
    s3_key: Option<String>,
    s3_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
});

impl QnTarget {
    /// Organisms that have a QN target. The endpoint is not paginated.
    pub fn organisms(api: &Api) -> Result<Vec<Organism>, RefineError> {
        let records: Vec<OrganismRecord> = api.get(QnTargetRecord::ENDPOINT, &[])?;
        Ok(records
            .into_iter()
            .map(|record| Organism::from_record(api, record))
            .collect())
    }

    pub fn result(&self) -> Result<Option<ComputationalResult>, RefineError> {
        let reference = self.field(|record| record.result.clone())?;
        Ok(reference.map(|reference| ComputationalResult::from_reference(self.api(), reference)))
    }
}
