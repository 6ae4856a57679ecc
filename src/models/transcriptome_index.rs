use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::computational_result::ComputationalResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptomeIndexRecord {
    pub id: Option<i64>,
    pub assembly_name: Option<String>,
    pub organism_name: Option<String>,
    pub database_name: Option<String>,
    pub release_version: Option<String>,
    pub index_type: Option<String>,
    pub salmon_version: Option<String>,
    pub download_url: Option<String>,
    pub result_id: Option<i64>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Resource for TranscriptomeIndexRecord {
    const NAME: &'static str = "TranscriptomeIndex";
    const ENDPOINT: &'static str = "transcriptome_indices";
    type Key = i64;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn keyed(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// A salmon index for one organism.
///
/// Search filters: `salmon_version`, `index_type` (`TRANSCRIPTOME_LONG` or
/// `TRANSCRIPTOME_SHORT`), `length` (`long`/`short`), `organism__name`.
pub type TranscriptomeIndex = Entity<TranscriptomeIndexRecord>;

lazy_fields!(TranscriptomeIndexRecord {
    id: Option<i64>,
    assembly_name: Option<String>,
    organism_name: Option<String>,
    database_name: Option<String>,
    release_version: Option<String>,
    index_type: Option<String>,
    salmon_version: Option<String>,
    download_url: Option<String>,
    result_id: Option<i64>,
    last_modified: Option<DateTime<Utc>>,
});

impl TranscriptomeIndex {
    /// The result that produced this index, as an unfetched reference.
    pub fn result(&self) -> Result<Option<ComputationalResult>, RefineError> {
        let id = self.result_id()?;
        Ok(id.map(|id| ComputationalResult::reference(self.api(), id)))
    }
}
