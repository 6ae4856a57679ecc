use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::annotation::Annotation;
use crate::models::computed_file::{ComputedFile, ComputedFileRecord};
use crate::models::processor::{Processor, ProcessorRecord};
use crate::models::transcriptome_index::{TranscriptomeIndex, TranscriptomeIndexRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputationalResultRecord {
    pub id: Option<i64>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub commands: Vec<String>,
    pub processor: Option<ProcessorRecord>,
    pub is_ccdl: Option<bool>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub annotations: Vec<Annotation>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub files: Vec<ComputedFileRecord>,
    pub organism_index: Option<TranscriptomeIndexRecord>,
    #[serde(with = "crate::entity::timestamp")]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub time_end: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Resource for ComputationalResultRecord {
    const NAME: &'static str = "ComputationalResult";
    const ENDPOINT: &'static str = "computational_results";
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

/// The outcome of running one processor. Search filter: `processor__id`.
pub type ComputationalResult = Entity<ComputationalResultRecord>;

lazy_fields!(ComputationalResultRecord {
    id: Option<i64>,
    commands: Vec<String>,
    is_ccdl: Option<bool>,
    annotations: Vec<Annotation>,
    time_start: Option<DateTime<Utc>>,
    time_end: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
});

impl ComputationalResult {
    pub fn processor(&self) -> Result<Option<Processor>, RefineError> {
        let record = self.field(|record| record.processor.clone())?;
        Ok(record.map(|record| Processor::from_record(self.api(), record)))
    }

    pub fn files(&self) -> Result<Vec<ComputedFile>, RefineError> {
        let records = self.field(|record| record.files.clone())?;
        Ok(records
            .into_iter()
            .map(|record| ComputedFile::from_record(self.api(), record))
            .collect())
    }

    pub fn organism_index(&self) -> Result<Option<TranscriptomeIndex>, RefineError> {
        let record = self.field(|record| record.organism_index.clone())?;
        Ok(record.map(|record| TranscriptomeIndex::from_record(self.api(), record)))
    }
}
