use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Reference, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::annotation::Annotation;
use crate::models::computational_result::{ComputationalResult, ComputationalResultRecord};
use crate::models::computed_file::{ComputedFile, ComputedFileRecord};
use crate::models::experiment::Experiment;
use crate::models::job::{DownloaderJob, DownloaderJobRecord, ProcessorJob, ProcessorJobRecord};
use crate::models::organism::{Organism, OrganismRecord};
use crate::models::original_file::{OriginalFile, OriginalFileRecord};
use crate::pagination::Filters;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub accession_code: Option<String>,
    pub source_database: Option<String>,
    pub organism: Option<OrganismRecord>,
    pub platform_accession_code: Option<String>,
    pub platform_name: Option<String>,
    pub pretty_platform: Option<String>,
    pub technology: Option<String>,
    pub manufacturer: Option<String>,
    pub protocol_info: Option<Value>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub annotations: Vec<Annotation>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub results: Vec<ComputationalResultRecord>,
    pub source_archive_url: Option<String>,
    pub has_raw: Option<bool>,
    pub sex: Option<String>,
    pub age: Option<f64>,
    pub specimen_part: Option<String>,
    pub genotype: Option<String>,
    pub disease: Option<String>,
    pub disease_stage: Option<String>,
    pub cell_line: Option<String>,
    pub treatment: Option<String>,
    pub race: Option<String>,
    pub subject: Option<String>,
    pub compound: Option<String>,
    pub time: Option<String>,
    pub is_processed: Option<bool>,
    pub is_unable_to_be_processed: Option<bool>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub contributed_metadata: Option<Value>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub contributed_keywords: Vec<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub original_files: Vec<Reference<OriginalFileRecord>>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub computed_files: Vec<Reference<ComputedFileRecord>>,
    pub last_processor_job: Option<ProcessorJobRecord>,
    pub last_downloader_job: Option<DownloaderJobRecord>,
    pub most_recent_smashable_file: Option<Reference<ComputedFileRecord>>,
    pub most_recent_quant_file: Option<Reference<ComputedFileRecord>>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub experiment_accession_codes: Vec<String>,
}

impl Resource for SampleRecord {
    const NAME: &'static str = "Sample";
    const ENDPOINT: &'static str = "samples";
    type Key = String;

    fn key(&self) -> Option<String> {
        self.accession_code.clone()
    }

    fn keyed(accession_code: String) -> Self {
        Self {
            accession_code: Some(accession_code),
            ..Self::default()
        }
    }
}

/// A sample, keyed by accession code (e.g. `GSM1234`).
///
/// Search filters include `title`, `organism__name`, `source_database`,
/// `has_raw`, `platform_name`, `technology`, `sex`, `age`, `specimen_part`,
/// `disease`, `is_processed`, `dataset_id`, `experiment_accession_code` and
/// `accession_codes`.
pub type Sample = Entity<SampleRecord>;

lazy_fields!(SampleRecord {
    id: Option<i64>,
    title: Option<String>,
    accession_code: Option<String>,
    source_database: Option<String>,
    platform_accession_code: Option<String>,
    platform_name: Option<String>,
    pretty_platform: Option<String>,
    technology: Option<String>,
    manufacturer: Option<String>,
    protocol_info: Option<Value>,
    annotations: Vec<Annotation>,
    source_archive_url: Option<String>,
    has_raw: Option<bool>,
    sex: Option<String>,
    age: Option<f64>,
    specimen_part: Option<String>,
    genotype: Option<String>,
    disease: Option<String>,
    disease_stage: Option<String>,
    cell_line: Option<String>,
    treatment: Option<String>,
    race: Option<String>,
    subject: Option<String>,
    compound: Option<String>,
    time: Option<String>,
    is_processed: Option<bool>,
    is_unable_to_be_processed: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
    contributed_metadata: Option<Value>,
    contributed_keywords: Vec<String>,
    experiment_accession_codes: Vec<String>,
});

impl Sample {
    pub fn organism(&self) -> Result<Option<Organism>, RefineError> {
        let record = self.field(|record| record.organism.clone())?;
        Ok(record.map(|record| Organism::from_record(self.api(), record)))
    }

    pub fn results(&self) -> Result<Vec<ComputationalResult>, RefineError> {
        let records = self.field(|record| record.results.clone())?;
        Ok(records
            .into_iter()
            .map(|record| ComputationalResult::from_record(self.api(), record))
            .collect())
    }

    pub fn original_files(&self) -> Result<Vec<OriginalFile>, RefineError> {
        let references = self.field(|record| record.original_files.clone())?;
        Ok(references
            .into_iter()
            .map(|reference| OriginalFile::from_reference(self.api(), reference))
            .collect())
    }

    pub fn computed_files(&self) -> Result<Vec<ComputedFile>, RefineError> {
        let references = self.field(|record| record.computed_files.clone())?;
        Ok(references
            .into_iter()
            .map(|reference| ComputedFile::from_reference(self.api(), reference))
            .collect())
    }

    pub fn last_processor_job(&self) -> Result<Option<ProcessorJob>, RefineError> {
        let record = self.field(|record| record.last_processor_job.clone())?;
        Ok(record.map(|record| ProcessorJob::from_record(self.api(), record)))
    }

    pub fn last_downloader_job(&self) -> Result<Option<DownloaderJob>, RefineError> {
        let record = self.field(|record| record.last_downloader_job.clone())?;
        Ok(record.map(|record| DownloaderJob::from_record(self.api(), record)))
    }

    pub fn most_recent_smashable_file(&self) -> Result<Option<ComputedFile>, RefineError> {
        let reference = self.field(|record| record.most_recent_smashable_file.clone())?;
        Ok(reference.map(|reference| ComputedFile::from_reference(self.api(), reference)))
    }

    pub fn most_recent_quant_file(&self) -> Result<Option<ComputedFile>, RefineError> {
        let reference = self.field(|record| record.most_recent_quant_file.clone())?;
        Ok(reference.map(|reference| ComputedFile::from_reference(self.api(), reference)))
    }

    /// Looks up the experiments this sample belongs to by accession code.
    pub fn experiments(&self) -> Result<Vec<Experiment>, RefineError> {
        let codes = self.experiment_accession_codes()?;
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let filters = Filters::new().with_all("accession_code", &codes);
        let experiments = Experiment::search(self.api(), &filters)?;
        experiments.iter().collect()
    }
}
