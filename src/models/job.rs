use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Reference, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::original_file::{OriginalFile, OriginalFileRecord};

macro_rules! id_resource {
    ($record:ty, $name:literal, $endpoint:literal) => {
        impl Resource for $record {
            const NAME: &'static str = $name;
            const ENDPOINT: &'static str = $endpoint;
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
    };
}

fn original_files<R: Resource>(
    job: &Entity<R>,
    pick: impl Fn(&R) -> Vec<Reference<OriginalFileRecord>>,
) -> Result<Vec<OriginalFile>, RefineError> {
    let references = job.field(pick)?;
    Ok(references
        .into_iter()
        .map(|reference| OriginalFile::from_reference(job.api(), reference))
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderJobRecord {
    pub id: Option<i64>,
    pub downloader_task: Option<String>,
    pub num_retries: Option<i64>,
    pub retried: Option<bool>,
    pub was_recreated: Option<bool>,
    pub worker_id: Option<String>,
    pub ram_amount: Option<i64>,
    pub worker_version: Option<String>,
    pub batch_job_id: Option<String>,
    pub batch_job_queue: Option<String>,
    pub failure_reason: Option<String>,
    pub success: Option<bool>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub original_files: Vec<Reference<OriginalFileRecord>>,
    #[serde(with = "crate::entity::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub is_queued: Option<bool>,
}

id_resource!(DownloaderJobRecord, "DownloaderJob", "jobs/downloader");

/// A job that fetched original files from a source repository.
///
/// Search filters include `downloader_task`, `success`, `num_retries`,
/// `worker_id`, `batch_job_id` and `sample_accession_code`.
pub type DownloaderJob = Entity<DownloaderJobRecord>;

lazy_fields!(DownloaderJobRecord {
    id: Option<i64>,
    downloader_task: Option<String>,
    num_retries: Option<i64>,
    retried: Option<bool>,
    was_recreated: Option<bool>,
    worker_id: Option<String>,
    ram_amount: Option<i64>,
    worker_version: Option<String>,
    batch_job_id: Option<String>,
    batch_job_queue: Option<String>,
    failure_reason: Option<String>,
    success: Option<bool>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
    is_queued: Option<bool>,
});

impl DownloaderJob {
    pub fn original_files(&self) -> Result<Vec<OriginalFile>, RefineError> {
        original_files(self, |record| record.original_files.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorJobRecord {
    pub id: Option<i64>,
    pub pipeline_applied: Option<String>,
    pub num_retries: Option<i64>,
    pub retried: Option<bool>,
    pub worker_id: Option<String>,
    pub ram_amount: Option<i64>,
    pub volume_index: Option<String>,
    pub worker_version: Option<String>,
    pub failure_reason: Option<String>,
    pub batch_job_id: Option<String>,
    pub batch_job_queue: Option<String>,
    pub success: Option<bool>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub original_files: Vec<Reference<OriginalFileRecord>>,
    pub datasets: Option<Value>,
    #[serde(with = "crate::entity::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub is_queued: Option<bool>,
}

id_resource!(ProcessorJobRecord, "ProcessorJob", "jobs/processor");

/// A job that ran a processing pipeline over original files.
///
/// Search filters include `pipeline_applied`, `success`, `num_retries`,
/// `datasets`, `original_files` and `sample_accession_code`.
pub type ProcessorJob = Entity<ProcessorJobRecord>;

lazy_fields!(ProcessorJobRecord {
    id: Option<i64>,
    pipeline_applied: Option<String>,
    num_retries: Option<i64>,
    retried: Option<bool>,
    worker_id: Option<String>,
    ram_amount: Option<i64>,
    volume_index: Option<String>,
    worker_version: Option<String>,
    failure_reason: Option<String>,
    batch_job_id: Option<String>,
    batch_job_queue: Option<String>,
    success: Option<bool>,
    datasets: Option<Value>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
    is_queued: Option<bool>,
});

impl ProcessorJob {
    pub fn original_files(&self) -> Result<Vec<OriginalFile>, RefineError> {
        original_files(self, |record| record.original_files.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyJobRecord {
    pub id: Option<i64>,
    pub source_type: Option<String>,
    pub success: Option<bool>,
    pub ram_amount: Option<i64>,
    #[serde(with = "crate::entity::timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    pub batch_job_id: Option<String>,
    pub batch_job_queue: Option<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub is_queued: Option<bool>,
}

id_resource!(SurveyJobRecord, "SurveyJob", "jobs/survey");

/// A job that surveyed a source database for new experiments.
pub type SurveyJob = Entity<SurveyJobRecord>;

lazy_fields!(SurveyJobRecord {
    id: Option<i64>,
    source_type: Option<String>,
    success: Option<bool>,
    ram_amount: Option<i64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    batch_job_id: Option<String>,
    batch_job_queue: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
    is_queued: Option<bool>,
});
