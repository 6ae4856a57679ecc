use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Linked, Reference, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::job::{
    DownloaderJob, DownloaderJobRecord, ProcessorJob, ProcessorJobRecord,
};
use crate::models::sample::{Sample, SampleRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginalFileRecord {
    pub id: Option<i64>,
    pub filename: Option<String>,
    pub size_in_bytes: Option<i64>,
    pub sha1: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub samples: Vec<Linked<SampleRecord>>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub processor_jobs: Vec<Reference<ProcessorJobRecord>>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub downloader_jobs: Vec<Reference<DownloaderJobRecord>>,
    pub source_url: Option<String>,
    pub source_filename: Option<String>,
    pub is_downloaded: Option<bool>,
    pub is_archive: Option<bool>,
    pub has_raw: Option<bool>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Resource for OriginalFileRecord {
    const NAME: &'static str = "OriginalFile";
    const ENDPOINT: &'static str = "original_files";
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

/// A raw file as obtained from the source repository.
pub type OriginalFile = Entity<OriginalFileRecord>;

lazy_fields!(OriginalFileRecord {
    id: Option<i64>,
    filename: Option<String>,
    size_in_bytes: Option<i64>,
    sha1: Option<String>,
    source_url: Option<String>,
    source_filename: Option<String>,
    is_downloaded: Option<bool>,
    is_archive: Option<bool>,
    has_raw: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
});

impl OriginalFile {
    /// Samples delivered inline. Samples the server lists only by database
    /// id are available through [`OriginalFile::sample_ids`].
    pub fn samples(&self) -> Result<Vec<Sample>, RefineError> {
        let links = self.field(|record| record.samples.clone())?;
        Ok(links
            .into_iter()
            .filter_map(|link| match link {
                Linked::Record(record) => Some(Sample::from_record(self.api(), record)),
                Linked::Id(_) => None,
            })
            .collect())
    }

    pub fn sample_ids(&self) -> Result<Vec<i64>, RefineError> {
        let links = self.field(|record| record.samples.clone())?;
        Ok(links.iter().filter_map(Linked::id).collect())
    }

    pub fn processor_jobs(&self) -> Result<Vec<ProcessorJob>, RefineError> {
        let references = self.field(|record| record.processor_jobs.clone())?;
        Ok(references
            .into_iter()
            .map(|reference| ProcessorJob::from_reference(self.api(), reference))
            .collect())
    }

    pub fn downloader_jobs(&self) -> Result<Vec<DownloaderJob>, RefineError> {
        let references = self.field(|record| record.downloader_jobs.clone())?;
        Ok(references
            .into_iter()
            .map(|reference| DownloaderJob::from_reference(self.api(), reference))
            .collect())
    }
}
