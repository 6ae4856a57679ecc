use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::download::{DownloadTarget, Downloadable, TOKEN_HINT};
use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::computational_result::{ComputationalResult, ComputationalResultRecord};
use crate::models::sample::{Sample, SampleRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedFileRecord {
    pub id: Option<i64>,
    pub filename: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub samples: Vec<SampleRecord>,
    pub size_in_bytes: Option<i64>,
    pub is_qn_target: Option<bool>,
    pub is_smashable: Option<bool>,
    pub is_qc: Option<bool>,
    pub is_compendia: Option<bool>,
    pub quant_sf_only: Option<bool>,
    pub compendia_version: Option<i64>,
    pub compendia_organism_name: Option<String>,
    pub sha1: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub s3_url: Option<String>,
    pub download_url: Option<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub result: Option<ComputationalResultRecord>,
}

impl Resource for ComputedFileRecord {
    const NAME: &'static str = "ComputedFile";
    const ENDPOINT: &'static str = "computed_files";
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

/// A file produced by a refine.bio processing step.
///
/// Search filters include `is_compendia`, `is_qn_target`, `is_smashable`,
/// `quant_sf_only`, `compendia_version`, `samples` and `result__id`.
pub type ComputedFile = Entity<ComputedFileRecord>;

lazy_fields!(ComputedFileRecord {
    id: Option<i64>,
    filename: Option<String>,
    size_in_bytes: Option<i64>,
    is_qn_target: Option<bool>,
    is_smashable: Option<bool>,
    is_qc: Option<bool>,
    is_compendia: Option<bool>,
    quant_sf_only: Option<bool>,
    compendia_version: Option<i64>,
    compendia_organism_name: Option<String>,
    sha1: Option<String>,
    s3_bucket: Option<String>,
    s3_key: Option<String>,
    s3_url: Option<String>,
    download_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
});

impl ComputedFile {
    pub fn samples(&self) -> Result<Vec<Sample>, RefineError> {
        let records = self.field(|record| record.samples.clone())?;
        Ok(records
            .into_iter()
            .map(|record| Sample::from_record(self.api(), record))
            .collect())
    }

    pub fn result(&self) -> Result<Option<ComputationalResult>, RefineError> {
        let record = self.field(|record| record.result.clone())?;
        Ok(record.map(|record| ComputationalResult::from_record(self.api(), record)))
    }

    fn default_filename(&self) -> String {
        let record = self.record();
        match (&record.filename, record.id) {
            (Some(filename), _) if !filename.is_empty() => filename.clone(),
            (_, Some(id)) => format!("computed_file_{id}"),
            _ => "computed_file".to_string(),
        }
    }
}

impl Downloadable for ComputedFile {
    fn download_target(&self) -> Result<DownloadTarget, RefineError> {
        let url = self
            .download_url()?
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                RefineError::download("ComputedFile", format!("Download url not found. {TOKEN_HINT}"))
            })?;
        Ok(DownloadTarget {
            api: self.api().clone(),
            url,
            filename: self.default_filename(),
        })
    }

    fn local_path(&self) -> Option<PathBuf> {
        self.downloaded_path()
    }

    fn set_local_path(&self, path: PathBuf) {
        self.set_downloaded_path(path);
    }
}
