use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::annotation::Annotation;
use crate::models::sample::{Sample, SampleRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub technology: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub annotations: Vec<Annotation>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub samples: Vec<SampleRecord>,
    pub protocol_description: Option<Value>,
    pub accession_code: Option<String>,
    pub alternate_accession_code: Option<String>,
    pub source_database: Option<String>,
    pub source_url: Option<String>,
    pub has_publication: Option<bool>,
    pub publication_title: Option<String>,
    pub publication_doi: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub publication_authors: Vec<String>,
    pub pubmed_id: Option<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub source_first_published: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub source_last_modified: Option<DateTime<Utc>>,
    pub submitter_institution: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub platform_names: Vec<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub platform_accession_codes: Vec<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub organism_names: Vec<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub downloadable_organism_names: Vec<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub sample_metadata_fields: Vec<String>,
    pub sample_metadata: Option<Value>,
    pub num_total_samples: Option<i64>,
    pub num_processed_samples: Option<i64>,
    pub num_downloadable_samples: Option<i64>,
}

impl Resource for ExperimentRecord {
    const NAME: &'static str = "Experiment";
    const ENDPOINT: &'static str = "experiments";
    const SEARCH_ENDPOINT: &'static str = "search";
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

/// An experiment, keyed by accession code (e.g. `GSE68833`).
///
/// Searches go through the full-text `search` endpoint. Filters include
/// `technology`, `has_publication`, `accession_code`, `platform`, `organism`,
/// `downloadable_organism`, `num_processed_samples`, `sample_keywords`,
/// `search` and `ordering`; several take multiple values.
pub type Experiment = Entity<ExperimentRecord>;

lazy_fields!(ExperimentRecord {
    id: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    technology: Option<String>,
    annotations: Vec<Annotation>,
    protocol_description: Option<Value>,
    accession_code: Option<String>,
    alternate_accession_code: Option<String>,
    source_database: Option<String>,
    source_url: Option<String>,
    has_publication: Option<bool>,
    publication_title: Option<String>,
    publication_doi: Option<String>,
    publication_authors: Vec<String>,
    pubmed_id: Option<String>,
    source_first_published: Option<DateTime<Utc>>,
    source_last_modified: Option<DateTime<Utc>>,
    submitter_institution: Option<String>,
    platform_names: Vec<String>,
    platform_accession_codes: Vec<String>,
    last_modified: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    organism_names: Vec<String>,
    downloadable_organism_names: Vec<String>,
    sample_metadata_fields: Vec<String>,
    sample_metadata: Option<Value>,
    num_total_samples: Option<i64>,
    num_processed_samples: Option<i64>,
    num_downloadable_samples: Option<i64>,
});

impl Experiment {
    pub fn samples(&self) -> Result<Vec<Sample>, RefineError> {
        let records = self.field(|record| record.samples.clone())?;
        Ok(records
            .into_iter()
            .map(|record| Sample::from_record(self.api(), record))
            .collect())
    }
}
