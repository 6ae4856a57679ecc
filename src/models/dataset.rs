use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Api;
use crate::download::{DownloadTarget, Downloadable, TOKEN_HINT};
use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;

/// Selects every sample of an experiment in [`DatasetRecord::data`].
pub const ALL_SAMPLES: &str = "ALL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetRecord {
    pub id: Option<String>,
    /// Experiment accession code to sample accession codes, or `["ALL"]`.
    pub data: Option<BTreeMap<String, Vec<String>>>,
    pub aggregate_by: Option<String>,
    pub scale_by: Option<String>,
    pub is_processing: Option<bool>,
    pub is_processed: Option<bool>,
    pub is_available: Option<bool>,
    pub has_email: Option<bool>,
    pub email_address: Option<String>,
    pub email_ccdl_ok: Option<bool>,
    #[serde(with = "crate::entity::timestamp")]
    pub expires_on: Option<DateTime<Utc>>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub success: Option<bool>,
    pub failure_reason: Option<String>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    pub start: Option<bool>,
    pub size_in_bytes: Option<i64>,
    pub sha1: Option<String>,
    pub quantile_normalize: Option<bool>,
    pub quant_sf_only: Option<bool>,
    pub svd_algorithm: Option<String>,
    pub download_url: Option<String>,
}

impl Resource for DatasetRecord {
    const NAME: &'static str = "Dataset";
    const ENDPOINT: &'static str = "dataset";
    type Key = String;

    fn key(&self) -> Option<String> {
        self.id.clone()
    }

    fn keyed(id: String) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

lazy_fields!(DatasetRecord {
    id: Option<String>,
    data: Option<BTreeMap<String, Vec<String>>>,
    aggregate_by: Option<String>,
    scale_by: Option<String>,
    is_processing: Option<bool>,
    is_processed: Option<bool>,
    is_available: Option<bool>,
    has_email: Option<bool>,
    email_address: Option<String>,
    email_ccdl_ok: Option<bool>,
    expires_on: Option<DateTime<Utc>>,
    s3_bucket: Option<String>,
    s3_key: Option<String>,
    success: Option<bool>,
    failure_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
    start: Option<bool>,
    size_in_bytes: Option<i64>,
    sha1: Option<String>,
    quantile_normalize: Option<bool>,
    quant_sf_only: Option<bool>,
    svd_algorithm: Option<String>,
    download_url: Option<String>,
});

/// Request body for create/update. `None` fields are left out; explicitly
/// set `false` values are sent.
#[derive(Debug, Serialize)]
struct DatasetPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregate_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_ccdl_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantile_normalize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quant_sf_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    svd_algorithm: Option<&'a str>,
    notify_me: bool,
}

impl<'a> DatasetPayload<'a> {
    fn new(record: &'a DatasetRecord, notify_me: bool) -> Self {
        Self {
            data: record.data.as_ref(),
            aggregate_by: record.aggregate_by.as_deref(),
            scale_by: record.scale_by.as_deref(),
            email_address: record.email_address.as_deref(),
            email_ccdl_ok: record.email_ccdl_ok,
            start: record.start,
            quantile_normalize: record.quantile_normalize,
            quant_sf_only: record.quant_sf_only,
            svd_algorithm: record.svd_algorithm.as_deref(),
            notify_me,
        }
    }
}

/// A server-side bundle of experiment and sample data.
///
/// A dataset moves through `unsaved -> saved -> processing -> processed`.
/// Local edits are sent with [`Dataset::save`]; [`Dataset::process`] asks the
/// server to start building the archive and [`Dataset::check`] polls it.
#[derive(Debug, Clone)]
pub struct Dataset {
    entity: Entity<DatasetRecord>,
    notify_me: bool,
}

impl Dataset {
    /// An unsaved dataset.
    pub fn new(api: &Api) -> Self {
        Self::from_record(api, DatasetRecord::default())
    }

    pub fn from_record(api: &Api, record: DatasetRecord) -> Self {
        Self {
            entity: Entity::from_record(api, record),
            notify_me: false,
        }
    }

    pub fn get(api: &Api, id: impl Into<String>) -> Result<Self, RefineError> {
        Ok(Self {
            entity: Entity::get(api, id)?,
            notify_me: false,
        })
    }

    pub fn entity(&self) -> &Entity<DatasetRecord> {
        &self.entity
    }

    /// Applies local changes. Nothing is sent until [`Dataset::save`].
    pub fn edit<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut DatasetRecord),
    {
        self.entity.update(edit);
    }

    pub fn notify_me(&self) -> bool {
        self.notify_me
    }

    pub fn set_notify_me(&mut self, notify_me: bool) {
        self.notify_me = notify_me;
    }

    /// Selects `samples` of `experiment`; an empty selection means every
    /// sample. Ignored once the dataset is processing or processed, which may
    /// fetch the dataset to find out.
    pub fn add_samples<I, S>(&mut self, experiment: &str, samples: I) -> Result<(), RefineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.is_processing()? == Some(true) || self.is_processed()? == Some(true) {
            tracing::warn!(
                dataset = self.key().as_deref().unwrap_or("unsaved"),
                experiment,
                "cannot add samples to a dataset that is processing or processed"
            );
            return Ok(());
        }

        let mut samples: Vec<String> = samples.into_iter().map(Into::into).collect();
        if samples.is_empty() {
            samples.push(ALL_SAMPLES.to_string());
        }
        self.entity.update(|record| {
            record
                .data
                .get_or_insert_with(BTreeMap::new)
                .insert(experiment.to_string(), samples);
        });
        Ok(())
    }

    /// Creates the dataset (POST) or updates it (PUT) and adopts the server's
    /// copy, keeping the locally set email fields the server does not echo.
    pub fn save(&mut self) -> Result<(), RefineError> {
        let record = self.entity.record();
        let payload = DatasetPayload::new(&record, self.notify_me);
        let api = self.entity.api();

        let mut saved: DatasetRecord = match &record.id {
            None => api.post(DatasetRecord::ENDPOINT, &payload)?,
            Some(id) => api.put(&format!("{}/{id}", DatasetRecord::ENDPOINT), &payload)?,
        };
        saved.email_address = record.email_address.clone().or(saved.email_address);
        saved.email_ccdl_ok = record.email_ccdl_ok.or(saved.email_ccdl_ok);

        tracing::debug!(dataset = saved.id.as_deref().unwrap_or_default(), "dataset saved");
        self.entity.replace_fetched(saved);
        Ok(())
    }

    /// Sets `start` and saves, which queues the dataset for processing.
    pub fn process(&mut self) -> Result<(), RefineError> {
        self.edit(|record| record.start = Some(true));
        self.save()?;
        tracing::info!(
            dataset = self.entity.record().id.as_deref().unwrap_or_default(),
            "dataset processing started"
        );
        Ok(())
    }

    /// Refreshes the processing state from the server and reports whether
    /// the dataset is processed.
    pub fn check(&self) -> Result<bool, RefineError> {
        let id = self.entity.key().ok_or_else(|| {
            RefineError::InvalidArgument("the dataset has not been saved yet".to_string())
        })?;
        let fresh: DatasetRecord = self
            .entity
            .api()
            .get(&format!("{}/{id}", DatasetRecord::ENDPOINT), &[])?;

        self.entity.update(|record| {
            record.is_processing = fresh.is_processing;
            record.is_processed = fresh.is_processed;
            record.is_available = fresh.is_available;
            record.success = fresh.success;
            record.failure_reason = fresh.failure_reason.clone();
            if fresh.download_url.is_some() {
                record.download_url = fresh.download_url.clone();
            }
        });
        Ok(fresh.is_processed.unwrap_or(false))
    }

    /// Asks the server for the URL, explaining why it is missing if it
    /// still is.
    fn refreshed_download_url(&self) -> Result<String, RefineError> {
        let processed = match self.entity.key() {
            Some(_) => self.check()?,
            None => false,
        };
        if let Some(url) = non_empty(self.entity.record().download_url.clone()) {
            return Ok(url);
        }
        let info = if processed {
            format!("Download url not found. {TOKEN_HINT}")
        } else {
            "Download url not found - you must process the Dataset before downloading.".to_string()
        };
        Err(RefineError::download("Dataset", info))
    }
}

impl Deref for Dataset {
    type Target = Entity<DatasetRecord>;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl Serialize for Dataset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entity.serialize(serializer)
    }
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|url| !url.is_empty())
}

impl Downloadable for Dataset {
    fn download_target(&self) -> Result<DownloadTarget, RefineError> {
        let url = match non_empty(self.entity.record().download_url.clone()) {
            Some(url) => url,
            None => self.refreshed_download_url()?,
        };
        let filename = match self.entity.key() {
            Some(id) => format!("dataset_{id}.zip"),
            None => "dataset.zip".to_string(),
        };
        Ok(DownloadTarget {
            api: self.entity.api().clone(),
            url,
            filename,
        })
    }

    fn local_path(&self) -> Option<PathBuf> {
        self.entity.downloaded_path()
    }

    fn set_local_path(&self, path: PathBuf) {
        self.entity.set_downloaded_path(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_keeps_false_and_drops_unset() {
        let record = DatasetRecord {
            aggregate_by: Some("EXPERIMENT".to_string()),
            quantile_normalize: Some(false),
            ..DatasetRecord::default()
        };
        let body = serde_json::to_value(DatasetPayload::new(&record, false)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "aggregate_by": "EXPERIMENT",
                "quantile_normalize": false,
                "notify_me": false,
            })
        );
    }
}
