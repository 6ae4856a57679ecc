use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::download::{DownloadTarget, Downloadable, TOKEN_HINT};
use crate::entity::{Entity, Resource, lazy_fields};
use crate::error::RefineError;
use crate::models::computed_file::{ComputedFile, ComputedFileRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompendiumRecord {
    pub id: Option<i64>,
    pub primary_organism_name: Option<String>,
    #[serde(deserialize_with = "crate::entity::nullable")]
    pub organism_names: Vec<String>,
    pub svd_algorithm: Option<String>,
    pub quant_sf_only: Option<bool>,
    pub compendium_version: Option<i64>,
    pub computed_file: Option<ComputedFileRecord>,
}

impl Resource for CompendiumRecord {
    const NAME: &'static str = "Compendium";
    const ENDPOINT: &'static str = "compendia";
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

/// A normalized (or quant.sf-only) compendium for one primary organism.
///
/// Search filters: `primary_organism__name`, `compendium_version`,
/// `quant_sf_only`, `result__id`, `latest_version`.
pub type Compendium = Entity<CompendiumRecord>;

lazy_fields!(CompendiumRecord {
    id: Option<i64>,
    primary_organism_name: Option<String>,
    organism_names: Vec<String>,
    svd_algorithm: Option<String>,
    quant_sf_only: Option<bool>,
    compendium_version: Option<i64>,
});

impl Compendium {
    pub fn computed_file(&self) -> Result<Option<ComputedFile>, RefineError> {
        let record = self.field(|record| record.computed_file.clone())?;
        Ok(record.map(|record| ComputedFile::from_record(self.api(), record)))
    }
}

impl Downloadable for Compendium {
    fn download_target(&self) -> Result<DownloadTarget, RefineError> {
        let file = self.computed_file()?;
        let url = match &file {
            Some(file) => file.download_url()?.filter(|url| !url.is_empty()),
            None => None,
        };
        let Some(url) = url else {
            return Err(RefineError::download(
                "Compendium",
                format!("No download url found. {TOKEN_HINT}"),
            ));
        };

        let filename = file
            .and_then(|file| file.record().filename.clone())
            .filter(|filename| !filename.is_empty())
            .unwrap_or_else(|| match self.record().id {
                Some(id) => format!("compendium_{id}.zip"),
                None => "compendium.zip".to_string(),
            });
        Ok(DownloadTarget {
            api: self.api().clone(),
            url,
            filename,
        })
    }

    fn local_path(&self) -> Option<PathBuf> {
        self.downloaded_path()
    }

    fn set_local_path(&self, path: PathBuf) {
        self.set_downloaded_path(path);
    }
}
