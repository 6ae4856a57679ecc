//! One-call workflows: build and download a dataset, or fetch the latest
//! compendium for an organism.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::client::Api;
use crate::download::{Confirm, Downloadable};
use crate::error::RefineError;
use crate::models::{Compendium, Dataset};
use crate::pagination::Filters;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Everything [`download_dataset`] needs.
#[derive(Debug, Clone)]
pub struct DatasetDownload {
    pub path: PathBuf,
    pub email_address: Option<String>,
    /// Experiment accession code to sample accession codes (or `["ALL"]`).
    pub dataset_dict: Option<BTreeMap<String, Vec<String>>>,
    /// Experiments to include with all of their samples.
    pub experiments: Vec<String>,
    pub aggregation: String,
    pub transformation: String,
    pub skip_quantile_normalization: bool,
    pub notify_me: bool,
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl DatasetDownload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            email_address: None,
            dataset_dict: None,
            experiments: Vec::new(),
            aggregation: "EXPERIMENT".to_string(),
            transformation: "NONE".to_string(),
            skip_quantile_normalization: false,
            notify_me: false,
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOutcome {
    Downloaded(PathBuf),
    /// The size confirmation was declined.
    Declined,
    /// Processing did not finish before the timeout. The dataset keeps
    /// processing on the server and can be downloaded later by id.
    TimedOut { id: String },
}

/// Builds a dataset, starts processing, waits for it and downloads the
/// archive.
pub fn download_dataset(
    api: &Api,
    request: &DatasetDownload,
    confirm: Option<&dyn Confirm>,
) -> Result<DatasetOutcome, RefineError> {
    let has_dict = request
        .dataset_dict
        .as_ref()
        .is_some_and(|dict| !dict.is_empty());
    if has_dict && !request.experiments.is_empty() {
        return Err(RefineError::download(
            "Dataset",
            "You should either provide dataset_dict or experiments but not both",
        ));
    }

    let mut dataset = Dataset::new(api);
    dataset.edit(|record| {
        record.aggregate_by = Some(request.aggregation.clone());
        record.scale_by = Some(request.transformation.clone());
        record.quantile_normalize = Some(!request.skip_quantile_normalization);
        record.email_address = request.email_address.clone();
        if has_dict {
            record.data = request.dataset_dict.clone();
        }
    });
    dataset.set_notify_me(request.notify_me);
    for experiment in &request.experiments {
        dataset.add_samples(experiment, Vec::<String>::new())?;
    }

    dataset.process()?;
    let id = dataset.key().unwrap_or_default();
    tracing::info!(dataset = %id, "waiting for dataset to finish processing");

    let started = Instant::now();
    while !dataset.check()? {
        let pause = match request.timeout {
            Some(timeout) => {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    tracing::warn!(
                        dataset = %id,
                        waited_secs = elapsed.as_secs(),
                        "dataset still processing, giving up"
                    );
                    return Ok(DatasetOutcome::TimedOut { id });
                }
                request.poll_interval.min(timeout - elapsed)
            }
            None => request.poll_interval,
        };
        thread::sleep(pause);
    }

    tracing::info!(dataset = %id, "dataset processed, downloading");
    match dataset.download_with(&request.path, confirm)? {
        Some(path) => Ok(DatasetOutcome::Downloaded(path)),
        None => Ok(DatasetOutcome::Declined),
    }
}

/// Downloads the latest compendium for `organism`. `None` means the size
/// confirmation was declined.
pub fn download_compendium(
    api: &Api,
    path: &Path,
    organism: &str,
    quant_sf_only: bool,
    confirm: Option<&dyn Confirm>,
) -> Result<Option<PathBuf>, RefineError> {
    let filters = Filters::new()
        .with("primary_organism__name", organism)
        .with("quant_sf_only", quant_sf_only)
        .with("latest_version", true);
    let compendia = Compendium::search(api, &filters)?;
    let Some(compendium) = compendia.first()? else {
        return Err(RefineError::download(
            "Compendium",
            format!(
                "Could not find any Compendium with organism name, {organism} \
                 and quant_sf_only, {quant_sf_only}"
            ),
        ));
    };
    tracing::info!(
        organism,
        quant_sf_only,
        version = ?compendium.record().compendium_version,
        "downloading compendium"
    );
    compendium.download_with(path, confirm)
}

/// Downloads the latest RNA-seq sample (quant.sf only) compendium.
pub fn download_quantfile_compendium(
    api: &Api,
    path: &Path,
    organism: &str,
    confirm: Option<&dyn Confirm>,
) -> Result<Option<PathBuf>, RefineError> {
    download_compendium(api, path, organism, true, confirm)
}

/// Parses a timeout such as `90`, `30s`, `15m` or `2h`. Bare numbers are
/// seconds.
pub fn parse_timeout(raw: &str) -> Result<Duration, RefineError> {
    let pattern = Regex::new(r"^\s*(\d+)\s*([smh]?)\s*$")
        .map_err(|err| RefineError::InvalidArgument(err.to_string()))?;
    let invalid = || RefineError::InvalidArgument(format!("invalid timeout: {raw}"));
    let captures = pattern.captures(raw).ok_or_else(invalid)?;
    let amount: u64 = captures[1].parse().map_err(|_| invalid())?;
    let seconds = match &captures[2] {
        "m" => amount.checked_mul(60),
        "h" => amount.checked_mul(3600),
        _ => Some(amount),
    }
    .ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_with_units() {
        assert_eq!(parse_timeout("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timeout("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_timeout(" 2h ").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn rejects_malformed_timeouts() {
        for raw in ["", "m", "1.5h", "10 minutes", "-3"] {
            assert!(
                matches!(parse_timeout(raw), Err(RefineError::InvalidArgument(_))),
                "{raw}"
            );
        }
    }
}
