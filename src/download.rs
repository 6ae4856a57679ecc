//! Streaming downloads and the shared contract of downloadable resources.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;

use crate::client::Api;
use crate::error::RefineError;
use crate::fs_util;

/// Downloads larger than this ask for confirmation first.
pub const CONFIRM_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;

pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

/// Asks on the terminal. Anything but an explicit yes declines, including a
/// prompt that cannot be shown.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or_else(|err| {
                tracing::debug!(%err, "confirmation prompt failed");
                false
            })
    }
}

/// The question to ask before a download of `content_length` bytes, if any.
pub fn size_prompt(content_length: Option<u64>) -> Option<String> {
    match content_length {
        None => Some(
            "Could not get the size of the file you are trying to download. \
             Would you still like to download it?"
                .to_string(),
        ),
        Some(size) if size > CONFIRM_THRESHOLD_BYTES => Some(format!(
            "The file you are trying to download is bigger than 1GB ({:.2}GB). \
             Would you still like to download it?",
            size as f64 / CONFIRM_THRESHOLD_BYTES as f64
        )),
        Some(_) => None,
    }
}

/// Streams `url` into `path`. Returns `false` when the caller declined the
/// size confirmation; nothing is written in that case.
pub fn download_file(
    api: &Api,
    url: &str,
    path: &Path,
    confirm: Option<&dyn Confirm>,
) -> Result<bool, RefineError> {
    let mut stream = api.open(url)?;
    if let Some(confirm) = confirm {
        if let Some(message) = size_prompt(stream.content_length) {
            if !confirm.confirm(&message) {
                tracing::info!(url, "download declined");
                return Ok(false);
            }
        }
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| RefineError::Filesystem(err.to_string()))?;
    }
    let file = fs::File::create(path)
        .map_err(|err| RefineError::Filesystem(format!("create {}: {err}", path.display())))?;
    let mut writer = BufWriter::new(file);
    let bytes = io::copy(&mut stream.body, &mut writer)
        .map_err(|err| RefineError::Filesystem(err.to_string()))?;
    writer
        .flush()
        .map_err(|err| RefineError::Filesystem(err.to_string()))?;

    tracing::info!(path = %path.display(), bytes, "download complete");
    Ok(true)
}

/// Expands a leading `~`, appends `default_filename` when `path` is an
/// existing directory, and makes the result absolute.
pub fn resolve_download_path(path: &Path, default_filename: &str) -> Result<PathBuf, RefineError> {
    let expanded = expand_home(path)?;
    let target = if expanded.is_dir() {
        expanded.join(default_filename)
    } else {
        expanded
    };
    std::path::absolute(&target).map_err(|err| RefineError::Filesystem(err.to_string()))
}

fn expand_home(path: &Path) -> Result<PathBuf, RefineError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let dirs = BaseDirs::new().ok_or_else(|| {
                RefineError::Filesystem("unable to resolve home directory".to_string())
            })?;
            Ok(dirs.home_dir().join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Where and how to fetch one downloadable resource.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub api: Api,
    pub url: String,
    pub filename: String,
}

/// Resources exposing a `download_url` (computed files, compendia, datasets).
pub trait Downloadable {
    /// Resolves the URL to fetch, failing with a
    /// [`RefineError::DownloadError`] when the server has not provided one.
    fn download_target(&self) -> Result<DownloadTarget, RefineError>;

    fn local_path(&self) -> Option<PathBuf>;

    fn set_local_path(&self, path: PathBuf);

    /// Downloads to `path`, asking on the terminal before large transfers when
    /// `prompt` is set. `None` means the transfer was declined.
    fn download(&self, path: &Path, prompt: bool) -> Result<Option<PathBuf>, RefineError> {
        if prompt {
            self.download_with(path, Some(&TerminalConfirm))
        } else {
            self.download_with(path, None)
        }
    }

    fn download_with(
        &self,
        path: &Path,
        confirm: Option<&dyn Confirm>,
    ) -> Result<Option<PathBuf>, RefineError> {
        let target = self.download_target()?;
        let destination = resolve_download_path(path, &target.filename)?;
        if !download_file(&target.api, &target.url, &destination, confirm)? {
            return Ok(None);
        }
        self.set_local_path(destination.clone());
        Ok(Some(destination))
    }

    /// Unpacks the file fetched by the last successful download.
    fn extract(&self) -> Result<PathBuf, RefineError> {
        let archive = self.local_path().ok_or_else(|| {
            RefineError::MissingFile(
                "No downloaded file found. Call download() before extract().".to_string(),
            )
        })?;
        fs_util::extract_archive(&archive)
    }
}

pub(crate) const TOKEN_HINT: &str = "This can happen if you don't have an activated API token. \
Create one with `refinebio create-token` (or Token::create and \
agree_to_terms_and_conditions) and try again.";
