use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

use crate::error::RefineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    fn suffix_len(self, name: &str) -> usize {
        let lower = name.to_ascii_lowercase();
        match self {
            Self::TarGz if lower.ends_with(".tar.gz") => ".tar.gz".len(),
            Self::TarGz => ".tgz".len(),
            Self::Tar => ".tar".len(),
            Self::Zip => ".zip".len(),
        }
    }
}

/// Unpacks `archive` into a sibling directory named after the archive stem
/// and returns that directory.
pub fn extract_archive(archive: &Path) -> Result<PathBuf, RefineError> {
    let format = ArchiveFormat::detect(archive).ok_or_else(|| {
        RefineError::Filesystem(format!("unknown archive format: {}", archive.display()))
    })?;
    let target = extraction_dir(archive, format)?;
    fs::create_dir_all(&target).map_err(|err| RefineError::Filesystem(err.to_string()))?;

    tracing::debug!(archive = %archive.display(), target = %target.display(), "extracting");
    match format {
        ArchiveFormat::Zip => extract_zip(archive, &target)?,
        ArchiveFormat::Tar => extract_tar(open(archive)?, &target)?,
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(open(archive)?), &target)?,
    }
    Ok(target)
}

fn extraction_dir(archive: &Path, format: ArchiveFormat) -> Result<PathBuf, RefineError> {
    let name = archive
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RefineError::Filesystem(format!("invalid path: {}", archive.display())))?;
    let stem = &name[..name.len() - format.suffix_len(name)];
    if stem.is_empty() {
        return Err(RefineError::Filesystem(format!(
            "archive name has no stem: {}",
            archive.display()
        )));
    }
    let parent = archive.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(stem))
}

fn open(path: &Path) -> Result<fs::File, RefineError> {
    fs::File::open(path)
        .map_err(|err| RefineError::Filesystem(format!("open {}: {err}", path.display())))
}

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), RefineError> {
    let mut archive =
        ZipArchive::new(open(zip_path)?).map_err(|err| RefineError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| RefineError::Filesystem(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(RefineError::Filesystem(
                "zip entry path traversal detected".to_string(),
            ));
        };
        let entry_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| RefineError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| RefineError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| RefineError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| RefineError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

/// `tar::Archive::unpack` already refuses entries escaping `target_dir`.
pub fn extract_tar<R: io::Read>(reader: R, target_dir: &Path) -> Result<(), RefineError> {
    Archive::new(reader)
        .unpack(target_dir)
        .map_err(|err| RefineError::Filesystem(format!("unpack tar: {err}")))
}
