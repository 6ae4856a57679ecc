use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RefineError {
    #[error("The requested resource at {url} was not found")]
    NotFound { url: String },

    #[error("The server encountered an issue{}", detail_suffix(.0))]
    ServerError(Option<String>),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("You have provided invalid filters: {0}")]
    InvalidFilters(String),

    #[error("Invalid filter type ({message}): {details}")]
    InvalidFilterType { message: String, details: String },

    #[error("Invalid data ({message}): {details}")]
    InvalidData { message: String, details: String },

    #[error("Multiple errors occurred:{}", join_errors(.0))]
    MultipleErrors(Vec<RefineError>),

    #[error("Unable to download {entity}\n{info}")]
    DownloadError { entity: String, info: String },

    #[error("{0}")]
    MissingFile(String),

    #[error("the list changed since it was created: expected {expected} items, server now reports {actual}")]
    ListChanged { expected: usize, actual: usize },

    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("refine.bio returned status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("refine.bio request failed: {0}")]
    Transport(String),

    #[error("failed to decode refine.bio response: {0}")]
    Decode(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse YAML config: {0}")]
    ConfigParse(String),

    #[error("failed to write config file at {path}: {message}")]
    ConfigWrite { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl RefineError {
    pub(crate) fn download(entity: &str, info: impl Into<String>) -> Self {
        RefineError::DownloadError {
            entity: entity.to_string(),
            info: info.into(),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

fn join_errors(errors: &[RefineError]) -> String {
    errors.iter().map(|err| format!("\n  - {err}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_error_message_has_two_lines() {
        let err = RefineError::download("Dataset", "Download url not found");
        assert_eq!(
            err.to_string(),
            "Unable to download Dataset\nDownload url not found"
        );
    }

    #[test]
    fn multiple_errors_lists_each_error() {
        let err = RefineError::MultipleErrors(vec![
            RefineError::InvalidFilters("foo".to_string()),
            RefineError::BadRequest("bar".to_string()),
        ]);
        let message = err.to_string();
        assert!(message.contains("invalid filters: foo"));
        assert!(message.contains("Bad Request: bar"));
    }
}
