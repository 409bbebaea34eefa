use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Everything that can stop an episode from reaching its final `.wav`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("episodes table not found: {}", .0.display())]
    EpisodesNotFound(PathBuf),

    #[error("could not parse episodes table {}: {source}", path.display())]
    EpisodesFormat {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row too short to carry a URL plus show/episode columns.
    #[error("episode row at line {line} has {columns} column(s), need at least 3")]
    MalformedRecord { line: u64, columns: usize },

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    DownloadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not start converter `{program}`: {source}")]
    ConverterUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("conversion of {} failed ({status}): {stderr}", input.display())]
    Conversion {
        input: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("converter reported success but wrote nothing to {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
