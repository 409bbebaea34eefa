// src/episodes/mod.rs
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    path::Path,
};
use tracing::{debug, info};

use crate::error::{FetchError, Result};

pub mod paths;

/// Column holding the source audio URL.
const URL_COLUMN: usize = 2;
/// Shortest row that still has a URL plus the trailing show/episode pair.
const MIN_COLUMNS: usize = URL_COLUMN + 1;

/// One raw line of the episodes table, fields already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRow {
    /// 1-based line in the source file, for error messages.
    pub line: u64,
    pub fields: Vec<String>,
}

/// The parts of a row the pipeline actually uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub show: String,
    pub episode: String,
    pub url: String,
}

impl EpisodeRow {
    pub fn new(line: u64, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Pick URL (column 2), show (second to last) and episode (last).
    pub fn record(&self) -> Result<EpisodeRecord> {
        let n = self.fields.len();
        if n < MIN_COLUMNS {
            return Err(FetchError::MalformedRecord {
                line: self.line,
                columns: n,
            });
        }
        Ok(EpisodeRecord {
            show: self.fields[n - 2].clone(),
            episode: self.fields[n - 1].clone(),
            url: self.fields[URL_COLUMN].clone(),
        })
    }
}

/// Read a header-less, comma separated episodes table.
///
/// Every field is trimmed. Row width is not checked here; short rows only
/// fail once the pipeline reaches them, so earlier rows still get processed.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_episodes<P: AsRef<Path>>(path: P) -> Result<Vec<EpisodeRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => FetchError::EpisodesNotFound(path.to_path_buf()),
        _ => FetchError::io(path, e),
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| FetchError::EpisodesFormat {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(rows.len() as u64 + 1);
        let row = EpisodeRow::new(line, record.iter().map(str::trim));
        debug!(line, fields = ?row.fields, "episode row");
        rows.push(row);
    }

    info!(rows = rows.len(), "loaded episodes table");
    Ok(rows)
}
