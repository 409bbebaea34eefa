// src/pipeline.rs
use std::{fs, io::ErrorKind, path::Path};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    config::{ErrorPolicy, FetcherConfig},
    convert::{Converter, WavFormat},
    episodes::{paths::EpisodePaths, EpisodeRecord, EpisodeRow},
    error::{FetchError, Result},
    fetch::Downloader,
};

/// How a single episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Final `.wav` already existed; nothing was run.
    Skipped,
    /// Downloaded (unless the original was already there), converted and finalized.
    Converted,
}

/// Counters for one pass over the episodes table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub converted: usize,
    pub failed: usize,
}

/// Downloads every episode in the table and normalizes it to a waveform.
pub struct EpisodeFetcher<D, C> {
    config: FetcherConfig,
    downloader: D,
    converter: C,
}

impl<D: Downloader, C: Converter> EpisodeFetcher<D, C> {
    pub fn new(config: FetcherConfig, downloader: D, converter: C) -> Self {
        Self {
            config,
            downloader,
            converter,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Process `rows` one at a time, in order.
    ///
    /// With [`ErrorPolicy::Abort`] the first failure is returned and later
    /// rows are left untouched. With [`ErrorPolicy::KeepGoing`] failures are
    /// only counted.
    pub async fn run(&self, rows: &[EpisodeRow]) -> Result<RunSummary> {
        let mut summary = RunSummary {
            total: rows.len(),
            ..RunSummary::default()
        };
        let start = Instant::now();

        for row in rows {
            let result = match row.record() {
                Ok(record) => self.process(&record).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Ok(Outcome::Converted) => summary.converted += 1,
                Err(e) => {
                    summary.failed += 1;
                    match self.config.on_error {
                        ErrorPolicy::Abort => {
                            error!(line = row.line, error = %e, "aborting run");
                            return Err(e);
                        }
                        ErrorPolicy::KeepGoing => {
                            error!(line = row.line, error = %e, "episode failed, continuing");
                        }
                    }
                }
            }
        }

        info!(
            total = summary.total,
            skipped = summary.skipped,
            converted = summary.converted,
            failed = summary.failed,
            elapsed = ?start.elapsed(),
            "run finished"
        );
        Ok(summary)
    }

    /// Pending -> Downloading -> Converting -> Finalizing -> Done,
    /// short-circuiting to Skipped when the final `.wav` is already present.
    #[tracing::instrument(level = "info", skip(self, record), fields(show = %record.show, episode = %record.episode))]
    pub async fn process(&self, record: &EpisodeRecord) -> Result<Outcome> {
        let paths = EpisodePaths::resolve(&self.config.wav_root, record);
        paths.ensure_dir()?;
        debug!(
            url = %record.url,
            original = %paths.original.display(),
            wav = %paths.wav.display(),
            "resolved paths"
        );

        if paths.wav.exists() {
            debug!("already converted, skipping");
            return Ok(Outcome::Skipped);
        }

        info!("processing");
        if paths.original.exists() {
            debug!(original = %paths.original.display(), "original already downloaded");
        } else {
            info!(url = %record.url, "downloading");
            self.downloader
                .download(&record.url, &paths.original)
                .await?;
        }

        let format = WavFormat {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        };
        info!(temp = %paths.temp_wav.display(), "converting");
        if let Err(e) = self
            .converter
            .convert(&paths.original, &paths.temp_wav, format)
            .await
        {
            discard(&paths.temp_wav);
            return Err(e);
        }

        finalize(&paths)?;
        info!(wav = %paths.wav.display(), "done");
        Ok(Outcome::Converted)
    }
}

/// Drop the downloaded original and move the converted file into place.
fn finalize(paths: &EpisodePaths) -> Result<()> {
    fs::remove_file(&paths.original).map_err(|e| FetchError::io(&paths.original, e))?;
    fs::rename(&paths.temp_wav, &paths.wav).map_err(|e| FetchError::io(&paths.temp_wav, e))
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial output"),
    }
}
