use std::path::PathBuf;

/// What to do when a single episode fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the whole run on the first failing episode.
    #[default]
    Abort,
    /// Log the failure, count it, and move on to the next episode.
    KeepGoing,
}

/// Explicit run configuration handed to [`crate::pipeline::EpisodeFetcher`].
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    /// Root directory; outputs land in `<wav_root>/<show>/<episode>.wav`.
    pub wav_root: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub on_error: ErrorPolicy,
}

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_CHANNELS: u16 = 1;

impl FetcherConfig {
    pub fn new(wav_root: impl Into<PathBuf>) -> Self {
        Self {
            wav_root: wav_root.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            on_error: ErrorPolicy::Abort,
        }
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::new("wavs")
    }
}
