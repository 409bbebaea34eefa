use std::path::{Component, Path, PathBuf};
use tracing::warn;
use url::Url;

use super::EpisodeRecord;
use crate::error::{FetchError, Result};

/// Known source containers, tried in this order.
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".mp4", ".wav"];

/// Pick the extension of the downloaded file from its URL.
///
/// The first known extension that appears anywhere in the URL path wins.
/// Query and fragment are ignored when the URL parses; otherwise the whole
/// string is searched. Returns `""` when nothing matches.
pub fn resolve_extension(url: &str) -> &'static str {
    let parsed = Url::parse(url).ok();
    let haystack = parsed.as_ref().map(Url::path).unwrap_or(url);

    AUDIO_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| haystack.contains(ext))
        .unwrap_or("")
}

/// Append `part` to `base`, keeping only plain name components.
///
/// Root, prefix, `.` and `..` components are dropped so a table field can
/// never point outside `base`.
fn join_under(base: &Path, part: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    out.extend(Path::new(part).components().filter_map(|c| match c {
        Component::Normal(name) => Some(name),
        _ => None,
    }));
    out
}

/// All filesystem locations touched while processing one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePaths {
    pub episode_dir: PathBuf,
    pub extension: &'static str,
    /// Where the downloaded source lands.
    pub original: PathBuf,
    /// Final 16 kHz mono output; its presence marks the episode done.
    pub wav: PathBuf,
    /// Converter output, renamed onto `wav` once conversion succeeds.
    pub temp_wav: PathBuf,
}

impl EpisodePaths {
    pub fn resolve(wav_root: &Path, record: &EpisodeRecord) -> Self {
        let episode_dir = join_under(wav_root, &record.show);
        let extension = resolve_extension(&record.url);
        if extension.is_empty() {
            warn!(
                url = %record.url,
                "no known audio extension in URL, original will have no suffix"
            );
        }
        let id = &record.episode;

        Self {
            original: join_under(&episode_dir, &format!("{}{}", id, extension)),
            wav: join_under(&episode_dir, &format!("{}.wav", id)),
            temp_wav: join_under(&episode_dir, &format!("{}.temp.wav", id)),
            episode_dir,
            extension,
        }
    }

    /// Create the directory holding the outputs if it is not there yet.
    ///
    /// Usually `episode_dir`; deeper when the episode id itself has separators.
    pub fn ensure_dir(&self) -> Result<()> {
        let dir = self.wav.parent().unwrap_or(&self.episode_dir);
        std::fs::create_dir_all(dir).map_err(|e| FetchError::io(dir, e))
    }
}
