use anyhow::{bail, Context, Result};
use clap::Parser;
use episode_fetcher::{
    config::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE},
    convert::FfmpegConverter,
    episodes::load_episodes,
    fetch::HttpDownloader,
    EpisodeFetcher, ErrorPolicy, FetcherConfig,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Download podcast episodes listed in a CSV table and convert each to a
/// 16 kHz mono wav under `<wavs>/<show>/<episode>.wav`.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Episodes table (no header row; URL in column 3, show and episode id in the last two columns)
    #[arg(long)]
    episodes: PathBuf,

    /// Output root for converted wavs
    #[arg(long, default_value = "wavs")]
    wavs: PathBuf,

    /// Converter binary
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Output channel count
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    channels: u16,

    /// Keep processing remaining episodes after one fails
    #[arg(long)]
    keep_going: bool,
}

impl Args {
    fn config(&self) -> FetcherConfig {
        let policy = if self.keep_going {
            ErrorPolicy::KeepGoing
        } else {
            ErrorPolicy::Abort
        };
        let mut cfg = FetcherConfig::new(&self.wavs).with_error_policy(policy);
        cfg.sample_rate = self.sample_rate;
        cfg.channels = self.channels;
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(episodes = %args.episodes.display(), wavs = %args.wavs.display(), "startup");

    let rows = load_episodes(&args.episodes)?;
    let fetcher = EpisodeFetcher::new(
        args.config(),
        HttpDownloader::new()?,
        FfmpegConverter::new(&args.ffmpeg),
    );

    let summary = fetcher
        .run(&rows)
        .await
        .with_context(|| format!("processing {}", args.episodes.display()))?;

    if summary.failed > 0 {
        bail!(
            "{} of {} episode(s) failed",
            summary.failed,
            summary.total
        );
    }

    info!("all done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_original_cli() {
        let args = Args::try_parse_from(["episode-fetcher", "--episodes", "eps.csv"]).unwrap();
        let cfg = args.config();
        assert_eq!(args.episodes, PathBuf::from("eps.csv"));
        assert_eq!(cfg.wav_root, PathBuf::from("wavs"));
        assert_eq!(cfg.sample_rate, 16_000);
        assert_eq!(cfg.channels, 1);
        assert_eq!(cfg.on_error, ErrorPolicy::Abort);
        assert_eq!(args.ffmpeg, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn episodes_flag_is_required() {
        assert!(Args::try_parse_from(["episode-fetcher"]).is_err());
    }

    #[test]
    fn overrides_flow_into_config() {
        let args = Args::try_parse_from([
            "episode-fetcher",
            "--episodes",
            "eps.csv",
            "--wavs",
            "out",
            "--sample-rate",
            "8000",
            "--channels",
            "2",
            "--keep-going",
        ])
        .unwrap();
        let cfg = args.config();
        assert_eq!(cfg.wav_root, PathBuf::from("out"));
        assert_eq!(cfg.sample_rate, 8000);
        assert_eq!(cfg.channels, 2);
        assert_eq!(cfg.on_error, ErrorPolicy::KeepGoing);
    }
}
