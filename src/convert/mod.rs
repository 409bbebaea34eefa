// src/convert/mod.rs
use std::{
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{FetchError, Result};

/// Target format of a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Turns a downloaded source file into a PCM waveform.
pub trait Converter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: WavFormat,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Runs an external `ffmpeg` (or compatible) binary.
#[derive(Clone, Debug)]
pub struct FfmpegConverter {
    program: PathBuf,
}

/// Keep error messages readable when the converter is chatty.
const STDERR_TAIL: usize = 2048;

impl FfmpegConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(input: &Path, output: &Path, format: WavFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.into());
        args.push("-ac".into());
        args.push(format.channels.to_string().into());
        args.push("-ar".into());
        args.push(format.sample_rate.to_string().into());
        args.push(output.into());
        args
    }
}

impl Converter for FfmpegConverter {
    async fn convert(&self, input: &Path, output: &Path, format: WavFormat) -> Result<()> {
        let args = Self::args(input, output, format);
        debug!(program = %self.program.display(), ?args, "running converter");

        let out = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::ConverterUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        if !out.status.success() {
            return Err(FetchError::Conversion {
                input: input.to_path_buf(),
                status: out.status,
                stderr: stderr_tail(&out.stderr),
            });
        }
        if !output.exists() {
            return Err(FetchError::MissingOutput(output.to_path_buf()));
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "converted"
        );
        Ok(())
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
