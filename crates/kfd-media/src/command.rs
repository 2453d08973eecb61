//! FFmpeg command builder and runner.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path or pattern
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Force the input container/codec format (e.g. `h264` for raw streams).
    pub fn input_format(self, format: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg(format)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set the video sync method (`0` passes every frame through untouched).
    pub fn vsync(self, mode: impl Into<String>) -> Self {
        self.output_arg("-vsync").output_arg(mode)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Output of a successful FFmpeg run.
#[derive(Debug, Clone, Default)]
pub struct FfmpegOutput {
    /// Diagnostic text FFmpeg wrote to stderr (warnings at `-v error` and above)
    pub stderr: String,
}

/// Runner for FFmpeg commands with timeout support.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Executable to run
    program: PathBuf,
    /// Arguments placed before the generated FFmpeg arguments
    leading_args: Vec<OsString>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner for the `ffmpeg` binary on `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            leading_args: Vec::new(),
            timeout_secs: None,
        }
    }

    /// Run a different executable in place of `ffmpeg`.
    ///
    /// `leading_args` go before the generated arguments, which lets a wrapper
    /// such as `sh -c '<script>' ffmpeg` stand in for the real binary.
    pub fn with_program<I, S>(mut self, program: impl Into<PathBuf>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.program = program.into();
        self.leading_args = leading_args.into_iter().map(Into::into).collect();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check the configured executable can be found.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::FfmpegNotFound)
    }

    /// Run an FFmpeg command, capturing its stderr.
    ///
    /// A non-zero exit is reported as [`MediaError::FfmpegFailed`] carrying
    /// the captured stderr.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegOutput> {
        self.check()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let status = match self.wait_for_completion(&mut child).await {
            Ok(status) => status,
            Err(e) => {
                stderr_handle.abort();
                return Err(e);
            }
        };

        let stderr = stderr_handle.await.unwrap_or_default();

        if status.success() {
            Ok(FfmpegOutput { stderr })
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                status.code(),
            ))
        }
    }

    /// Wait for child process with optional timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let Some(timeout_secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout_secs))
            }
        }
    }
}
