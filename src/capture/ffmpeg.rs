//! Capture backend that runs ffmpeg as a child process
//!
//! Pause and resume stop and continue the process with SIGSTOP/SIGCONT.
//! Stop asks ffmpeg to quit through stdin so it writes the MP4 trailer, falls
//! back to SIGINT when that is not honoured in time, and gives up after a
//! second deadline, leaving the kill to `release`.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::Settings;

use super::{AudioEncoder, CaptureConfig, CaptureFactory, CaptureResource, OutputFormat};

/// How long ffmpeg must survive after spawn to count as started
const STARTUP_GRACE: Duration = Duration::from_millis(250);

/// How long ffmpeg gets to finish after the quit key
const QUIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long ffmpeg gets to finish after SIGINT
const INTERRUPT_TIMEOUT: Duration = Duration::from_secs(2);

const WAIT_POLL: Duration = Duration::from_millis(50);

/// Lines of ffmpeg stderr kept for error messages
const STDERR_TAIL: usize = 8;

/// Creates [`FfmpegCapture`] resources
#[derive(Debug, Clone)]
pub struct FfmpegFactory {
    binary: PathBuf,
    input_format: String,
    input_device: String,
}

impl FfmpegFactory {
    pub fn new(binary: PathBuf, input_format: String, input_device: String) -> Self {
        Self {
            binary,
            input_format,
            input_device,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.audio.ffmpeg_path.clone(),
            settings.audio.input_format.clone(),
            settings.audio.input_device.clone(),
        )
    }

    /// Check that the ffmpeg binary can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl CaptureFactory for FfmpegFactory {
    fn acquire(&self) -> Result<Box<dyn CaptureResource>> {
        if !self.is_available() {
            anyhow::bail!(
                "{} not found or not runnable. Please install ffmpeg.",
                self.binary.display()
            );
        }

        Ok(Box::new(FfmpegCapture::new(
            self.binary.clone(),
            self.input_format.clone(),
            self.input_device.clone(),
        )))
    }
}

/// One ffmpeg recording process
pub struct FfmpegCapture {
    binary: PathBuf,
    input_format: String,
    input_device: String,
    /// Arguments fixed by `prepare`
    args: Option<Vec<OsString>>,
    child: Option<Child>,
    /// Drains stderr into the log; yields the last lines once ffmpeg exits
    stderr: Option<JoinHandle<String>>,
    paused: bool,
    quit_timeout: Duration,
    interrupt_timeout: Duration,
}

impl FfmpegCapture {
    fn new(binary: PathBuf, input_format: String, input_device: String) -> Self {
        Self {
            binary,
            input_format,
            input_device,
            args: None,
            child: None,
            stderr: None,
            paused: false,
            quit_timeout: QUIT_TIMEOUT,
            interrupt_timeout: INTERRUPT_TIMEOUT,
        }
    }

    /// Last stderr lines of an exited process
    fn stderr_tail(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl CaptureResource for FfmpegCapture {
    fn prepare(&mut self, config: &CaptureConfig) -> Result<()> {
        if let Some(parent) = config.output_path.parent() {
            if !parent.is_dir() {
                anyhow::bail!("Output directory does not exist: {}", parent.display());
            }
        }
        self.args = Some(ffmpeg_args(&self.input_format, &self.input_device, config));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let args = self
            .args
            .as_ref()
            .context("Capture must be prepared before it is started")?;

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.binary.display()))?;
        self.stderr = child.stderr.take().map(drain_stderr);

        std::thread::sleep(STARTUP_GRACE);
        if let Some(status) = child.try_wait()? {
            let stderr = self.stderr_tail();
            anyhow::bail!("ffmpeg exited during startup ({}): {}", status, stderr.trim());
        }

        tracing::info!("ffmpeg: capture started (pid {})", child.id());
        self.child = Some(child);
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let child = self.child.as_ref().context("Capture is not running")?;
        signal(child, Signal::Stop)?;
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let child = self.child.as_ref().context("Capture is not running")?;
        signal(child, Signal::Continue)?;
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut child = self.child.take().context("Capture is not running")?;

        // A stopped process can't read the quit key.
        if self.paused {
            let _ = signal(&child, Signal::Continue);
            self.paused = false;
        }

        let asked_to_quit = child
            .stdin
            .take()
            .map(|mut stdin| stdin.write_all(b"q").and_then(|_| stdin.flush()).is_ok())
            .unwrap_or(false);

        let mut status = if asked_to_quit {
            wait_with_deadline(&mut child, self.quit_timeout)
        } else {
            tracing::warn!("ffmpeg: stdin closed, interrupting instead");
            Ok(None)
        };

        if matches!(status, Ok(None)) {
            if asked_to_quit {
                tracing::warn!(
                    "ffmpeg: still running {:?} after quit, sending SIGINT",
                    self.quit_timeout
                );
            }
            let _ = signal(&child, Signal::Interrupt);
            status = wait_with_deadline(&mut child, self.interrupt_timeout);
        }

        let status = match status {
            Ok(Some(status)) => status,
            // Still running or unknown; release kills and reaps it.
            Ok(None) => {
                self.child = Some(child);
                anyhow::bail!("ffmpeg did not exit after quit and SIGINT");
            }
            Err(e) => {
                self.child = Some(child);
                return Err(e);
            }
        };

        if !status.success() {
            let stderr = self.stderr_tail();
            anyhow::bail!("ffmpeg exited with {}: {}", status, stderr.trim());
        }

        tracing::info!("ffmpeg: capture finalized");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            if self.paused {
                let _ = signal(&child, Signal::Continue);
            }
            if let Err(e) = child.kill() {
                tracing::warn!("Failed to kill ffmpeg: {}", e);
            }
            if let Err(e) = child.wait() {
                tracing::warn!("Failed to reap ffmpeg: {}", e);
            }
        }
        self.stderr = None;
        self.paused = false;
        self.args = None;
    }

    fn backend_name(&self) -> &'static str {
        "ffmpeg"
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        self.release();
    }
}

fn ffmpeg_args(input_format: &str, input_device: &str, config: &CaptureConfig) -> Vec<OsString> {
    let codec = match config.encoder {
        AudioEncoder::Aac => "aac",
    };
    let container = match config.format {
        OutputFormat::Mpeg4 => "mp4",
    };

    let channels = config.channels.to_string();
    let sample_rate = config.sample_rate.to_string();
    let bitrate = config.bitrate.to_string();

    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-y",
        "-f",
        input_format,
        "-i",
        input_device,
        "-ac",
        channels.as_str(),
        "-ar",
        sample_rate.as_str(),
        "-c:a",
        codec,
        "-b:a",
        bitrate.as_str(),
        "-f",
        container,
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(config.output_path.clone().into_os_string());
    args
}

/// Poll until the child exits or `timeout` passes
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("Failed to wait for ffmpeg")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL);
    }
}

/// Log ffmpeg's stderr as it arrives so the pipe never fills up
fn drain_stderr(stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut tail: Vec<String> = Vec::new();
        for line in BufReader::new(stderr).lines() {
            let Ok(line) = line else { break };
            tracing::warn!("ffmpeg: {}", line);
            if tail.len() == STDERR_TAIL {
                tail.remove(0);
            }
            tail.push(line);
        }
        tail.join("\n")
    })
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Stop,
    Continue,
    Interrupt,
}

#[cfg(unix)]
fn signal(child: &Child, sig: Signal) -> Result<()> {
    let signo = match sig {
        Signal::Stop => libc::SIGSTOP,
        Signal::Continue => libc::SIGCONT,
        Signal::Interrupt => libc::SIGINT,
    };
    let result = unsafe { libc::kill(child.id() as libc::pid_t, signo) };
    if result != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("Failed to send {:?} to ffmpeg", sig));
    }
    Ok(())
}

#[cfg(not(unix))]
fn signal(_child: &Child, sig: Signal) -> Result<()> {
    anyhow::bail!("Sending {:?} to ffmpeg is not supported on this platform", sig)
}
