use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{RecorderError, RecorderSettings, MAX_FILE_INDEX};

/// One open recording.
///
/// Owns the output file for the whole session. Lines are flushed as they are
/// written, so a write error surfaces on the sample that caused it.
pub struct LogSession {
    path: PathBuf,
    writer: LineWriter<Box<dyn Write>>,
    settings: RecorderSettings,
    started: Instant,
    last_written: Option<(i32, i32)>,
    samples_written: u64,
}

impl LogSession {
    /// Opens the first free `<pattern>NNN` file and writes the banner.
    pub fn start(
        settings: RecorderSettings,
        created_at: DateTime<Local>,
    ) -> Result<Self, RecorderError> {
        let (path, file) = open_next_free(&settings.file_pattern)?;
        info!("Recording to {}", path.display());

        let mut session = Self {
            path,
            writer: LineWriter::new(Box::new(file)),
            settings,
            started: Instant::now(),
            last_written: None,
            samples_written: 0,
        };

        if session.settings.write_banner {
            session.write_banner(created_at)?;
        }

        Ok(session)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time since the session was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Appends one sample. `y` is the raw device value and is written negated.
    ///
    /// Returns `false` when the sample was skipped as unchanged.
    pub fn write_sample(
        &mut self,
        elapsed: Duration,
        x: i32,
        y: i32,
        secondary_pressed: bool,
    ) -> Result<bool, RecorderError> {
        if self.settings.log_only_on_change && !self.settings.secondary_configured {
            if self.last_written == Some((x, y)) {
                debug!("Sample unchanged, skipped");
                return Ok(false);
            }
            self.last_written = Some((x, y));
        }

        let seconds = elapsed.as_secs_f64();
        let result = if self.settings.secondary_configured {
            writeln!(
                self.writer,
                "{:.3},{},{},{}",
                seconds,
                x,
                -y,
                u8::from(secondary_pressed)
            )
        } else {
            writeln!(self.writer, "{:.3},{},{}", seconds, x, -y)
        };

        result.map_err(|source| {
            error!("Writing sample to {} failed: {}", self.path.display(), source);
            RecorderError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        self.samples_written += 1;
        Ok(true)
    }

    /// Flushes and closes the file.
    pub fn stop(mut self) -> Result<PathBuf, RecorderError> {
        self.writer.flush().map_err(|source| RecorderError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(
            "Closed {} after {} samples",
            self.path.display(),
            self.samples_written
        );
        Ok(self.path)
    }

    fn write_banner(&mut self, created_at: DateTime<Local>) -> Result<(), RecorderError> {
        let mut banner = format!(
            "# File created at {}\n# Axes magnitude: {}\n# Ticks / second: {:.1}\n",
            created_at.format("%a %b %e %H:%M:%S %Y"),
            self.settings.axis_magnitude,
            self.settings.sample_rate,
        );
        if self.settings.banner_comment.is_empty() {
            banner.push_str("#\n");
        }
        for line in self.settings.banner_comment.lines() {
            banner.push_str("# ");
            banner.push_str(line);
            banner.push('\n');
        }

        self.writer
            .write_all(banner.as_bytes())
            .map_err(|source| RecorderError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Creates the first of `<pattern>000` .. `<pattern>999` that does not exist.
fn open_next_free(pattern: &str) -> Result<(PathBuf, File), RecorderError> {
    for index in 0..MAX_FILE_INDEX {
        let candidate = PathBuf::from(format!("{}{:03}", pattern, index));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next", candidate.display());
            }
            Err(source) => {
                warn!("Cannot create {}: {}", candidate.display(), source);
                return Err(RecorderError::Create {
                    path: candidate,
                    source,
                });
            }
        }
    }

    Err(RecorderError::Exhausted {
        pattern: pattern.to_string(),
    })
}
