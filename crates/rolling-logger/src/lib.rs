//! Rolling File Logger
//!
//! Writes `tracing` events (and `log` records, bridged) to `<dir>/<app>.log`.
//! When the file grows past its size limit it is shifted to `<app>.log.1`,
//! older files move up to `.N` and the oldest is dropped.
//! The last lines written are also kept in memory for display.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 5;
pub const BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

struct Inner {
    dir: PathBuf,
    app_name: String,
    max_bytes: u64,
    max_files: usize,
    file: File,
    size: u64,
    recent: VecDeque<String>,
    /// Bytes after the last newline, waiting for the rest of their line
    partial: Vec<u8>,
}

/// Size-rotated log file plus a ring buffer of recent lines
#[derive(Clone)]
pub struct RollingWriter {
    inner: Arc<Mutex<Inner>>,
}

impl RollingWriter {
    pub fn new(dir: impl AsRef<Path>, app_name: &str, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                dir,
                app_name: app_name.to_string(),
                max_bytes,
                max_files: max_files.max(1),
                file,
                size,
                recent: VecDeque::with_capacity(BUFFER_LINES),
                partial: Vec::new(),
            })),
        })
    }

    pub fn log_path(&self) -> PathBuf {
        match self.inner.lock() {
            Ok(inner) => inner.current_path(),
            Err(poisoned) => poisoned.into_inner().current_path(),
        }
    }

    /// Up to `BUFFER_LINES` most recent complete lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(inner) => inner.recent.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().recent.iter().cloned().collect(),
        }
    }
}

impl Inner {
    fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    fn rotated_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.app_name, n))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.rotated_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = self.rotated_path(n);
            if from.exists() {
                fs::rename(&from, self.rotated_path(n + 1))?;
            }
        }
        fs::rename(self.current_path(), self.rotated_path(1))?;
        self.file = OpenOptions::new().create(true).append(true).open(self.current_path())?;
        self.size = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.partial.extend_from_slice(buf);
        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).trim_end().to_string();
            if self.recent.len() == BUFFER_LINES {
                self.recent.pop_front();
            }
            self.recent.push_back(text);
        }
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        if inner.size > 0 && inner.size + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        inner.file.write_all(buf)?;
        inner.size += buf.len() as u64;
        inner.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        inner.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps with milliseconds
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber writing to `<dir>/<app_name>.log`.
///
/// Level comes from `RUST_LOG`, `info` when unset. Calling it twice is an error.
pub fn init_logger(dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    let writer = RollingWriter::new(dir, app_name, DEFAULT_MAX_BYTES, DEFAULT_MAX_FILES)
        .map_err(|e| format!("Failed to open log file: {}", e))?;
    LOGGER
        .set(writer.clone())
        .map_err(|_| "Logger already initialized".to_string())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(LocalTime)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    log::info!("Logging to {}", log_path().map(|p| p.display().to_string()).unwrap_or_default());
    Ok(())
}

pub fn log_path() -> Option<PathBuf> {
    LOGGER.get().map(RollingWriter::log_path)
}

/// Recent lines of the global logger; empty before `init_logger`
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(RollingWriter::recent_lines).unwrap_or_default()
}

fn ensure_init() -> Result<(), String> {
    if LOGGER.get().is_none() {
        return Err("Logger not initialized".to_string());
    }
    Ok(())
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_init()?;
    log::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_init()?;
    log::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_init()?;
    log::error!("{}", msg);
    Ok(())
}
