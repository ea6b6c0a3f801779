//! Daily log files

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt::{writer::MakeWriterExt, MakeWriter};

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
pub struct LogConfig {
    /// Directory the daily log files are written to
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// The most verbose level to record
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}

/// An append-only log sink that starts a new file every calendar day.
///
/// Files are named `<dir>/<YYYY-MM-DD>.log` after the local date. Clones share
/// the same open file, and writes are serialized so lines from concurrent
/// requests never interleave.
#[derive(Clone, Debug)]
pub struct LogSink {
    inner: Arc<Mutex<DailyFile>>,
}

#[derive(Debug)]
struct DailyFile {
    dir: PathBuf,
    date: NaiveDate,
    file: File,
}

impl LogSink {
    /// Creates the log directory if needed and opens today's file.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;

        let date = Local::now().date_naive();
        let file = open_file(&dir, date)
            .with_context(|| format!("failed to open log file in {}", dir.display()))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(DailyFile { dir, date, file })),
        })
    }

    /// The path of the file currently being written
    pub fn path(&self) -> PathBuf {
        let daily = self.lock();
        file_path(&daily.dir, daily.date)
    }

    /// Flushes buffered lines and syncs the current file to disk.
    pub fn close(&self) -> io::Result<()> {
        let mut daily = self.lock();
        daily.file.flush()?;
        daily.file.sync_all()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DailyFile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut daily = self.lock();

        let today = Local::now().date_naive();
        if today != daily.date {
            daily.file = open_file(&daily.dir, today)?;
            daily.date = today;
        }

        daily.file.write_all(buf)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", date.format("%Y-%m-%d")))
}

fn open_file(dir: &Path, date: NaiveDate) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path(dir, date))
}

/// Opens the log sink and installs it, alongside stdout, as the global
/// `tracing` subscriber.
///
/// Keep the returned sink and flush it on shutdown.
#[mutants::skip]
pub fn init(config: &LogConfig) -> Result<LogSink> {
    let sink = LogSink::open(&config.log_dir)?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_writer(sink.clone().and(io::stdout))
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("failed to install log subscriber")?;

    Ok(sink)
}
