/*!
 * Process logger.
 *
 * Coloured lines with a millisecond timestamp go to stderr. When a log file is
 * configured, the same records are appended to it without colour, and the file
 * is rotated by size: `agent.log` becomes `agent.log.1`, `agent.log.1` becomes
 * `agent.log.2`, and so on up to the configured number of files.
 */

use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::app_config::LogConfig;

/// Size-rotated append-only log file
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            max_files,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files == 0 {
            self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.rotated_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.rotated_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    /// Append one line, rotating first if it would overflow the size cap
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }
        writeln!(self.file, "{}", line)?;
        self.written += len;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Logger writing to stderr and, optionally, a rotating file
pub struct AgentLogger {
    level: LevelFilter,
    file: Option<Mutex<RotatingFile>>,
}

impl AgentLogger {
    pub fn new(level: LevelFilter, file: Option<RotatingFile>) -> Self {
        Self {
            level,
            file: file.map(Mutex::new),
        }
    }

    fn emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => "",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    fn colour_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    /// Plain line used for the log file
    pub fn file_line(record: &Record) -> String {
        format!(
            "{} {:<5} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for AgentLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(
            io::stderr(),
            "{}{} {} {}\x1B[0m",
            Self::colour_for_level(record.level()),
            now,
            Self::emoji_for_level(record.level()),
            record.args()
        );

        if let Some(file) = &self.file {
            if let Err(e) = file.lock().write_line(&Self::file_line(record)) {
                let _ = writeln!(io::stderr(), "Failed to write log file: {}", e);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Install the process logger
pub fn init(config: &LogConfig) -> Result<()> {
    let level = config.level.to_level_filter();
    let file = match &config.file {
        Some(path) => Some(
            RotatingFile::open(path, config.max_size_mb.saturating_mul(1024 * 1024), config.max_files)
                .with_context(|| format!("Failed to open log file: {}", path))?,
        ),
        None => None,
    };

    log::set_boxed_logger(Box::new(AgentLogger::new(level, file)))
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}
