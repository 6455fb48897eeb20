use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file name inside the data directory
pub const LOG_FILE: &str = "linkview.log";
/// Rotate once the log grows past this size (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Bytes of recent history kept by a rotation (1 MB)
const KEEP_SIZE: u64 = 1024 * 1024;

const ROTATION_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// Trim `log_path` to its last `keep` bytes once it exceeds `max`, starting
/// at a line boundary. Returns whether a rotation happened.
fn rotate_log(log_path: &Path, max: u64, keep: u64) -> std::io::Result<bool> {
    let Ok(metadata) = fs::metadata(log_path) else {
        return Ok(false);
    };
    if metadata.len() <= max {
        return Ok(false);
    }

    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(metadata.len().saturating_sub(keep)))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;
    drop(file);

    let skip = tail
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(ROTATION_MARKER)?;
    file.write_all(&tail[skip..])?;
    Ok(true)
}

/// Shared handle to the open log file
#[derive(Clone)]
struct LogWriterFactory {
    file: Arc<Mutex<File>>,
}

struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl LogWriter {
    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            file: self.file.clone(),
        }
    }
}

/// Default directive when `RUST_LOG` is unset.
fn default_filter(level: &str) -> String {
    format!("linkview={level},linkview_core={level}")
}

/// Initialize logging to `{data_dir}/linkview.log`.
///
/// The file is trimmed to its most recent 1 MB whenever it has grown past
/// 5 MB. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(data_dir: &Path, level: &str) -> color_eyre::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    let log_path = data_dir.join(LOG_FILE);

    if let Err(e) = rotate_log(&log_path, MAX_LOG_SIZE, KEEP_SIZE) {
        eprintln!("Warning: Failed to rotate log file: {}", e);
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let writer_factory = LogWriterFactory {
        file: Arc::new(Mutex::new(file)),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer_factory)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()?;

    tracing::info!(log_path = %log_path.display(), "Logging initialized");
    Ok(log_path)
}
