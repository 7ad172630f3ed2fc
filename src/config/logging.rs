use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

const DEBUG_FILTER: &str = "life_waste_meter=debug";

/// Flushes after every write so log lines show up while the process runs.
struct FlushingWriter {
    inner: Arc<Mutex<File>>,
}

impl FlushingWriter {
    fn new(file: File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, File>> {
        self.inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.lock()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock()?.flush()
    }
}

/// Debug logs go to `log_file` when enabled; otherwise logging stays off.
pub fn init_logging(log_file: &str, debug_enabled: bool) -> Result<()> {
    if debug_enabled {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open {}", log_file))?;

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEBUG_FILTER))
            .target(env_logger::Target::Pipe(Box::new(FlushingWriter::new(file))))
            .init();

        log::info!("=== DEBUG LOGGING ENABLED ===");
        log::info!("Writing logs to {}", log_file);
        log::info!("To disable: Remove DEBUG_LOGS_ENABLED from .env or set to false");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
    }
    Ok(())
}
