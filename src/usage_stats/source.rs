use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Foreground,
    Background,
}

/// One entry of the host's raw foreground/background log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub package: String,
    pub kind: TransitionKind,
    pub timestamp_ms: i64,
}

/// Host usage-statistics service.
pub trait UsageEventSource {
    fn is_permission_granted(&self) -> bool;

    /// Transitions with `start_ms <= timestamp < end_ms`, in log order.
    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TransitionEvent>>;
}

impl<S: UsageEventSource + ?Sized> UsageEventSource for &S {
    fn is_permission_granted(&self) -> bool {
        (**self).is_permission_granted()
    }

    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TransitionEvent>> {
        (**self).query_events(start_ms, end_ms)
    }
}

impl<S: UsageEventSource + ?Sized> UsageEventSource for Box<S> {
    fn is_permission_granted(&self) -> bool {
        (**self).is_permission_granted()
    }

    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TransitionEvent>> {
        (**self).query_events(start_ms, end_ms)
    }
}

/// Stand-in for a host that never granted usage access.
pub struct NoUsageAccess;

impl UsageEventSource for NoUsageAccess {
    fn is_permission_granted(&self) -> bool {
        false
    }

    fn query_events(&self, _start_ms: i64, _end_ms: i64) -> Result<Vec<TransitionEvent>> {
        Ok(Vec::new())
    }
}

/// Transition log exported by the host bridge as JSON lines. The file being
/// absent means usage access was not granted.
pub struct UsageLogFile {
    path: PathBuf,
}

impl UsageLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UsageEventSource for UsageLogFile {
    fn is_permission_granted(&self) -> bool {
        self.path.is_file()
    }

    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TransitionEvent>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open usage log {}", self.path.display()))?;
        let mut events = Vec::new();
        for (index, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let raw = raw.with_context(|| format!("Failed to read usage log {}", self.path.display()))?;
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Skipping unreadable usage log line {}: {}", index + 1, e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TransitionEvent>(&line) {
                Ok(event) if event.timestamp_ms >= start_ms && event.timestamp_ms < end_ms => {
                    events.push(event)
                }
                Ok(_) => {}
                Err(e) => log::warn!("Skipping malformed usage log line {}: {}", index + 1, e),
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
pub struct MemoryUsageLog {
    events: Vec<TransitionEvent>,
}

#[cfg(test)]
impl MemoryUsageLog {
    pub fn new(events: Vec<TransitionEvent>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
impl UsageEventSource for MemoryUsageLog {
    fn is_permission_granted(&self) -> bool {
        true
    }

    fn query_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TransitionEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.timestamp_ms >= start_ms && e.timestamp_ms < end_ms)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_usage_log_file_filters_window_and_skips_garbage() {
        let path = std::env::temp_dir().join(format!("lwm-usage-{}.jsonl", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, r#"{{"package":"a","kind":"foreground","timestamp_ms":10}}"#).unwrap();
            writeln!(file, "not json").unwrap();
            file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
            writeln!(file).unwrap();
            writeln!(file, r#"{{"package":"a","kind":"background","timestamp_ms":50}}"#).unwrap();
            writeln!(file, r#"{{"package":"a","kind":"foreground","timestamp_ms":100}}"#).unwrap();
        }
        let log = UsageLogFile::new(&path);
        assert!(log.is_permission_granted());
        let events = log.query_events(0, 100).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, TransitionKind::Background);
        std::fs::remove_file(&path).unwrap();
        assert!(!log.is_permission_granted());
    }
}
