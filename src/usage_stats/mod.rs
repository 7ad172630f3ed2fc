pub mod reader;
pub mod source;

pub use reader::UsageStatsReader;
pub use source::{NoUsageAccess, TransitionEvent, TransitionKind, UsageEventSource, UsageLogFile};

use std::path::Path;

/// Usage-stats source for the configured transition log; no log means no access.
pub fn source_for(usage_log_path: Option<&Path>) -> Box<dyn UsageEventSource> {
    match usage_log_path {
        Some(path) => Box::new(UsageLogFile::new(path)),
        None => Box::new(NoUsageAccess),
    }
}
