/// Search inputs and results.
use serde::Serialize;
use std::time::Duration;

/// Caller choices for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Accept object names that merely start with the target.
    pub partial_match: bool,
    /// The target is a volume device: match the device and every path on it,
    /// but not a sibling volume whose name merely starts the same way.
    /// Overrides `partial_match`.
    pub whole_volume: bool,
    /// Never report handles held by the calling process.
    pub ignore_self: bool,
}

/// A process found holding a handle to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockHolder {
    pub pid: usize,
    /// Win32 image path, if it could be read.
    pub image_path: Option<String>,
    /// Value of the first matching handle inside the holder.
    pub handle_value: usize,
    pub granted_access: u32,
}

impl LockHolder {
    /// The report line for this holder.
    pub fn report_line(&self) -> String {
        match &self.image_path {
            Some(path) => format!("o {path}"),
            None => format!("o Unknown (Process ID {})", self.pid),
        }
    }
}

/// Work counters for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub records_examined: usize,
    pub open_attempts: usize,
    pub processes_opened: usize,
    pub processes_denied: usize,
    pub handles_duplicated: usize,
    pub names_resolved: usize,
}

/// Result of a finished (or cancelled) search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// At least one holder was found and the search ran to completion.
    pub found: bool,
    pub cancelled: bool,
    pub holders: Vec<LockHolder>,
    pub stats: SearchStats,
    pub started_at: chrono::DateTime<chrono::Local>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}
