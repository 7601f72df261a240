//! Activity-log side channel.
//!
//! Subscribe/unsubscribe are expected to leave a trace in the external
//! activity collaborator. The core only owns the seam: a trait the
//! registry calls after each successful mutation. Failures in the
//! collaborator must not fail the mutation that already committed.

/// One activity entry produced by the watch registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Stable action token, e.g. `item_watched` / `item_unwatched`.
    pub action: &'static str,
    /// Human-readable description for the activity feed.
    pub description: String,
    pub user_id: String,
    pub team_id: String,
    pub item_id: String,
}

/// The external activity collaborator.
pub trait ActivityLog {
    fn record(&self, entry: ActivityEntry);
}

/// Production default: forwards entries to the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, entry: ActivityEntry) {
        tracing::info!(
            action = entry.action,
            user_id = %entry.user_id,
            team_id = %entry.team_id,
            item_id = %entry.item_id,
            "{}",
            entry.description
        );
    }
}

/// Test double that captures entries for assertions.
#[derive(Debug, Default)]
pub struct RecordingActivityLog {
    entries: std::sync::Mutex<Vec<ActivityEntry>>,
}

impl RecordingActivityLog {
    #[must_use]
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ActivityLog for RecordingActivityLog {
    fn record(&self, entry: ActivityEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}
