//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its
//! output accordingly: readable text for humans, stable JSON for
//! machines.

use serde::Serialize;
use std::io::{self, Write};
use taskwatch_core::WatchError;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render a value either as JSON or through the provided human writer.
///
/// # Errors
///
/// Returns an error if serialization or writing to stdout fails.
pub fn render<T, F>(mode: OutputMode, value: &T, human: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
    } else {
        human(value, &mut out)?;
    }
    Ok(())
}

/// Print an error to stderr. Domain errors carry their stable code and
/// an optional hint; anything else is surfaced generically so internal
/// detail does not leak to the boundary.
pub fn render_error(error: &anyhow::Error) {
    if let Some(watch_error) = error.downcast_ref::<WatchError>() {
        let code = watch_error.code();
        if watch_error.is_expected() {
            eprintln!("[{}] {}", code.code(), watch_error);
        } else {
            tracing::error!(code = code.code(), "{watch_error}");
            eprintln!("[{}] {}", code.code(), code.message());
        }
        if let Some(hint) = code.hint() {
            eprintln!("hint: {hint}");
        }
    } else {
        eprintln!("error: {error:#}");
    }
}

/// Format integer microseconds as RFC 3339 for human output.
pub fn micros_to_rfc3339(us: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_micros(us)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| us.to_string())
}
