//! `tw init` — create the store and apply migrations.

use crate::output::{OutputMode, render};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use taskwatch_core::db;

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    db_path: String,
    schema_version: u32,
}

/// Open (creating if needed) the store at `db_path` and apply
/// migrations, reporting the resulting schema version.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or migrated.
pub fn run(db_path: &Path, mode: OutputMode) -> Result<()> {
    let conn = db::open_store(db_path)?;
    let schema_version = db::migrations::current_schema_version(&conn)?;

    let output = InitOutput {
        ok: true,
        db_path: db_path.display().to_string(),
        schema_version,
    };
    render(mode, &output, |o, w| {
        writeln!(w, "initialized store at {} (schema v{})", o.db_path, o.schema_version)
    })
}
