use std::path::Path;

use colored::Colorize;

use crate::cli::open_db;
use crate::error::{ComptesError, Result};
use crate::importer::{analyze, import_transactions, ImportMode, ImportOutcome};

pub fn run(file: &str, dry_run: bool, include_duplicates: bool) -> Result<()> {
    let path = Path::new(file);
    if !path.is_file() {
        return Err(ComptesError::Validation(format!("No file to import: {file}")));
    }
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);

    let mode = if dry_run {
        ImportMode::DryRun
    } else {
        ImportMode::Commit {
            skip_duplicates: !include_duplicates,
        }
    };

    // A dry run never opens, creates or seeds the database.
    let outcome = match mode {
        ImportMode::DryRun => ImportOutcome::DryRun(analyze(&bytes)?),
        ImportMode::Commit { .. } => import_transactions(&open_db()?, &bytes, filename, mode)?,
    };
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match &outcome {
        ImportOutcome::DryRun(report) if report.duplicates_count > 0 => eprintln!(
            "{}",
            format!(
                "{} duplicate row(s) in file. Re-run without --dry-run to skip them, or with --include-duplicates to keep them.",
                report.duplicates_count
            )
            .yellow()
        ),
        ImportOutcome::Committed(result) if !result.errors.is_empty() => eprintln!(
            "{}",
            format!("{} row(s) could not be saved.", result.errors.len()).red()
        ),
        _ => {}
    }
    Ok(())
}
