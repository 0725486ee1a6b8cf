//! JSON output of accepted documents.
//!
//! Each run writes one file, `{json_output_dir}/{date}/ecb_{HHMMSS}.json`,
//! holding the documents accepted in that run in acceptance order. Runs that
//! accepted nothing write nothing.

use crate::models::PublicationDocument;
use chrono::NaiveDateTime;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `documents` under `json_output_dir`, stamping each with its storage path.
///
/// # Returns
///
/// The path written, or `None` when there was nothing to write.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, count = documents.len()))]
pub async fn write_documents(
    documents: &mut [PublicationDocument],
    json_output_dir: &str,
    now: NaiveDateTime,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    if documents.is_empty() {
        info!("No new documents; skipping JSON output");
        return Ok(None);
    }

    let full_json_dir = PathBuf::from(json_output_dir).join(now.format("%Y-%m-%d").to_string());
    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("ecb_{}.json", now.format("%H%M%S")));
    let storage = path.display().to_string();
    for doc in documents.iter_mut() {
        doc.storage = Some(storage.clone());
    }

    let json = serde_json::to_string_pretty(&*documents)?;
    fs::write(&path, json).await?;
    info!(path = %storage, "Wrote publication JSON");
    Ok(Some(path))
}
