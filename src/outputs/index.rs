//! The `seen.json` index of stored publications.
//!
//! Keeps every link ever stored plus the last id handed out, so later runs
//! skip known publications and keep ids increasing. Updates only append.

use crate::models::PublicationDocument;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const INDEX_FILE: &str = "seen.json";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeenIndex {
    pub last_id: u64,
    pub links: Vec<String>,
}

impl SeenIndex {
    fn path(json_output_dir: &str) -> PathBuf {
        Path::new(json_output_dir).join(INDEX_FILE)
    }

    /// Load the index, or an empty one on first run.
    #[instrument(level = "info", skip_all, fields(%json_output_dir))]
    pub async fn load(json_output_dir: &str) -> Result<Self, Box<dyn Error>> {
        let path = Self::path(json_output_dir);
        if !path.exists() {
            info!("No seen index yet; starting fresh");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).await?;
        let index: SeenIndex = serde_json::from_str(&raw)?;
        info!(known = index.links.len(), last_id = index.last_id, "Loaded seen index");
        Ok(index)
    }

    /// Record newly stored documents.
    pub fn extend(&mut self, documents: &[PublicationDocument]) {
        for doc in documents {
            if !self.links.contains(&doc.link) {
                self.links.push(doc.link.clone());
            }
            if let Some(id) = doc.id {
                self.last_id = self.last_id.max(id);
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(%json_output_dir))]
    pub async fn save(&self, json_output_dir: &str) -> Result<(), Box<dyn Error>> {
        let path = Self::path(json_output_dir);
        fs::write(&path, serde_json::to_string_pretty(self)?).await?;
        info!(path = %path.display(), known = self.links.len(), "Updated seen index");
        Ok(())
    }
}
