use super::store::iso_timestamp;
use super::{ExtraTopicId, StepId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub steps: Vec<StepId>,
    pub extras: Vec<ExtraTopicId>,
    #[serde(serialize_with = "serialize_iso")]
    pub export_date: DateTime<Utc>,
    pub total_steps: usize,
    pub total_extras: usize,
}

impl ExportDocument {
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{prefix}-progress-{}.json",
            self.export_date.format("%Y-%m-%d")
        )
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize progress export")
    }
}

pub fn save_export(document: &ExportDocument, export_dir: &Path, prefix: &str) -> Result<PathBuf> {
    fs::create_dir_all(export_dir).with_context(|| {
        format!(
            "Failed to create export directory: {}",
            export_dir.display()
        )
    })?;

    let path = export_dir.join(document.file_name(prefix));
    fs::write(&path, document.to_pretty_json()?)
        .with_context(|| format!("Failed to write progress export: {}", path.display()))?;

    Ok(path)
}

fn serialize_iso<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_timestamp(value))
}
