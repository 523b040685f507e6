//! Pipeline results.

use std::path::PathBuf;

use serde::Serialize;

use super::request::RequestKind;

/// Outcome of one pipeline run.
///
/// `track_count` is the number of items that made it through download and
/// validation. `tagged` counts those whose tag write also succeeded;
/// `skipped` counts items dropped along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(rename = "id")]
    pub item_id: String,
    pub track_count: usize,
    #[serde(rename = "taggedCount")]
    pub tagged: usize,
    #[serde(rename = "skippedCount")]
    pub skipped: usize,
    pub file_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PipelineResult {
    pub fn new(kind: RequestKind, item_id: impl Into<String>) -> Self {
        Self {
            kind,
            item_id: item_id.into(),
            track_count: 0,
            tagged: 0,
            skipped: 0,
            file_paths: Vec::new(),
            title: None,
        }
    }

    /// Record an item that was downloaded and validated.
    pub fn push(&mut self, path: Option<PathBuf>, tagged: bool) {
        self.track_count += 1;
        if tagged {
            self.tagged += 1;
        }
        if let Some(path) = path {
            self.file_paths.push(path);
        }
    }

    /// Every item that made it through was also tagged, and nothing was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.tagged == self.track_count
    }

    /// The result map handed back to the job scheduler.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
