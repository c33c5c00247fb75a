/// Session journal
///
/// Records every user-level operation of a session in order:
/// - dataset loads
/// - entering integration
/// - Q changes and region count changes
/// - bound edits
/// - area exports
///
/// The journal can be exported as human-readable text or JSON. It is a
/// record only; ROI state is never rebuilt from it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// One journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Sequential operation number (1-based)
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub operation: String,
    pub description: String,
    /// Q the operation applied to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl SessionEntry {
    pub fn to_text(&self) -> String {
        format!(
            "[{:03}] {} | {} | {}{}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.description,
            self.q
                .as_ref()
                .map(|q| format!("\n      Q: {}", q))
                .unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    /// Dataset currently loaded
    pub source_file: String,
    pub software_version: String,
    pub entries: Vec<SessionEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            source_file: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.source_file = source.to_string();
    }

    /// Append an operation
    pub fn add_entry(&mut self, operation: &str, description: &str, q: Option<&str>) {
        let seq = self.entries.len() + 1;
        self.entries.push(SessionEntry {
            sequence: seq,
            timestamp: Local::now(),
            operation: operation.to_string(),
            description: description.to_string(),
            q: q.map(str::to_string),
        });
        log::info!("[LOG {:03}] {}: {}", seq, operation, description);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&SessionEntry> {
        self.entries.last()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str("  QENS ROI Session Log\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  Session ID:  {}\n", self.session_id));
        out.push_str(&format!(
            "  Started:     {}\n",
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("  Dataset:     {}\n", self.source_file));
        out.push_str(&format!("  Software:    qens-roi v{}\n", self.software_version));
        out.push_str(&format!("  Operations:  {}\n", self.entries.len()));
        out.push_str("───────────────────────────────────────────────────────────────\n\n");

        for entry in &self.entries {
            out.push_str(&entry.to_text());
            out.push_str("\n\n");
        }

        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str(&format!(
            "  Log exported: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// Save as JSON when the extension is `.json`, as text otherwise
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            std::fs::write(path, self.to_json())
        } else {
            std::fs::write(path, self.to_text())
        }
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}
