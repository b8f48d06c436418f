use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLogMode {
    Full,
    Diffed,
}

impl MessageLogMode {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "full" => Some(MessageLogMode::Full),
            "diffed" => Some(MessageLogMode::Diffed),
            _ => None,
        }
    }
}

/// Append-only NDJSON record of everything read from and written to the device.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous: HashMap<String, Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: HashMap::new(),
        })
    }

    pub fn log_command(&mut self, command: &str, zone: Option<u8>, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "command": command,
            "zone": zone,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_read(&mut self, endpoint: &str, status: u16, body: &Value) {
        if !(200..300).contains(&status) {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "read",
                "endpoint": endpoint,
                "status": status,
            });
            self.write_line(&entry);
            return;
        }

        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "read",
                    "endpoint": endpoint,
                    "status": status,
                    "body": body,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                let entry = match self.previous.get(endpoint) {
                    None => json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "read",
                        "endpoint": endpoint,
                        "status": status,
                        "full": true,
                        "body": body,
                    }),
                    Some(prev) => {
                        let mut changes = Vec::new();
                        diff_json(prev, body, "", &mut changes);
                        let change_entries: Vec<Value> = changes
                            .iter()
                            .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                            .collect();
                        json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "read",
                            "endpoint": endpoint,
                            "status": status,
                            "changes": change_entries,
                        })
                    }
                };
                self.write_line(&entry);
                self.previous.insert(endpoint.to_string(), body.clone());
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
