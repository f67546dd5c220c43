//! Training-data export: a read-only projection over the blacklist.
//!
//! Entries whose training fields were withheld (no consent) are exported
//! with the message content redacted, preserving analytic value without
//! leaking non-consented content.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::store::{BlacklistEntry, SqliteStore};

/// Placeholder substituted for non-consented message content.
pub const REDACTED: &str = "[REDACTED]";

/// Export serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jsonl,
    Csv,
}

/// Options controlling an export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub min_confidence: f64,
    pub verified_only: bool,
    pub limit: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jsonl,
            min_confidence: 0.0,
            verified_only: false,
            limit: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonlMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonlRecord<'a> {
    messages: Vec<JsonlMessage<'a>>,
    label: &'a str,
    scam_type: Option<&'a str>,
    confidence: Option<f64>,
    language: Option<&'a str>,
}

/// Produce a training-data export from the blacklist projection.
pub fn export_training_data(store: &Arc<SqliteStore>, opts: &ExportOptions) -> Result<String> {
    let entries = store.export_blacklist(opts.min_confidence, opts.verified_only, opts.limit)?;

    match opts.format {
        ExportFormat::Jsonl => export_jsonl(&entries),
        ExportFormat::Csv => Ok(export_csv(&entries)),
    }
}

fn message_of(entry: &BlacklistEntry) -> &str {
    entry.full_message.as_deref().unwrap_or(REDACTED)
}

fn export_jsonl(entries: &[BlacklistEntry]) -> Result<String> {
    let mut out = String::new();
    for entry in entries {
        let record = JsonlRecord {
            messages: vec![JsonlMessage {
                role: "user",
                content: message_of(entry),
            }],
            label: "scam",
            scam_type: entry.scam_type.as_deref(),
            confidence: entry.confidence,
            language: entry.language.as_deref(),
        };
        out.push_str(&serde_json::to_string(&record)?);
        out.push('\n');
    }
    Ok(out)
}

fn export_csv(entries: &[BlacklistEntry]) -> String {
    let mut out = String::from("value,type,message,ai_reasoning,scam_type,confidence,language\n");
    for entry in entries {
        let row = [
            csv_field(&entry.value),
            csv_field(entry.kind.as_str()),
            csv_field(message_of(entry)),
            csv_field(entry.ai_reasoning.as_deref().unwrap_or(REDACTED)),
            csv_field(entry.scam_type.as_deref().unwrap_or("")),
            entry
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_default(),
            csv_field(entry.language.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BlacklistSource, EntityKind, NewBlacklistEntry};

    fn seed(store: &SqliteStore, hash: &str, consented: bool, confidence: f64) {
        store
            .insert_blacklist_entry(
                EntityKind::Url,
                &NewBlacklistEntry {
                    value: format!("scam.example/{hash}"),
                    value_hash: hash.to_string(),
                    source: Some(BlacklistSource::AiAuto),
                    full_message: consented.then(|| "original message text".to_string()),
                    ai_reasoning: consented.then(|| "model reasoning".to_string()),
                    scam_type: consented.then(|| "Phishing".to_string()),
                    confidence: consented.then_some(confidence),
                    language: consented.then(|| "en".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_jsonl_export_shape() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed(&store, "h1", true, 0.9);

        let out = export_training_data(&store, &ExportOptions::default()).unwrap();
        let line: serde_json::Value = serde_json::from_str(out.trim()).unwrap();

        assert_eq!(line["messages"][0]["role"], "user");
        assert_eq!(line["messages"][0]["content"], "original message text");
        assert_eq!(line["label"], "scam");
        assert_eq!(line["scam_type"], "Phishing");
    }

    #[test]
    fn test_non_consented_entries_are_redacted() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed(&store, "h1", false, 0.9);

        let out = export_training_data(&store, &ExportOptions::default()).unwrap();
        assert!(out.contains(REDACTED));
        assert!(!out.contains("original message text"));
    }

    #[test]
    fn test_confidence_filter() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed(&store, "strong", true, 0.95);
        seed(&store, "weak", true, 0.4);

        let opts = ExportOptions {
            min_confidence: 0.8,
            ..Default::default()
        };
        let out = export_training_data(&store, &opts).unwrap();

        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("0.95"));
    }

    #[test]
    fn test_csv_export_escapes() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .insert_blacklist_entry(
                EntityKind::Url,
                &NewBlacklistEntry {
                    value: "scam.example".to_string(),
                    value_hash: "h".to_string(),
                    full_message: Some("line with, comma and \"quote\"".to_string()),
                    confidence: Some(0.8),
                    ..Default::default()
                },
            )
            .unwrap();

        let opts = ExportOptions {
            format: ExportFormat::Csv,
            ..Default::default()
        };
        let out = export_training_data(&store, &opts).unwrap();

        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "value,type,message,ai_reasoning,scam_type,confidence,language"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"line with, comma and \"\"quote\"\"\""));
    }
}
