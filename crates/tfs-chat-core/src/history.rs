//! Bounded, persisted log of recent submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intent::Capability;
use crate::response::ServiceResponse;
use crate::store::KeyValueStore;

pub const HISTORY_KEY: &str = "recentActivity";
pub const MAX_ENTRIES: usize = 5;
const SUMMARY_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: Capability,
}

/// One line of the recent-activity panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySummary {
    pub text: String,
    pub age: String,
    pub success: bool,
    pub kind: Capability,
}

pub fn encode(entries: &[ActivityEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

pub fn decode(raw: &str) -> Result<Vec<ActivityEntry>> {
    Ok(serde_json::from_str(raw)?)
}

/// Coarse "how long ago" label.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "только что".to_string();
    }
    if minutes < 60 {
        return format!("{} мин назад", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} ч назад", hours);
    }

    format!("{} дн назад", hours / 24)
}

/// Cut a message to the panel width, marking the cut with `...`.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() > SUMMARY_CHARS {
        let head: String = message.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

pub struct ActivityHistory {
    entries: Vec<ActivityEntry>,
    store: Box<dyn KeyValueStore>,
}

impl ActivityHistory {
    /// Rehydrate from the store. Missing or unreadable data starts an empty history.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_ENTRIES);
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable activity history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read activity history");
                Vec::new()
            }
        };

        Self { entries, store }
    }

    /// Newest first, at most [`MAX_ENTRIES`].
    pub fn list(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn record(
        &mut self,
        message: &str,
        response: &ServiceResponse,
        kind: Capability,
    ) -> &ActivityEntry {
        self.push(ActivityEntry {
            timestamp: Utc::now(),
            message: message.to_string(),
            success: response.is_success(),
            kind,
        })
    }

    pub fn push(&mut self, entry: ActivityEntry) -> &ActivityEntry {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_ENTRIES);
        self.persist();
        &self.entries[0]
    }

    pub fn summaries(&self, now: DateTime<Utc>) -> Vec<ActivitySummary> {
        self.entries
            .iter()
            .map(|entry| ActivitySummary {
                text: truncate_message(&entry.message),
                age: time_ago(entry.timestamp, now),
                success: entry.success,
                kind: entry.kind,
            })
            .collect()
    }

    fn persist(&self) {
        let result = encode(&self.entries).and_then(|raw| self.store.set(HISTORY_KEY, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist activity history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::sync::Arc;

    /// Lets a test keep a handle on the store the history writes to.
    struct SharedStore(Arc<MemoryStore>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
    }

    fn entry(message: &str, minutes_ago: i64) -> ActivityEntry {
        ActivityEntry {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            message: message.to_string(),
            success: true,
            kind: Capability::ChangeChain,
        }
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "только что");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 мин назад");
        assert_eq!(time_ago(now - Duration::minutes(90), now), "1 ч назад");
        assert_eq!(time_ago(now - Duration::hours(50), now), "2 дн назад");
        assert_eq!(time_ago(now + Duration::minutes(3), now), "только что");
    }

    #[test]
    fn history_keeps_five_newest_first() {
        let mut history = ActivityHistory::load(Box::new(MemoryStore::new()));
        for i in 1..=6 {
            history.push(entry(&format!("m{}", i), 0));
        }

        let messages: Vec<&str> = history.list().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["m6", "m5", "m4", "m3", "m2"]);
    }

    #[test]
    fn every_record_is_persisted_and_rehydrated() {
        let store = Arc::new(MemoryStore::new());
        let mut history = ActivityHistory::load(Box::new(SharedStore(store.clone())));
        history.record(
            "Создай чек-лист БДК ЗЗЛ #1",
            &ServiceResponse::Failure { message: "нет".into() },
            Capability::Checklist,
        );

        let reloaded = ActivityHistory::load(Box::new(SharedStore(store)));
        assert_eq!(reloaded.list(), history.list());
        assert!(!reloaded.list()[0].success);
        assert_eq!(reloaded.list()[0].kind, Capability::Checklist);
    }

    #[test]
    fn corrupt_store_yields_empty_history() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        let history = ActivityHistory::load(Box::new(store));
        assert!(history.list().is_empty());
    }

    #[test]
    fn encode_decode_round_trip_preserves_order() {
        let entries: Vec<ActivityEntry> = (0..5).map(|i| entry(&format!("e{}", i), i)).collect();
        let decoded = decode(&encode(&entries).unwrap()).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn stored_entries_use_type_field() {
        let raw = encode(&[entry("m", 0)]).unwrap();
        assert!(raw.contains("\"type\":\"change-chain\""));
    }

    #[test]
    fn summaries_truncate_long_messages() {
        let mut history = ActivityHistory::load(Box::new(MemoryStore::new()));
        let long = "ы".repeat(45);
        history.push(entry(&long, 10));

        let summary = &history.summaries(Utc::now())[0];
        assert_eq!(summary.text, format!("{}...", "ы".repeat(40)));
        assert_eq!(summary.age, "10 мин назад");
        assert_eq!(truncate_message("short"), "short");
    }
}
