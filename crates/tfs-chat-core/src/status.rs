use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub available: bool,
}

/// Availability of the backend's integrations, replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceInfo>,
}

impl StatusSnapshot {
    /// An empty snapshot means "not known yet", not "everything is down".
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.services.values().filter(|s| s.available).count()
    }
}
