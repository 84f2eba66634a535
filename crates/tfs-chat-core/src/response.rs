//! Typed view of the automation backend's chat responses.
//!
//! The backend answers every chat endpoint with one loosely shaped JSON object
//! whose fields may overlap (a preview also carries `data`, a creation response
//! also carries `data`, ...). [`ServiceResponse::from_value`] resolves the shape
//! once, in a fixed priority order, so the renderer can match on a plain enum.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

const DEFAULT_FAILURE_MESSAGE: &str = "Произошла ошибка";

/// A work-item id or ticket number. The backend sends both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A ticket created or referenced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRef {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,
}

/// Epic -> Feature -> Backlog Item chain produced by the change-chain flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeChain {
    pub epic: Option<WorkItemRef>,
    pub feature: Option<WorkItemRef>,
    pub backlog_item: Option<WorkItemRef>,
}

impl ChangeChain {
    fn from_value(data: &Value) -> Self {
        Self {
            epic: work_item_field(data, "Epic"),
            feature: work_item_field(data, "Feature"),
            backlog_item: work_item_field(data, "BacklogItem"),
        }
    }
}

fn work_item_field(data: &Value, key: &str) -> Option<WorkItemRef> {
    let raw = data.get(key).filter(|v| truthy(v))?;
    match serde_json::from_value(raw.clone()) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(role = key, error = %e, "dropping malformed work item");
            None
        }
    }
}

/// One acceptance-criteria entry of a draft story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Criterion {
    /// Pre-built markup (typically a Дано/Когда/Тогда table).
    Markup { html: String },
    Text(String),
    Other(Value),
}

impl Criterion {
    pub fn as_text(&self) -> String {
        match self {
            Criterion::Markup { html } => html.clone(),
            Criterion::Text(s) => s.clone(),
            Criterion::Other(v) => v.to_string(),
        }
    }
}

/// A user story proposed by the backend, not yet created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStoryDraft {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub acceptance_criteria: Vec<Criterion>,
    pub given_conditions: Option<String>,
    pub when_actions: Option<String>,
    pub then_results: Option<String>,
    pub us_number: Option<String>,
}

/// Pending user story creation awaiting a "Да"/"Нет" reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preview {
    pub user_stories_count: Option<u64>,
    pub team: Option<String>,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub parent_ticket: Option<ItemId>,
    pub wiki_link: Option<String>,
    pub confluence_url: Option<String>,
    pub article_title: Option<String>,
    #[serde(deserialize_with = "drafts_skipping_malformed")]
    pub user_stories: Vec<UserStoryDraft>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One bad draft must not hide the others.
fn drafts_skipping_malformed<'de, D>(deserializer: D) -> Result<Vec<UserStoryDraft>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed user story draft");
                None
            }
        })
        .collect())
}

impl Preview {
    /// Number of stories announced by the backend, or the number of drafts sent.
    pub fn story_count(&self) -> u64 {
        self.user_stories_count
            .unwrap_or(self.user_stories.len() as u64)
    }

    pub fn article_link(&self) -> Option<&str> {
        non_empty(self.wiki_link.as_deref()).or_else(|| non_empty(self.confluence_url.as_deref()))
    }
}

/// A decoded backend response, one variant per rendering path.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    Failure {
        message: String,
    },
    NeedsConfirmation {
        message: Option<String>,
        preview: Option<Preview>,
    },
    StoriesCreated {
        stories: Vec<WorkItemRef>,
        parent_ticket: Option<ItemId>,
        confluence_url: Option<String>,
    },
    ChangeChainResult(ChangeChain),
    ChecklistResult {
        work_item_id: Option<ItemId>,
        checklist: String,
    },
    Message(Option<String>),
}

impl ServiceResponse {
    /// Resolve a raw payload into exactly one variant.
    ///
    /// Order: failure, confirmation preview, created stories, change chain
    /// (`data`), checklist, generic message. A payload without `success: true`
    /// is a failure regardless of what else it carries.
    pub fn from_value(payload: &Value) -> Self {
        if payload.get("success").and_then(Value::as_bool) != Some(true) {
            let message = string_field(payload, "message")
                .or_else(|| string_field(payload, "error"))
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            return ServiceResponse::Failure { message };
        }

        let message = string_field(payload, "message");
        let data = payload.get("data").filter(|v| truthy(v));

        if field_is_truthy(payload, "needs_confirmation") {
            let preview = data
                .and_then(|d| d.get("preview"))
                .filter(|v| truthy(v))
                .or_else(|| payload.get("preview").filter(|v| truthy(v)))
                .and_then(|raw| match serde_json::from_value::<Preview>(raw.clone()) {
                    Ok(preview) => Some(preview),
                    Err(e) => {
                        tracing::warn!(error = %e, "preview payload could not be decoded");
                        None
                    }
                });
            return ServiceResponse::NeedsConfirmation { message, preview };
        }

        if let Some(raw) = payload.get("created_stories").filter(|v| truthy(v)) {
            let stories = raw
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| serde_json::from_value(item.clone()).ok())
                        .collect()
                })
                .unwrap_or_default();
            let parent_ticket = item_id_field(payload, "parent_ticket")
                .or_else(|| data.and_then(|d| item_id_field(d, "parent_ticket")));
            let confluence_url = string_field(payload, "confluence_url")
                .or_else(|| data.and_then(|d| string_field(d, "confluence_url")));
            return ServiceResponse::StoriesCreated {
                stories,
                parent_ticket,
                confluence_url,
            };
        }

        if let Some(data) = data {
            return ServiceResponse::ChangeChainResult(ChangeChain::from_value(data));
        }

        if let Some(checklist) = payload.get("checklist").filter(|v| truthy(v)) {
            let checklist = match checklist {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return ServiceResponse::ChecklistResult {
                work_item_id: item_id_field(payload, "work_item_id"),
                checklist,
            };
        }

        ServiceResponse::Message(message)
    }

    /// Build the failure shown when a request never produced a payload.
    pub fn transport_failure(error: impl fmt::Display) -> Self {
        ServiceResponse::Failure {
            message: format!("Ошибка: {}", error),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ServiceResponse::Failure { .. })
    }
}

/// JavaScript-style truthiness, which is what the backend's producers assume.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field_is_truthy(payload: &Value, key: &str) -> bool {
    payload.get(key).map(truthy).unwrap_or(false)
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn item_id_field(payload: &Value, key: &str) -> Option<ItemId> {
    payload
        .get(key)
        .filter(|v| truthy(v))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
