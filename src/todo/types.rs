//! Todo records and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::TodoError;

/// Priority assigned when a create request leaves it out.
pub const DEFAULT_PRIORITY: &str = "medium";

/// A single todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Unique, never reused.
    pub id: u64,
    /// Trimmed, never empty.
    pub name: String,
    /// Trimmed, may be empty.
    pub description: String,
    /// Free-form priority label.
    pub priority: String,
    /// Completion flag.
    pub done: bool,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// Case-insensitive substring match on name or description.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        // wall clock may step backwards
        self.updated_at = now.max(self.created_at);
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewTodo {
    /// Required, must contain a non-whitespace character.
    pub name: Option<String>,
    /// Defaults to empty.
    pub description: Option<String>,
    /// Defaults to `medium`.
    pub priority: Option<String>,
}

/// A validated, normalized create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub name: String,
    pub description: String,
    pub priority: String,
}

impl NewTodo {
    /// Trim fields, apply defaults, and reject a blank name.
    pub fn validate(self) -> Result<TodoDraft, TodoError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(TodoError::BlankName)?
            .to_string();

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let priority = self
            .priority
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

        Ok(TodoDraft {
            name,
            description,
            priority,
        })
    }
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TodoPatch {
    /// New name, trimmed; must not be blank.
    pub name: Option<String>,
    /// New completion flag.
    pub done: Option<bool>,
    /// New description. `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// New priority label.
    pub priority: Option<String>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl TodoPatch {
    /// Trim the name and reject it if it ends up blank.
    pub fn validate(mut self) -> Result<Self, TodoError> {
        if let Some(name) = self.name.take() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(TodoError::BlankName);
            }
            self.name = Some(trimmed.to_string());
        }
        Ok(self)
    }

    /// Apply the provided fields to `item` and refresh its timestamp.
    pub fn apply(&self, item: &mut TodoItem, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(done) = self.done {
            item.done = done;
        }
        if let Some(description) = &self.description {
            item.description = description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
        }
        if let Some(priority) = &self.priority {
            item.priority = priority.clone();
        }
        item.touch(now);
    }
}

/// Body of a toggle-all request.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct ToggleAll {
    /// Value written to every item's `done`.
    pub completed: bool,
}

/// Query string of the list route.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive filter on name and description.
    pub search: Option<String>,
}

/// Completion counters over the whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage of completed items, rounded to the nearest integer.
    pub completion_rate: u32,
}

impl TodoStats {
    /// Compute stats for a slice of items.
    pub fn from_items(items: &[TodoItem]) -> Self {
        let total = items.len();
        let completed = items.iter().filter(|t| t.done).count();
        let completion_rate = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        Self {
            total,
            completed,
            pending: total - completed,
            completion_rate,
        }
    }
}
