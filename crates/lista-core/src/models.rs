use chrono::Utc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::CoreError;

/// Longest title accepted, counted in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// The closed set of task categories.
///
/// Serialized with the literals already present in stored data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "pessoal")]
    Personal,
    #[serde(rename = "trabalho")]
    Work,
    #[serde(rename = "estudo")]
    Study,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Personal, Category::Work, Category::Study];

    /// The literal used in stored records.
    pub fn as_stored(&self) -> &'static str {
        match self {
            Category::Personal => "pessoal",
            Category::Work => "trabalho",
            Category::Study => "estudo",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Personal => write!(f, "personal"),
            Category::Work => write!(f, "work"),
            Category::Study => write!(f, "study"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid category: {0} (expected personal, work or study)")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" | "pessoal" => Ok(Category::Personal),
            "work" | "trabalho" => Ok(Category::Work),
            "study" | "estudo" => Ok(Category::Study),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

/// Which categories are visible in a task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => task.category == *category,
        }
    }

    /// Projects `tasks` through the filter, keeping relative order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t)).cloned().collect()
    }

    /// The literal persisted in the preference store.
    pub fn as_stored(&self) -> &'static str {
        match self {
            CategoryFilter::All => "todos",
            CategoryFilter::Only(category) => category.as_stored(),
        }
    }

    /// Parses a persisted literal. Only the stored forms are accepted.
    pub fn from_stored(s: &str) -> Option<Self> {
        match s {
            "todos" => Some(CategoryFilter::All),
            "pessoal" => Some(CategoryFilter::Only(Category::Personal)),
            "trabalho" => Some(CategoryFilter::Only(Category::Work)),
            "estudo" => Some(CategoryFilter::Only(Category::Study)),
            _ => None,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid filter: {0} (expected all, personal, work or study)")]
pub struct ParseCategoryFilterError(String);

impl FromStr for CategoryFilter {
    type Err = ParseCategoryFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "todos" => Ok(CategoryFilter::All),
            other => other
                .parse::<Category>()
                .map(CategoryFilter::Only)
                .map_err(|_| ParseCategoryFilterError(s.to_string())),
        }
    }
}

/// A single to-do item.
///
/// Field names on the wire follow the schema of existing stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Empty when the record was written without a title, e.g. by a partial
    /// update to a key that had already been removed.
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "concluida", default)]
    pub completed: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "criadaEm", default, deserialize_with = "deserialize_millis")]
    pub created_at: i64,
    #[serde(rename = "categoria", default, deserialize_with = "deserialize_category")]
    pub category: Category,
}

impl Task {
    /// Builds a fresh, not yet completed task stamped with the current time.
    pub fn new(id: String, data: NewTaskData) -> Result<Self, CoreError> {
        let title = validate_title(&data.title)?;
        Ok(Self {
            id,
            title,
            completed: false,
            created_at: now_millis(),
            category: data.category,
        })
    }

    /// Decodes one child of a remote snapshot; the key becomes the id.
    pub fn from_entry(key: &str, value: &Value) -> Result<Self, CoreError> {
        let Value::Object(fields) = value else {
            return Err(serde_json::Error::custom(format!("record '{}' is not an object", key)).into());
        };
        let mut fields = fields.clone();
        fields.insert("id".to_string(), Value::String(key.to_string()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// The record as stored under its key in the remote tree (no `id` field).
    pub fn to_record(&self) -> Result<Value, CoreError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            fields.remove("id");
        }
        Ok(value)
    }

    /// Trailing characters of the id, enough to pick a task by hand.
    pub fn short_id(&self) -> &str {
        let start = self
            .id
            .char_indices()
            .rev()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.id[start..]
    }
}

/// Tasks decoded from one remote snapshot.
#[derive(Debug, Default, PartialEq)]
pub struct DecodedSnapshot {
    /// Every record that decoded, in the snapshot's order.
    pub tasks: Vec<Task>,
    /// Keys of records that could not be decoded.
    pub rejected: Vec<String>,
}

/// Converts a remote snapshot into tasks, in the snapshot's order.
///
/// An absent snapshot is an empty list. Each record is decoded on its own,
/// so one bad record never hides the others.
pub fn tasks_from_snapshot(snapshot: Option<&Map<String, Value>>) -> DecodedSnapshot {
    let mut decoded = DecodedSnapshot::default();
    for (key, value) in snapshot.into_iter().flatten() {
        match Task::from_entry(key, value) {
            Ok(task) => decoded.tasks.push(task),
            Err(e) => {
                tracing::warn!(%key, error = %e, "skipping malformed task record");
                decoded.rejected.push(key.clone());
            }
        }
    }
    decoded
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub category: Category,
}

impl NewTaskData {
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            category,
        }
    }
}

/// Partial update; only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateTaskData {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "concluida", skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl UpdateTaskData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.category.is_none()
    }

    /// Validates the update and returns it as wire fields.
    pub fn into_fields(mut self) -> Result<Map<String, Value>, CoreError> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        match serde_json::to_value(&self)? {
            Value::Object(fields) => Ok(fields),
            _ => Ok(Map::new()),
        }
    }

    /// Applies the update to an in-memory task.
    pub fn apply_to(&self, task: &mut Task) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            task.title = validate_title(title)?;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        Ok(())
    }
}

/// Returns the trimmed title, or an error if it is blank or too long.
pub fn validate_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("Task title cannot be empty.".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::InvalidInput(format!(
            "Task title cannot be longer than {} characters.",
            MAX_TITLE_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamps arrive as integers, floats or numeric strings depending on
/// which client wrote them.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Int(i64),
        Float(f64),
        Text(String),
        Null(()),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Int(ms) => Ok(ms),
        Millis::Float(ms) => Ok(ms as i64),
        Millis::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(|ms| ms as i64)
            .map_err(|_| D::Error::custom(format!("invalid timestamp '{}'", text))),
        Millis::Null(()) => Ok(0),
    }
}

/// Legacy records may lack a category or carry an empty one.
fn deserialize_category<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.parse::<Category>().ok())
        .unwrap_or_default())
}
