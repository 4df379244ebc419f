use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical textual form of a due date.
pub const DATE_FMT: &str = "%Y-%m-%d";

const CREATED_AT_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub due: Option<String>, // "YYYY-MM-DD" or None
    #[serde(default, deserialize_with = "null_as_default")]
    pub done: bool,
    #[serde(default = "now_timestamp", deserialize_with = "timestamp_or_now")]
    pub created_at: String,
}

impl Task {
    /// Builds a fresh, not-yet-done task stamped with the current UTC time.
    pub fn new(id: u32, title: String, description: String, due: Option<String>) -> Self {
        Self {
            id,
            title,
            description,
            due,
            done: false,
            created_at: now_timestamp(),
        }
    }

    pub fn toggle(&mut self) {
        self.done = !self.done;
    }

    /// The parsed due date, or `None` when there is no deadline or the stored text is malformed.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due.as_deref().and_then(parse_due_date)
    }

    pub fn due_label(&self) -> &str {
        self.due.as_deref().unwrap_or("-")
    }

    pub fn done_glyph(&self) -> &'static str {
        if self.done {
            "✅"
        } else {
            "❌"
        }
    }
}

/// Parses `YYYY-MM-DD`. Empty or malformed text yields `None`.
pub fn parse_due_date(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FMT).ok()
}

pub fn now_timestamp() -> String {
    Utc::now().format(CREATED_AT_FMT).to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn timestamp_or_now<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let stamp = Option::<String>::deserialize(deserializer)?;
    Ok(stamp.filter(|s| !s.is_empty()).unwrap_or_else(now_timestamp))
}
