//! Typed event payloads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Event names routed to reminder handling.
pub const REMINDER_EVENTS: [&str; 2] = ["reminder", "schedule-reminder"];

/// Event name of the diagnostic channel.
pub const TEST_EVENT: &str = "test";

/// The kind of a named stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Reminder,
    Test,
}

impl EventKind {
    /// Maps an SSE event name to a kind; unknown names map to `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        if REMINDER_EVENTS.contains(&name) {
            Some(Self::Reminder)
        } else if name == TEST_EVENT {
            Some(Self::Test)
        } else {
            None
        }
    }
}

/// A schedule reminder pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEvent {
    /// Business identifier of the schedule; used for deduplication.
    #[serde(default, deserialize_with = "lenient_id")]
    pub schedule_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub schedule_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_all_day: Option<bool>,
    #[serde(default)]
    pub trigger_at_epoch_ms: Option<i64>,
}

impl ReminderEvent {
    /// Returns the schedule identifier if it is present and non-blank.
    pub fn identifier(&self) -> Option<&str> {
        self.schedule_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Returns the text to show for this reminder: the server message if
    /// any, otherwise the title.
    pub fn display_text(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.title)
    }

    /// Returns a short "date start-end" label, or `None` when no date is set.
    pub fn when(&self) -> Option<String> {
        let date = self.schedule_date.as_deref()?;
        if self.is_all_day.unwrap_or(false) {
            return Some(format!("{} (all day)", date));
        }
        Some(match (self.start_time.as_deref(), self.end_time.as_deref()) {
            (Some(start), Some(end)) => format!("{} {}-{}", date, start, end),
            (Some(start), None) => format!("{} {}", date, start),
            _ => date.to_string(),
        })
    }
}

// Some backends send numeric identifiers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A diagnostic event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEvent {
    #[serde(default)]
    pub message: String,
}
