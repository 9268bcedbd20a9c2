//! Chat request and stream event types

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Message returned when a request carries no question
pub const NO_QUESTION: &str = "Please provide a question.";

/// Question payload for one exchange
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgriRequest {
    /// The farmer's question (empty is rejected)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
    /// Where the farm is; falls back to the configured default location
    #[serde(default)]
    pub location: Option<String>,
    /// Crop the question is about
    #[serde(default)]
    pub crop: Option<String>,
}

impl AgriRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One event of a streamed exchange
///
/// Serializes to a single-key object: `{"token": "..."}`, `{"error": "..."}`
/// or `{"done": true}`. `Done` is always the last event of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Incremental reply content
    Token(String),
    /// Provider failure; the exchange still finishes with `Done`
    Error(String),
    /// Terminal event, sent once after the turn is persisted
    Done,
}

impl ChatEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Serialize for ChatEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Token(token) => map.serialize_entry("token", token)?,
            Self::Error(message) => map.serialize_entry("error", message)?,
            Self::Done => map.serialize_entry("done", &true)?,
        }
        map.end()
    }
}
