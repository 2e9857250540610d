//! Domain types shared by the catalog, backend and explorer state.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// The catalog sends ids as strings, the backend's search results sometimes as numbers.
fn id_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("invalid id: {other}"))),
    }
}

// Backends emit the rubric score as an integer or a float; either lands on 1..=5.
fn score_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let score = f64::deserialize(deserializer)?;
    if !score.is_finite() {
        return Err(D::Error::custom(format!("invalid score: {score}")));
    }
    Ok(score.round().clamp(1.0, 5.0) as u8)
}

/// Life status of a character as reported by the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Alive,
    Dead,
    #[default]
    Unknown,
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Alive" => Self::Alive,
            "Dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

impl From<Status> for String {
    // The catalog spells the unknown status in lowercase.
    fn from(status: Status) -> Self {
        match status {
            Status::Alive => "Alive".into(),
            Status::Dead => "Dead".into(),
            Status::Unknown => "unknown".into(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alive => write!(f, "Alive"),
            Self::Dead => write!(f, "Dead"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default, deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub image: String,
    /// Only present on semantic search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub residents: Vec<Character>,
}

/// One page of the location catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub locations: Vec<Location>,
    pub total_pages: u32,
    pub has_next: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heuristics {
    #[serde(rename = "mentionsName", default)]
    pub mentions_name: bool,
    #[serde(rename = "statusCheck", default)]
    pub status_check: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    #[serde(deserialize_with = "score_from_number")]
    pub score: u8,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub heuristics: Heuristics,
    pub rubric: Rubric,
}

/// A generated dialogue plus its quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResult {
    #[serde(default)]
    pub dialogue: String,
    pub metrics: Metrics,
    /// True only when the backend answered with a success status.
    #[serde(default)]
    pub success: bool,
}

impl DialogueResult {
    pub const UNREACHABLE_LINE: &'static str =
        "Rick: (Python Error) I'm not talking to you right now.";

    /// Placeholder shown when the backend could not produce a dialogue.
    pub fn unreachable() -> Self {
        Self {
            dialogue: Self::UNREACHABLE_LINE.into(),
            metrics: Metrics {
                heuristics: Heuristics::default(),
                rubric: Rubric {
                    score: 1,
                    reason: "Server Unreachable".into(),
                },
            },
            success: false,
        }
    }
}

/// Backend-assigned note identifier, echoed back in its original JSON kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<NoteId>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Filters the backend extracted from a free-text query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub episode_code: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub interpretation: Option<Interpretation>,
    pub count: usize,
    pub results: Vec<Character>,
}
