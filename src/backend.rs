//! HTTP client for the AI backend: dialogue generation, semantic search and
//! character notes.
//!
//! Generation and search never fail from the caller's point of view: they
//! degrade to a placeholder dialogue and "no structured results". Note calls
//! return errors so the caller can log them.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::models::{Character, DialogueResult, Interpretation, Note, NoteId, SearchResult};
use crate::notes::normalize_notes;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{operation} returned status {status}")]
    Status {
        operation: &'static str,
        status: StatusCode,
    },
}

/// What the search endpoint answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    Structured(SearchResult),
    /// Bare list, error status or unreachable backend.
    Unstructured,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    character: &'a Character,
}

#[derive(Serialize)]
struct SaveNoteRequest<'a> {
    character_id: &'a str,
    note: &'a str,
}

#[derive(Serialize)]
struct DeleteNoteRequest<'a> {
    note_id: &'a NoteId,
}

pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ask the backend for a dialogue about `character`.
    /// Any failure yields [`DialogueResult::unreachable`].
    pub async fn generate_dialogue(&self, character: &Character) -> DialogueResult {
        debug!("Generating dialogue for character {} ({})", character.id, character.name);

        let resp = match self
            .client
            .post(self.url("/api/dialogue/generate"))
            .json(&GenerateRequest { character })
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_connect() {
                    warn!("Cannot connect to backend at {}", self.base_url);
                } else if e.is_timeout() {
                    warn!("Dialogue generation timed out");
                } else {
                    warn!("Dialogue generation failed: {e}");
                }
                return DialogueResult::unreachable();
            }
        };

        if !resp.status().is_success() {
            warn!("Dialogue generation returned status {}", resp.status());
            return DialogueResult::unreachable();
        }

        match resp.json::<DialogueResult>().await {
            Ok(mut result) => {
                result.success = true;
                result
            }
            Err(e) => {
                warn!("Failed to parse dialogue response: {e}");
                DialogueResult::unreachable()
            }
        }
    }

    pub async fn semantic_search(&self, query: &str) -> SearchResponse {
        debug!("Semantic search: {query:?}");

        let resp = match self
            .client
            .post(self.url("/api/search"))
            .json(&json!({ "query": query }))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Semantic search failed: {e}");
                return SearchResponse::Unstructured;
            }
        };

        if !resp.status().is_success() {
            warn!("Semantic search returned status {}", resp.status());
            return SearchResponse::Unstructured;
        }

        match resp.json::<Value>().await {
            Ok(data) => parse_search_response(&data),
            Err(e) => {
                warn!("Failed to parse search response: {e}");
                SearchResponse::Unstructured
            }
        }
    }

    pub async fn get_notes(&self, character_id: &str) -> Result<Vec<Note>, BackendError> {
        let resp = self
            .client
            .get(self.url("/api/note"))
            .query(&[("character_id", character_id)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::Status {
                operation: "fetch notes",
                status: resp.status(),
            });
        }

        let data: Value = resp.json().await?;
        Ok(normalize_notes(&data, Utc::now()))
    }

    /// Store a note; returns the backend's record for it.
    pub async fn save_note(&self, character_id: &str, note: &str) -> Result<Value, BackendError> {
        let resp = self
            .client
            .post(self.url("/api/note/save"))
            .json(&SaveNoteRequest { character_id, note })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::Status {
                operation: "save note",
                status: resp.status(),
            });
        }

        Ok(resp.json().await?)
    }

    pub async fn delete_note(&self, note_id: &NoteId) -> Result<Value, BackendError> {
        let resp = self
            .client
            .post(self.url("/api/note/delete"))
            .json(&DeleteNoteRequest { note_id })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::Status {
                operation: "delete note",
                status: resp.status(),
            });
        }

        Ok(resp.json().await?)
    }
}

/// Interpret a search response body. Bare lists are an older backend shape
/// and carry no interpretation or count, so they are not guessed into one.
pub fn parse_search_response(data: &Value) -> SearchResponse {
    let Some(obj) = data.as_object() else {
        return SearchResponse::Unstructured;
    };

    let interpretation = obj
        .get("interpretation")
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<Interpretation>(v.clone()).ok());

    let raw_results = obj.get("results").and_then(Value::as_array);
    let results: Vec<Character> = raw_results
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let count = match obj.get("count").and_then(Value::as_u64) {
        Some(n) => n as usize,
        None => raw_results.map_or(0, Vec::len),
    };

    SearchResponse::Structured(SearchResult {
        interpretation,
        count,
        results,
    })
}
