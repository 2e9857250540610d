//! GraphQL client for the public location/character catalog.
//!
//! Fetches one page of locations with their residents. Never retries: a
//! failed page stays failed until the user asks for a page again.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::models::{CatalogPage, Location};

pub const LOCATIONS_QUERY: &str = r#"query GetLocations($page: Int) {
  locations(page: $page) {
    info {
      pages
      next
    }
    results {
      id
      name
      type
      residents {
        id
        name
        status
        species
        image
      }
    }
  }
}"#;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog returned errors: {0}")]
    GraphQl(String),
    #[error("catalog response has no locations page")]
    UnexpectedShape,
}

impl CatalogError {
    /// Banner text shown in place of the catalog.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnexpectedShape => "API returned unexpected data.",
            _ => "Failed to contact the Multiverse.",
        }
    }
}

pub struct CatalogClient {
    url: String,
    client: Client,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    /// Fetch a 1-based page of locations.
    pub async fn fetch_locations(&self, page: u32) -> Result<CatalogPage, CatalogError> {
        debug!("Fetching catalog page {page} from {}", self.url);

        let body = json!({
            "query": LOCATIONS_QUERY,
            "variables": { "page": page },
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(CatalogError::Status(resp.status()));
        }

        let data: Value = resp.json().await?;
        parse_locations_response(&data)
    }
}

/// Extract a [`CatalogPage`] from a GraphQL response document.
pub fn parse_locations_response(data: &Value) -> Result<CatalogPage, CatalogError> {
    if let Some(errors) = data.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(CatalogError::GraphQl(messages.join("; ")));
        }
    }

    let locations = &data["data"]["locations"];
    let info = &locations["info"];
    let results = &locations["results"];
    if info.is_null() || results.is_null() {
        return Err(CatalogError::UnexpectedShape);
    }

    let locations: Vec<Location> =
        serde_json::from_value(results.clone()).map_err(|_| CatalogError::UnexpectedShape)?;

    let total_pages = match info["pages"].as_u64() {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    };
    let has_next = !info["next"].is_null();

    Ok(CatalogPage {
        locations,
        total_pages,
        has_next,
    })
}
