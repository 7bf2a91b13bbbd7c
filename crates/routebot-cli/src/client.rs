//! HTTP client for the routebot server API.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use routebot_core::RouteRecord;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ReplaceResponse {
    stored: usize,
}

/// Blocking client for the route store endpoints.
pub struct RouteServerClient {
    client: Client,
    base_url: String,
}

impl RouteServerClient {
    /// * `base_url` - Server URL (e.g., "http://localhost:3000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create or replace one stored route. Returns the id the server kept.
    pub fn upsert_route(&self, route: &RouteRecord) -> Result<String> {
        let url = format!("{}/v1/routes", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(route)
            .send()
            .with_context(|| format!("POST {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("server rejected route '{}': HTTP {} {}", route.id, status, body);
        }
        let saved: RouteRecord = response.json().context("decoding saved route")?;
        Ok(saved.id)
    }

    /// Replace every stored route on the server.
    pub fn replace_routes(&self, routes: &[RouteRecord]) -> Result<usize> {
        let url = format!("{}/v1/routes", self.base_url);
        let response = self
            .client
            .put(&url)
            .json(&json!({ "routes": routes }))
            .send()
            .with_context(|| format!("PUT {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("server rejected route import: HTTP {} {}", status, body);
        }
        let replaced: ReplaceResponse = response.json().context("decoding import response")?;
        Ok(replaced.stored)
    }
}
