//! Shared plumbing for the HTTP-backed sources.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Appends path segments to `base`, tolerating a trailing slash on the base.
/// An empty final segment yields a trailing slash.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid base URL: {}", base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Base URL cannot take path segments: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// GET a JSON document. Error messages name the host only, since some
/// services carry credentials in the path or query.
pub async fn get_json(client: &Client, url: Url, query: &[(&str, String)]) -> Result<serde_json::Value> {
    let host = url.host_str().unwrap_or("unknown host").to_string();
    let response = client
        .get(url)
        .query(query)
        .header("Accept", "application/json")
        .send()
        .await
        .with_context(|| format!("Request to {} failed", host))?;

    if !response.status().is_success() {
        bail!("{} returned error: {}", host, response.status());
    }

    response
        .json::<serde_json::Value>()
        .await
        .with_context(|| format!("Failed to parse response from {} as JSON", host))
}
