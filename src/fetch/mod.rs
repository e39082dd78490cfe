//! HTTP retrieval of remote dataset files.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::debug;

/// Downloads `url` through `client` and returns the response body.
///
/// # Errors
///
/// Returns an error if the URL does not parse, the request fails, or the
/// server answers with a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid dataset URL '{url}'"))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    let body = resp.bytes().await?;
    debug!(url, bytes = body.len(), "Fetched remote dataset");
    Ok(body)
}
