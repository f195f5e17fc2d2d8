//! Robtex passive-DNS provider (free API, no credentials)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use crate::models::ip_utils::timestamp_from_epoch;
use crate::models::{PassiveDnsRecord, Source};
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const ROBTEX_API_URL: &str = "https://freeapi.robtex.com";

/// One observed resolution: `o` is the domain, `t` the observation time
/// in unix epoch seconds.
#[derive(Debug, Deserialize)]
struct RobtexEntry {
    o: String,
    t: i64,
}

/// The four history buckets: passive, passive-reverse, active,
/// active-reverse. Each entry is a single observation, so first and last
/// seen collapse to the same timestamp.
#[derive(Debug, Deserialize)]
struct RobtexResponse {
    #[serde(default)]
    pas: Vec<RobtexEntry>,
    #[serde(default)]
    pash: Vec<RobtexEntry>,
    #[serde(default)]
    act: Vec<RobtexEntry>,
    #[serde(default)]
    acth: Vec<RobtexEntry>,
}

/// Robtex provider
pub struct RobtexProvider {
    client: Client,
    base_url: String,
}

impl RobtexProvider {
    pub fn new() -> Self {
        Self::with_base_url(ROBTEX_API_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }
}

impl Default for RobtexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelProvider for RobtexProvider {
    fn name(&self) -> &'static str {
        "robtex"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let url = format!("{}/ipquery/{}", self.base_url, ip);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let data: RobtexResponse = response.json().await?;

        let mut report = ProviderReport::default();
        let buckets = [data.pas, data.pash, data.act, data.acth];
        for entry in buckets.into_iter().flatten() {
            let Some(seen) = timestamp_from_epoch(entry.t) else {
                continue;
            };
            report.passive_dns.push(PassiveDnsRecord {
                domain: entry.o,
                first_seen: seen,
                last_seen: seen,
                source: Source::Robtex,
            });
        }

        Ok(report)
    }
}
