//! GreyNoise provider: background-noise classifications (known scanners, bots)
//!
//! The community endpoint needs no credentials. Rate limits and "no data"
//! responses are normal operation, so they yield an empty record set instead
//! of failing the aggregation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use crate::models::NoiseRecord;
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const GREYNOISE_API_URL: &str = "https://api.greynoise.io/v1";

#[derive(Debug, Deserialize)]
struct GnResponse {
    #[serde(default)]
    records: Vec<GnRecord>,
}

#[derive(Debug, Deserialize)]
struct GnRecord {
    name: String,
    #[serde(default)]
    first_seen: String,
    #[serde(default)]
    last_updated: String,
}

/// GreyNoise provider
pub struct GreyNoiseProvider {
    client: Client,
    base_url: String,
}

impl GreyNoiseProvider {
    pub fn new() -> Self {
        Self::with_base_url(GREYNOISE_API_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }
}

impl Default for GreyNoiseProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelProvider for GreyNoiseProvider {
    fn name(&self) -> &'static str {
        "greynoise"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let response = self
            .client
            .post(format!("{}/query/ip", self.base_url))
            .form(&[("ip", ip.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(
                status = %response.status(),
                "GreyNoise returned no usable data"
            );
            return Ok(ProviderReport::default());
        }

        let data: GnResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "GreyNoise response was not parseable");
                return Ok(ProviderReport::default());
            }
        };

        let noise = data
            .records
            .into_iter()
            .map(|record| NoiseRecord {
                name: record.name,
                first_seen: record.first_seen,
                last_updated: record.last_updated,
            })
            .collect();

        Ok(ProviderReport {
            noise,
            ..Default::default()
        })
    }
}
