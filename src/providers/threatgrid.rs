//! Threat Grid provider: malware samples observed contacting the IP

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use crate::models::ip_utils::parse_timestamp;
use crate::models::{SampleRecord, Source};
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const TG_API_URL: &str = "https://panacea.threatgrid.com/api/v2";

#[derive(Debug, Deserialize)]
struct TgSearchResponse {
    #[serde(default)]
    items: Vec<TgItem>,
}

#[derive(Debug, Deserialize)]
struct TgItem {
    sample_sha256: String,
    ts: String,
}

/// Threat Grid provider
pub struct ThreatGridProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl ThreatGridProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, TG_API_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl IntelProvider for ThreatGridProvider {
    fn name(&self) -> &'static str {
        "threatgrid"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let response = self
            .client
            .get(format!("{}/search/submissions", self.base_url))
            .query(&[
                ("q", ip.to_string().as_str()),
                ("type", "ip"),
                ("api_key", self.api_key.as_deref().unwrap_or_default()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let data: TgSearchResponse = response.json().await?;

        let mut report = ProviderReport::default();
        // A sample resubmitted under the same hash counts once per query
        let mut seen: HashSet<String> = HashSet::new();
        for item in data.items {
            if !seen.insert(item.sample_sha256.clone()) {
                continue;
            }
            // ts carries an offset; comparisons across providers need it gone
            let Some(date) = parse_timestamp(&item.ts) else {
                tracing::debug!(hash = %item.sample_sha256, "submission has no usable timestamp");
                continue;
            };
            report.malware.push(SampleRecord {
                hash: item.sample_sha256,
                date,
                source: Source::ThreatGrid,
                source_detail: None,
            });
        }

        Ok(report)
    }
}
