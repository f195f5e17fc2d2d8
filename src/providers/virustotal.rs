//! VirusTotal provider: historical resolutions plus downloaded/referrer samples
//!
//! The IP report endpoint is only served to private-API keys; a key in public
//! mode cannot run this operation, so the provider reports itself
//! unconfigured rather than failing at query time.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::{VirusTotalCredentials, VtApiMode};
use crate::models::ip_utils::parse_timestamp;
use crate::models::{PassiveDnsRecord, SampleRecord, Source};
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const VT_API_URL: &str = "https://www.virustotal.com/vtapi/v2";

#[derive(Debug, Deserialize)]
struct VtIpReport {
    #[serde(default)]
    resolutions: Vec<VtResolution>,
    #[serde(default)]
    undetected_downloaded_samples: Vec<VtSample>,
    #[serde(default)]
    undetected_referrer_samples: Vec<VtSample>,
    #[serde(default)]
    detected_downloaded_samples: Vec<VtSample>,
    #[serde(default)]
    detected_referrer_samples: Vec<VtSample>,
}

#[derive(Debug, Deserialize)]
struct VtResolution {
    hostname: String,
    last_resolved: Option<String>,
}

/// Referrer samples regularly omit the date field; such entries are skipped.
#[derive(Debug, Deserialize)]
struct VtSample {
    sha256: String,
    date: Option<String>,
}

/// VirusTotal provider
pub struct VirusTotalProvider {
    client: Client,
    credentials: Option<VirusTotalCredentials>,
    base_url: String,
}

impl VirusTotalProvider {
    pub fn new(credentials: Option<VirusTotalCredentials>) -> Self {
        Self::with_base_url(credentials, VT_API_URL.to_string())
    }

    pub fn with_base_url(credentials: Option<VirusTotalCredentials>, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            credentials,
            base_url,
        }
    }

    fn collect_samples(samples: Vec<VtSample>, into: &mut Vec<SampleRecord>) {
        for sample in samples {
            let Some(date) = sample.date.as_deref().and_then(parse_timestamp) else {
                continue;
            };
            into.push(SampleRecord {
                hash: sample.sha256,
                date,
                source: Source::VirusTotal,
                source_detail: None,
            });
        }
    }
}

#[async_trait]
impl IntelProvider for VirusTotalProvider {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    fn is_configured(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|c| c.mode == VtApiMode::Private && !c.api_key.is_empty())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let api_key = self
            .credentials
            .as_ref()
            .map(|c| c.api_key.as_str())
            .unwrap_or_default();

        let response = self
            .client
            .get(format!("{}/ip-address/report", self.base_url))
            .query(&[("apikey", api_key), ("ip", &ip.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let data: VtIpReport = response.json().await?;

        let mut report = ProviderReport::default();

        for resolution in data.resolutions {
            let Some(seen) = resolution.last_resolved.as_deref().and_then(parse_timestamp)
            else {
                continue;
            };
            report.passive_dns.push(PassiveDnsRecord {
                domain: resolution.hostname,
                first_seen: seen,
                last_seen: seen,
                source: Source::VirusTotal,
            });
        }

        Self::collect_samples(data.undetected_downloaded_samples, &mut report.files);
        Self::collect_samples(data.undetected_referrer_samples, &mut report.files);
        Self::collect_samples(data.detected_downloaded_samples, &mut report.malware);
        Self::collect_samples(data.detected_referrer_samples, &mut report.malware);

        Ok(report)
    }
}
