//! AlienVault OTX provider: threat pulses, nested passive DNS, observed URLs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

use crate::models::ip_utils::parse_timestamp;
use crate::models::{PassiveDnsRecord, Pulse, Source};
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const OTX_API_URL: &str = "https://otx.alienvault.com/api/v1";
const OTX_PULSE_URL: &str = "https://otx.alienvault.com/pulse/";

#[derive(Debug, Deserialize)]
struct OtxGeneral {
    pulse_info: Option<OtxPulseInfo>,
}

#[derive(Debug, Deserialize)]
struct OtxPulseInfo {
    #[serde(default)]
    pulses: Vec<OtxPulse>,
}

#[derive(Debug, Deserialize)]
struct OtxPulse {
    id: String,
    name: String,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OtxPassiveDnsSection {
    #[serde(default)]
    passive_dns: Vec<OtxPassiveDns>,
}

#[derive(Debug, Deserialize)]
struct OtxPassiveDns {
    hostname: String,
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct OtxUrlList {
    #[serde(default)]
    url_list: Vec<OtxUrlEntry>,
}

#[derive(Debug, Deserialize)]
struct OtxUrlEntry {
    url: String,
}

/// AlienVault OTX provider
pub struct OtxProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OtxProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, OTX_API_URL.to_string())
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

    async fn get_section<T: DeserializeOwned>(
        &self,
        kind: &str,
        ip: IpAddr,
        section: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/indicators/{}/{}/{}", self.base_url, kind, ip, section);
        let response = self
            .client
            .get(&url)
            .header("X-OTX-API-KEY", self.api_key.as_deref().unwrap_or_default())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl IntelProvider for OtxProvider {
    fn name(&self) -> &'static str {
        "otx"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let kind = if ip.is_ipv4() { "IPv4" } else { "IPv6" };

        let general: OtxGeneral = self.get_section(kind, ip, "general").await?;
        let dns: OtxPassiveDnsSection = self.get_section(kind, ip, "passive_dns").await?;
        let urls: OtxUrlList = self.get_section(kind, ip, "url_list").await?;

        let mut report = ProviderReport::default();

        for pulse in general.pulse_info.map(|info| info.pulses).unwrap_or_default() {
            let Some(created) = pulse.created.as_deref().and_then(parse_timestamp) else {
                tracing::debug!(pulse = %pulse.name, "pulse has no usable creation date");
                continue;
            };
            report.pulses.push(Pulse {
                name: pulse.name,
                created: created.date(),
                url: format!("{OTX_PULSE_URL}{}", pulse.id),
            });
        }

        for entry in dns.passive_dns {
            let (Some(first), Some(last)) =
                (parse_timestamp(&entry.first), parse_timestamp(&entry.last))
            else {
                tracing::debug!(domain = %entry.hostname, "resolution has unusable dates");
                continue;
            };
            report.passive_dns.push(PassiveDnsRecord {
                domain: entry.hostname,
                first_seen: first,
                last_seen: last,
                source: Source::Otx,
            });
        }

        report.urls = urls.url_list.into_iter().map(|entry| entry.url).collect();

        Ok(report)
    }
}
