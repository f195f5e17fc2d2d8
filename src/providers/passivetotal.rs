//! PassiveTotal provider: passive DNS history, OSINT references, malware samples

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::PassiveTotalCredentials;
use crate::models::ip_utils::parse_timestamp;
use crate::models::{OsintRef, PassiveDnsRecord, SampleRecord, Source};
use crate::providers::{IntelProvider, ProviderError, ProviderReport};

const PT_API_URL: &str = "https://api.passivetotal.org/v2";

#[derive(Debug, Deserialize)]
struct PtDnsResponse {
    #[serde(default)]
    results: Vec<PtResolution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtResolution {
    resolve: String,
    first_seen: String,
    last_seen: String,
}

#[derive(Debug, Deserialize)]
struct PtOsintResponse {
    #[serde(default)]
    results: Vec<PtOsintEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtOsintEntry {
    name: String,
    source_url: String,
}

#[derive(Debug, Deserialize)]
struct PtMalwareResponse {
    #[serde(default)]
    results: Vec<PtMalwareEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PtMalwareEntry {
    sample: String,
    collection_date: String,
    source: String,
}

/// PassiveTotal provider
pub struct PassiveTotalProvider {
    client: Client,
    credentials: Option<PassiveTotalCredentials>,
    base_url: String,
}

impl PassiveTotalProvider {
    pub fn new(credentials: Option<PassiveTotalCredentials>) -> Self {
        Self::with_base_url(credentials, PT_API_URL.to_string())
    }

    pub fn with_base_url(credentials: Option<PassiveTotalCredentials>, base_url: String) -> Self {
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

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, ip: IpAddr) -> Result<T, ProviderError> {
        let (username, api_key) = self
            .credentials
            .as_ref()
            .map(|c| (c.username.as_str(), c.api_key.as_str()))
            .unwrap_or_default();

        let response = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .basic_auth(username, Some(api_key))
            .query(&[("query", ip.to_string())])
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
impl IntelProvider for PassiveTotalProvider {
    fn name(&self) -> &'static str {
        "passivetotal"
    }

    fn is_configured(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|c| !c.username.is_empty() && !c.api_key.is_empty())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError> {
        let dns: PtDnsResponse = self.get("/dns/passive", ip).await?;
        let osint: PtOsintResponse = self.get("/enrichment/osint", ip).await?;
        let malware: PtMalwareResponse = self.get("/enrichment/malware", ip).await?;

        let mut report = ProviderReport::default();

        for resolution in dns.results {
            let (Some(first), Some(last)) = (
                parse_timestamp(&resolution.first_seen),
                parse_timestamp(&resolution.last_seen),
            ) else {
                tracing::debug!(domain = %resolution.resolve, "resolution has unusable dates");
                continue;
            };
            report.passive_dns.push(PassiveDnsRecord {
                domain: resolution.resolve,
                first_seen: first,
                last_seen: last,
                source: Source::PassiveTotal,
            });
        }

        report.osint = osint
            .results
            .into_iter()
            .map(|entry| OsintRef {
                name: entry.name,
                url: entry.source_url,
            })
            .collect();

        for entry in malware.results {
            let Some(date) = parse_timestamp(&entry.collection_date) else {
                tracing::debug!(hash = %entry.sample, "sample has no usable collection date");
                continue;
            };
            report.malware.push(SampleRecord {
                hash: entry.sample,
                date,
                source: Source::PassiveTotal,
                source_detail: Some(entry.source),
            });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Option<PassiveTotalCredentials> {
        Some(PassiveTotalCredentials {
            username: "analyst@example.org".to_string(),
            api_key: "secret".to_string(),
        })
    }

    #[tokio::test]
    async fn maps_all_three_endpoints() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns/passive"))
            .and(query_param("query", "1.2.3.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"resolve": "evil.example.org", "firstSeen": "2017-04-03 09:10:11", "lastSeen": "2019-01-02 10:00:00"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/enrichment/osint"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"name": "APT write-up", "sourceUrl": "https://blog.example.org/apt"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/enrichment/malware"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"sample": "ab".repeat(32), "collectionDate": "2018-06-01 00:00:00", "source": "riskiq"}
                ]
            })))
            .mount(&server)
            .await;

        let provider = PassiveTotalProvider::with_base_url(credentials(), server.uri());
        let report = provider.fetch("1.2.3.4".parse().unwrap()).await.unwrap();

        assert_eq!(report.passive_dns.len(), 1);
        assert_eq!(report.passive_dns[0].source, Source::PassiveTotal);
        assert!(report.passive_dns[0].first_seen < report.passive_dns[0].last_seen);

        assert_eq!(report.osint.len(), 1);
        assert_eq!(report.osint[0].url, "https://blog.example.org/apt");

        assert_eq!(report.malware.len(), 1);
        assert_eq!(report.malware[0].source_detail.as_deref(), Some("riskiq"));
        assert_eq!(report.malware[0].source_tag(), "PT (riskiq)");
    }

    #[test]
    fn requires_both_username_and_key() {
        assert!(!PassiveTotalProvider::new(None).is_configured());
        assert!(
            !PassiveTotalProvider::new(Some(PassiveTotalCredentials {
                username: "user".to_string(),
                api_key: String::new(),
            }))
            .is_configured()
        );
        assert!(PassiveTotalProvider::new(credentials()).is_configured());
    }
}
