//! Provider adapters and the aggregation engine

pub mod greynoise;
pub mod otx;
pub mod passivetotal;
pub mod robtex;
pub mod threatgrid;
pub mod virustotal;

use async_trait::async_trait;
use futures::future::join_all;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{IntelReport, NoiseRecord, OsintRef, PassiveDnsRecord, Pulse, SampleRecord};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider-side failure, contained at the adapter boundary
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Response(String),
}

/// Canonical records contributed by a single provider call.
///
/// Each adapter fills only the slots its source actually covers.
#[derive(Debug, Default)]
pub struct ProviderReport {
    pub passive_dns: Vec<PassiveDnsRecord>,
    pub malware: Vec<SampleRecord>,
    pub files: Vec<SampleRecord>,
    pub pulses: Vec<Pulse>,
    pub osint: Vec<OsintRef>,
    pub noise: Vec<NoiseRecord>,
    pub urls: Vec<String>,
}

/// Trait for intelligence providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntelProvider: Send + Sync {
    /// Provider name, also the tag used to gate report sections
    fn name(&self) -> &'static str;

    /// Uniform capability check: credentials are present and the configured
    /// mode allows IP enrichment
    fn is_configured(&self) -> bool;

    /// Fetch everything this provider knows about the address
    async fn fetch(&self, ip: IpAddr) -> Result<ProviderReport, ProviderError>;
}

/// Runs every configured adapter concurrently and merges their records.
///
/// No adapter depends on another's output, so one pass costs roughly the
/// slowest single adapter rather than the sum of all of them.
pub struct Aggregator {
    providers: Vec<Arc<dyn IntelProvider>>,
    provider_timeout: Duration,
    total_timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn IntelProvider>>) -> Self {
        Self {
            providers,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, provider_timeout: Duration, total_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self.total_timeout = total_timeout;
        self
    }

    /// Query all configured providers for an address.
    ///
    /// Failures and timeouts are logged and contribute nothing; the report
    /// always carries whatever the healthy providers returned.
    pub async fn aggregate(&self, ip: IpAddr) -> IntelReport {
        let mut report = IntelReport::new(ip);

        let enabled: Vec<Arc<dyn IntelProvider>> = self
            .providers
            .iter()
            .filter(|provider| {
                let configured = provider.is_configured();
                if !configured {
                    tracing::debug!(provider = provider.name(), "not configured, skipping");
                }
                configured
            })
            .cloned()
            .collect();

        report.queried = enabled.iter().map(|provider| provider.name()).collect();

        let per_provider = self.provider_timeout;
        let tasks = enabled.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                tracing::info!(provider = provider.name(), %ip, "querying provider");
                match tokio::time::timeout(per_provider, provider.fetch(ip)).await {
                    Ok(Ok(result)) => Some(result),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            provider = provider.name(),
                            error = %e,
                            "provider query failed"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            provider = provider.name(),
                            timeout = ?per_provider,
                            "provider query timed out"
                        );
                        None
                    }
                }
            }
        });

        // Each task bounds its own fetch; the outer timeout bounds the pass.
        let results = match tokio::time::timeout(self.total_timeout, join_all(tasks)).await {
            Ok(results) => results,
            Err(_) => {
                tracing::warn!(timeout = ?self.total_timeout, "aggregation timed out");
                return report;
            }
        };

        for result in results.into_iter().flatten() {
            report.passive_dns.extend(result.passive_dns);
            report.malware.extend(result.malware);
            report.files.extend(result.files);
            report.pulses.extend(result.pulses);
            report.osint.extend(result.osint);
            report.noise.extend(result.noise);
            report.urls.extend(result.urls);
        }

        report
    }
}
