//! Core data models for IP enrichment

use chrono::{NaiveDate, NaiveDateTime};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub mod ip_utils;

/// External intelligence sources contributing records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Otx,
    Robtex,
    PassiveTotal,
    VirusTotal,
    ThreatGrid,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Otx => write!(f, "OTX"),
            Source::Robtex => write!(f, "Robtex"),
            Source::PassiveTotal => write!(f, "PT"),
            Source::VirusTotal => write!(f, "VT"),
            Source::ThreatGrid => write!(f, "TG"),
        }
    }
}

/// A historical domain-to-IP resolution observed by a provider.
///
/// The first/last seen pair is provider-supplied; providers that report single
/// observations use the same timestamp for both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveDnsRecord {
    pub domain: String,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub source: Source,
}

/// A malware or file sample a provider associates with the IP.
///
/// `source_detail` carries a sub-source within the provider (PassiveTotal
/// annotates which of its feeds contributed a sample).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub hash: String,
    pub date: NaiveDateTime,
    pub source: Source,
    pub source_detail: Option<String>,
}

impl SampleRecord {
    /// Report tag for this record, e.g. `VT` or `PT (riskiq)`.
    pub fn source_tag(&self) -> String {
        match &self.source_detail {
            Some(detail) => format!("{} ({})", self.source, detail),
            None => self.source.to_string(),
        }
    }
}

/// A shared threat-intelligence write-up referencing the IP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    pub name: String,
    pub created: NaiveDate,
    pub url: String,
}

/// An OSINT reference write-up (name plus source URL)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsintRef {
    pub name: String,
    pub url: String,
}

/// A behavioral classification of the IP, e.g. a known internet-wide scanner.
///
/// The provider reports bare date strings; they are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseRecord {
    pub name: String,
    pub first_seen: String,
    pub last_updated: String,
}

/// City-level geolocation from the local city database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CityInfo {
    pub city: Option<String>,
    pub country: Option<String>,
}

/// ASN assignment from the local ASN database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsnInfo {
    pub number: u32,
    pub organization: Option<String>,
}

/// Announcing ASN and covering CIDR block from the local route table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub asn: u32,
    pub name: Option<String>,
    pub cidr: IpNetwork,
}

/// Combined result of the local lookups.
///
/// Each field is independently `None` when the corresponding store has no
/// entry for the address; sentinels like "Unknown" exist only at render time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalIpInfo {
    pub geo: Option<CityInfo>,
    pub asn: Option<AsnInfo>,
    pub route: Option<RouteInfo>,
}

/// Merged output of one aggregation pass over the configured providers.
///
/// Records live only for the duration of one command; nothing is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct IntelReport {
    pub ip: IpAddr,
    pub passive_dns: Vec<PassiveDnsRecord>,
    pub malware: Vec<SampleRecord>,
    pub files: Vec<SampleRecord>,
    pub pulses: Vec<Pulse>,
    pub osint: Vec<OsintRef>,
    pub noise: Vec<NoiseRecord>,
    /// URLs observed on the IP, captured for structured output but not part
    /// of the rendered report.
    pub urls: Vec<String>,
    /// Names of the providers that were configured and queried, used to gate
    /// the per-provider "not found" report sections.
    pub queried: Vec<&'static str>,
}

impl IntelReport {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            passive_dns: vec![],
            malware: vec![],
            files: vec![],
            pulses: vec![],
            osint: vec![],
            noise: vec![],
            urls: vec![],
            queried: vec![],
        }
    }

    pub fn was_queried(&self, provider: &str) -> bool {
        self.queried.iter().any(|name| *name == provider)
    }
}
