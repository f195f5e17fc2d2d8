//! Runtime configuration
//!
//! One explicit struct assembled in `main` from flags and environment,
//! passed by value to the components that need it. Provider availability is
//! decided by each adapter's `is_configured`, never by ad-hoc checks here.

use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const CITY_DB_FILE: &str = "GeoLite2-City.mmdb";
pub const ASN_DB_FILE: &str = "GeoLite2-ASN.mmdb";
pub const ROUTE_TABLE_FILE: &str = "asncidr.dat";
pub const ASN_NAMES_FILE: &str = "asnnames.csv";

/// VirusTotal API tier. The IP report endpoint needs a private-tier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VtApiMode {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct PassiveTotalCredentials {
    pub username: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct VirusTotalCredentials {
    pub api_key: String,
    pub mode: VtApiMode,
}

/// Locations of the four local stores inside the data directory
#[derive(Debug, Clone)]
pub struct LocalStorePaths {
    pub city_db: PathBuf,
    pub asn_db: PathBuf,
    pub route_table: PathBuf,
    pub asn_names: PathBuf,
}

impl LocalStorePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            city_db: dir.join(CITY_DB_FILE),
            asn_db: dir.join(ASN_DB_FILE),
            route_table: dir.join(ROUTE_TABLE_FILE),
            asn_names: dir.join(ASN_NAMES_FILE),
        }
    }
}

/// Full runtime configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub otx_api_key: Option<String>,
    pub passivetotal: Option<PassiveTotalCredentials>,
    pub virustotal: Option<VirusTotalCredentials>,
    pub threatgrid_api_key: Option<String>,
}

impl Config {
    /// Resolved data directory: explicit setting or `~/.config/ipintel`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("ipintel")
        })
    }

    pub fn store_paths(&self) -> LocalStorePaths {
        LocalStorePaths::in_dir(&self.data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/var/lib/ipintel")),
            ..Default::default()
        };
        let paths = config.store_paths();
        assert_eq!(paths.city_db, PathBuf::from("/var/lib/ipintel/GeoLite2-City.mmdb"));
        assert_eq!(paths.asn_names, PathBuf::from("/var/lib/ipintel/asnnames.csv"));
    }
}
