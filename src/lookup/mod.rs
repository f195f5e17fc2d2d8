//! Local geolocation and ASN lookups
//!
//! Resolves city, country, ASN, and covering CIDR block for an address from
//! four local stores: the GeoLite2 city and ASN databases, a prefix-to-ASN
//! route table, and a pipe-delimited ASN-name file. All stores are opened up
//! front so a missing installation fails before any lookup runs.

pub mod routes;

use maxminddb::{MaxMindDBError, Reader, geoip2};
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::LocalStorePaths;
use crate::models::{AsnInfo, CityInfo, LocalIpInfo, RouteInfo};
use routes::{AsnNameTable, RouteTable};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(
        "local database {name} is not installed (expected at {path:?}); \
         download the GeoIP data files into the data directory and retry"
    )]
    StoreMissing { name: &'static str, path: PathBuf },

    #[error("failed to read local database {name} at {path:?}: {source}")]
    StoreUnreadable {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Read-only handle over the four local stores
#[derive(Debug)]
pub struct LocalLookup {
    city: Reader<Vec<u8>>,
    asn: Reader<Vec<u8>>,
    routes: RouteTable,
    names: AsnNameTable,
}

impl LocalLookup {
    /// Open every store, failing fast on a missing or unreadable file
    pub fn open(paths: &LocalStorePaths) -> Result<Self, LookupError> {
        let city = open_mmdb("GeoLite2-City", &paths.city_db)?;
        let asn = open_mmdb("GeoLite2-ASN", &paths.asn_db)?;
        let routes = RouteTable::load(&paths.route_table)
            .map_err(|e| flat_file_error("asncidr", &paths.route_table, e))?;
        let names = AsnNameTable::load(&paths.asn_names)
            .map_err(|e| flat_file_error("asnnames", &paths.asn_names, e))?;

        Ok(Self {
            city,
            asn,
            routes,
            names,
        })
    }

    /// Resolve everything the local stores know about an address.
    ///
    /// Absent entries yield `None` fields; only store-level problems are
    /// surfaced, and those were caught at open time.
    pub fn lookup(&self, ip: IpAddr) -> LocalIpInfo {
        LocalIpInfo {
            geo: self.city_lookup(ip),
            asn: self.asn_lookup(ip),
            route: self.route_lookup(ip),
        }
    }

    fn city_lookup(&self, ip: IpAddr) -> Option<CityInfo> {
        match self.city.lookup::<geoip2::City>(ip) {
            Ok(res) => {
                let mut info = CityInfo::default();
                if let Some(city) = res.city {
                    info.city = city.names.and_then(|n| n.get("en").map(|s| s.to_string()));
                }
                if let Some(country) = res.country {
                    info.country = country
                        .names
                        .and_then(|n| n.get("en").map(|s| s.to_string()));
                }
                Some(info)
            }
            Err(MaxMindDBError::AddressNotFoundError(_)) => None,
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "city database lookup failed");
                None
            }
        }
    }

    fn asn_lookup(&self, ip: IpAddr) -> Option<AsnInfo> {
        match self.asn.lookup::<geoip2::Asn>(ip) {
            Ok(res) => res.autonomous_system_number.map(|number| AsnInfo {
                number,
                organization: res.autonomous_system_organization.map(|s| s.to_string()),
            }),
            Err(MaxMindDBError::AddressNotFoundError(_)) => None,
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "ASN database lookup failed");
                None
            }
        }
    }

    fn route_lookup(&self, ip: IpAddr) -> Option<RouteInfo> {
        let (asn, cidr) = self.routes.lookup(ip)?;
        Some(RouteInfo {
            asn,
            name: self.names.name_of(asn).map(|s| s.to_string()),
            cidr,
        })
    }
}

fn open_mmdb(name: &'static str, path: &Path) -> Result<Reader<Vec<u8>>, LookupError> {
    if !path.exists() {
        return Err(LookupError::StoreMissing {
            name,
            path: path.to_path_buf(),
        });
    }
    Reader::open_readfile(path).map_err(|e| LookupError::StoreUnreadable {
        name,
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

fn flat_file_error(name: &'static str, path: &Path, err: io::Error) -> LookupError {
    if err.kind() == io::ErrorKind::NotFound {
        LookupError::StoreMissing {
            name,
            path: path.to_path_buf(),
        }
    } else {
        LookupError::StoreUnreadable {
            name,
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    }
}
