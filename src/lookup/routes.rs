//! Flat-file route and ASN-name tables
//!
//! `asncidr.dat` maps announced prefixes to their origin ASN, one
//! `CIDR<whitespace>ASN` pair per line. `asnnames.csv` is pipe-delimited
//! `asn|name` lines extracted from the CIDR report.

use ipnetwork::IpNetwork;
use std::io;
use std::net::IpAddr;
use std::path::Path;

/// In-memory prefix-to-ASN table answering longest-prefix-match queries
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<(IpNetwork, u32)>,
}

impl RouteTable {
    pub fn parse(text: &str) -> Self {
        let mut entries = vec![];
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(prefix), Some(asn)) = (fields.next(), fields.next()) else {
                continue;
            };
            if let (Ok(network), Ok(asn)) = (prefix.parse::<IpNetwork>(), asn.parse::<u32>()) {
                entries.push((network, asn));
            }
        }
        Self { entries }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// Longest-prefix match: the announcing ASN and the covering block
    pub fn lookup(&self, ip: IpAddr) -> Option<(u32, IpNetwork)> {
        self.entries
            .iter()
            .filter(|(network, _)| network.contains(ip))
            .max_by_key(|(network, _)| network.prefix())
            .map(|(network, asn)| (*asn, *network))
    }
}

/// Ordered `asn|name` lines; the first line matching an ASN wins
#[derive(Debug, Default)]
pub struct AsnNameTable {
    lines: Vec<(u32, String)>,
}

impl AsnNameTable {
    pub fn parse(text: &str) -> Self {
        let mut lines = vec![];
        for line in text.lines() {
            let Some((asn, name)) = line.split_once('|') else {
                continue;
            };
            if let Ok(asn) = asn.trim().parse::<u32>() {
                lines.push((asn, name.trim().to_string()));
            }
        }
        Self { lines }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn name_of(&self, asn: u32) -> Option<&str> {
        self.lines
            .iter()
            .find(|(candidate, _)| *candidate == asn)
            .map(|(_, name)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = "\
# prefix\tasn
172.32.0.0/11\t21928
172.34.0.0/16\t64512
10.0.0.0/8\t64496
2001:db8::/32\t64511
";

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::parse(ROUTES);
        // Both /11 and /16 cover this address; the /16 is more specific
        let (asn, cidr) = table.lookup("172.34.127.2".parse().unwrap()).unwrap();
        assert_eq!(asn, 64512);
        assert_eq!(cidr.to_string(), "172.34.0.0/16");

        let (asn, cidr) = table.lookup("172.35.0.1".parse().unwrap()).unwrap();
        assert_eq!(asn, 21928);
        assert_eq!(cidr.to_string(), "172.32.0.0/11");
    }

    #[test]
    fn uncovered_address_is_none() {
        let table = RouteTable::parse(ROUTES);
        assert!(table.lookup("8.8.8.8".parse().unwrap()).is_none());
    }

    #[test]
    fn v6_prefixes_resolve() {
        let table = RouteTable::parse(ROUTES);
        let (asn, _) = table.lookup("2001:db8::42".parse().unwrap()).unwrap();
        assert_eq!(asn, 64511);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = RouteTable::parse("garbage\n1.2.3.0/24\n300.0.0.0/8 5\n1.2.3.0/24 7\n");
        let (asn, _) = table.lookup("1.2.3.4".parse().unwrap()).unwrap();
        assert_eq!(asn, 7);
    }

    #[test]
    fn first_matching_name_line_wins() {
        let names = AsnNameTable::parse(
            "21928|T-MOBILE-AS21928 - T-Mobile USA, Inc., US\n21928|DUPLICATE ENTRY\n13335|CLOUDFLARENET, US\n",
        );
        assert_eq!(
            names.name_of(21928),
            Some("T-MOBILE-AS21928 - T-Mobile USA, Inc., US")
        );
        assert_eq!(names.name_of(13335), Some("CLOUDFLARENET, US"));
        assert_eq!(names.name_of(1), None);
    }
}
