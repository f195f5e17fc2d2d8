//! Plain-text report rendering
//!
//! Pure functions from lookup/aggregation results to the final report text,
//! so section contents and ordering stay testable without any I/O. Sorting
//! happens here: sample sections ascend by observation date, passive DNS
//! descends by first-seen (newest resolutions first).

use std::cmp::Reverse;
use std::net::IpAddr;

use crate::models::{IntelReport, LocalIpInfo};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render the local geolocation/ASN report for `info <IP>`
pub fn render_info(ip: IpAddr, info: &LocalIpInfo) -> String {
    let mut lines: Vec<String> = vec![];

    match &info.geo {
        Some(geo) => lines.push(format!(
            "MaxMind: Located in {}, {}",
            geo.city.as_deref().unwrap_or("Unknown"),
            geo.country.as_deref().unwrap_or("Unknown")
        )),
        None => lines.push("MaxMind: IP not found in the city database".to_string()),
    }

    match &info.asn {
        Some(asn) => lines.push(format!(
            "MaxMind: ASN{}, {}",
            asn.number,
            asn.organization.as_deref().unwrap_or("")
        )),
        None => lines.push("MaxMind: IP not found in the ASN database".to_string()),
    }

    match &info.route {
        Some(route) => lines.push(format!(
            "ASN {} - {} (range {})",
            route.asn,
            route.name.as_deref().unwrap_or(""),
            route.cidr
        )),
        None => lines.push("IP not found in ASN database".to_string()),
    }

    lines.push(String::new());

    if is_private(ip) {
        lines.push("Private IP address".to_string());
    }

    // The pivot links only make sense for public IPv4 services
    if ip.is_ipv4() {
        lines.push(format!("Censys:\t\thttps://censys.io/ipv4/{ip}"));
        lines.push(format!("Shodan:\t\thttps://www.shodan.io/host/{ip}"));
        lines.push(format!("IP Info:\thttp://ipinfo.io/{ip}"));
        lines.push(format!("BGP HE:\t\thttps://bgp.he.net/ip/{ip}"));
        lines.push(format!(
            "IP Location:\thttps://www.iplocation.net/?query={ip}"
        ));
    }

    lines.join("\n") + "\n"
}

/// Render the aggregated intelligence report for `intel <IP>`
pub fn render_intel(report: &IntelReport) -> String {
    let mut lines: Vec<String> = vec![];

    lines.push(format!(
        "###################### {} ###################",
        report.ip
    ));
    lines.push("----------------- Intelligence Report".to_string());

    if report.was_queried("otx") {
        if report.pulses.is_empty() {
            lines.push("OTX: Not found in any pulse".to_string());
        } else {
            lines.push("OTX:".to_string());
            for pulse in &report.pulses {
                lines.push(format!(
                    " -{} ({} - {})",
                    pulse.name,
                    pulse.created.format(DATE_FORMAT),
                    pulse.url
                ));
            }
        }
    }

    if report.was_queried("greynoise") {
        if report.noise.is_empty() {
            lines.push("GreyNoise: Not found".to_string());
        } else {
            lines.push("GreyNoise: IP identified as".to_string());
            for record in &report.noise {
                lines.push(format!(
                    "\t{} ({} -> {})",
                    record.name, record.first_seen, record.last_updated
                ));
            }
        }
    }

    if report.was_queried("passivetotal") {
        match report.osint.as_slice() {
            [] => lines.push("PT: Nothing found!".to_string()),
            [only] => lines.push(format!("PT: {} {}", only.name, only.url)),
            many => {
                lines.push("PT:".to_string());
                for reference in many {
                    lines.push(format!("-{} {}", reference.name, reference.url));
                }
            }
        }
    }

    if !report.malware.is_empty() {
        lines.push("----------------- Malware".to_string());
        let mut malware = report.malware.clone();
        malware.sort_by_key(|record| record.date);
        for record in &malware {
            lines.push(format!(
                "[{}] {} {}",
                record.source_tag(),
                record.hash,
                record.date.format(DATE_FORMAT)
            ));
        }
    }

    if !report.files.is_empty() {
        lines.push("----------------- Files".to_string());
        let mut files = report.files.clone();
        files.sort_by_key(|record| record.date);
        for record in &files {
            lines.push(format!(
                "[{}] {} {}",
                record.source_tag(),
                record.hash,
                record.date.format(DATE_FORMAT)
            ));
        }
    }

    if !report.passive_dns.is_empty() {
        lines.push("----------------- Passive DNS".to_string());
        let mut resolutions = report.passive_dns.clone();
        resolutions.sort_by_key(|record| Reverse(record.first_seen));
        for record in &resolutions {
            lines.push(format!(
                "[+] {:<40} ({} -> {})({})",
                record.domain,
                record.first_seen.format(DATE_FORMAT),
                record.last_seen.format(DATE_FORMAT),
                record.source
            ));
        }
    }

    lines.join("\n") + "\n"
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        // Unique-local fc00::/7
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AsnInfo, CityInfo, NoiseRecord, OsintRef, PassiveDnsRecord, Pulse, RouteInfo,
        SampleRecord, Source,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn link_lines(text: &str) -> usize {
        text.lines().filter(|line| line.contains("://")).count()
    }

    #[test]
    fn tmobile_fixture_renders_the_expected_lines() {
        let info = LocalIpInfo {
            geo: None,
            asn: Some(AsnInfo {
                number: 21928,
                organization: Some("T-Mobile USA, Inc.".to_string()),
            }),
            route: Some(RouteInfo {
                asn: 21928,
                name: Some("T-MOBILE-AS21928 - T-Mobile USA, Inc., US".to_string()),
                cidr: "172.32.0.0/11".parse().unwrap(),
            }),
        };

        let out = render_info("172.34.127.2".parse().unwrap(), &info);

        assert!(out.contains("MaxMind: IP not found in the city database"));
        assert!(out.contains("MaxMind: ASN21928, T-Mobile USA, Inc."));
        assert!(out.contains(
            "ASN 21928 - T-MOBILE-AS21928 - T-Mobile USA, Inc., US (range 172.32.0.0/11)"
        ));
        assert_eq!(link_lines(&out), 5);
    }

    #[test]
    fn city_fields_fall_back_to_unknown_individually() {
        let info = LocalIpInfo {
            geo: Some(CityInfo {
                city: None,
                country: Some("United States".to_string()),
            }),
            asn: None,
            route: None,
        };

        let out = render_info("8.8.8.8".parse().unwrap(), &info);
        assert!(out.contains("MaxMind: Located in Unknown, United States"));
        assert!(out.contains("MaxMind: IP not found in the ASN database"));
        assert!(out.contains("IP not found in ASN database"));
    }

    #[test]
    fn ipv6_gets_no_link_lines() {
        let out = render_info("2001:db8::1".parse().unwrap(), &LocalIpInfo::default());
        assert_eq!(link_lines(&out), 0);
    }

    #[test]
    fn private_addresses_are_annotated() {
        let out = render_info("192.168.1.10".parse().unwrap(), &LocalIpInfo::default());
        assert!(out.contains("Private IP address"));
        // Still an IPv4 address, so the links remain
        assert_eq!(link_lines(&out), 5);

        let out = render_info("fd00::1".parse().unwrap(), &LocalIpInfo::default());
        assert!(out.contains("Private IP address"));

        let out = render_info("8.8.8.8".parse().unwrap(), &LocalIpInfo::default());
        assert!(!out.contains("Private IP address"));
    }

    fn empty_report(queried: Vec<&'static str>) -> IntelReport {
        let mut report = IntelReport::new("1.2.3.4".parse().unwrap());
        report.queried = queried;
        report
    }

    #[test]
    fn gated_sections_print_explicit_not_found_lines() {
        let report = empty_report(vec!["otx", "greynoise", "passivetotal"]);
        let out = render_intel(&report);

        assert!(out.contains("OTX: Not found in any pulse"));
        assert!(out.contains("GreyNoise: Not found"));
        assert!(out.contains("PT: Nothing found!"));
        assert!(!out.contains("----------------- Malware"));
        assert!(!out.contains("----------------- Passive DNS"));
    }

    #[test]
    fn unqueried_providers_get_no_section_at_all() {
        let out = render_intel(&empty_report(vec![]));
        assert!(out.contains("Intelligence Report"));
        assert!(!out.contains("OTX"));
        assert!(!out.contains("GreyNoise"));
        assert!(!out.contains("PT:"));
    }

    #[test]
    fn sample_sections_ascend_and_passive_dns_descends() {
        let mut report = empty_report(vec![]);
        let sample = |hash: &str, when: NaiveDateTime, source: Source| SampleRecord {
            hash: hash.to_string(),
            date: when,
            source,
            source_detail: None,
        };
        report.malware = vec![
            sample("bbbb", date(2019, 5, 1), Source::ThreatGrid),
            sample("aaaa", date(2017, 1, 1), Source::VirusTotal),
            sample("cccc", date(2018, 3, 1), Source::VirusTotal),
        ];
        report.files = vec![
            sample("ffff", date(2019, 1, 1), Source::VirusTotal),
            sample("eeee", date(2016, 1, 1), Source::VirusTotal),
        ];
        let resolution = |domain: &str, first: NaiveDateTime| PassiveDnsRecord {
            domain: domain.to_string(),
            first_seen: first,
            last_seen: first,
            source: Source::Robtex,
        };
        report.passive_dns = vec![
            resolution("old.example.org", date(2015, 1, 1)),
            resolution("new.example.org", date(2019, 8, 1)),
            resolution("mid.example.org", date(2017, 6, 1)),
        ];

        let out = render_intel(&report);
        let lines: Vec<&str> = out.lines().collect();

        // Ascending by date across the malware and files sections
        let line_idx = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
        assert!(line_idx("aaaa") < line_idx("cccc"));
        assert!(line_idx("cccc") < line_idx("bbbb"));
        assert!(line_idx("eeee") < line_idx("ffff"));
        assert!(line_idx("----------------- Malware") < line_idx("----------------- Files"));

        // Passive DNS is newest-first
        assert!(line_idx("new.example.org") < line_idx("mid.example.org"));
        assert!(line_idx("mid.example.org") < line_idx("old.example.org"));

        // Domain column is padded for alignment
        assert!(out.contains(&format!("[+] {:<40} ", "new.example.org")));
    }

    #[test]
    fn ties_keep_provider_order() {
        let mut report = empty_report(vec![]);
        let when = date(2018, 1, 1);
        report.malware = vec![
            SampleRecord {
                hash: "first".to_string(),
                date: when,
                source: Source::VirusTotal,
                source_detail: None,
            },
            SampleRecord {
                hash: "second".to_string(),
                date: when,
                source: Source::ThreatGrid,
                source_detail: None,
            },
        ];

        let out = render_intel(&report);
        let first = out.find("first").unwrap();
        let second = out.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn pulse_noise_and_osint_sections_render_records() {
        let mut report = empty_report(vec!["otx", "greynoise", "passivetotal"]);
        report.pulses = vec![Pulse {
            name: "Campaign A".to_string(),
            created: NaiveDate::from_ymd_opt(2019, 3, 26).unwrap(),
            url: "https://otx.alienvault.com/pulse/p1".to_string(),
        }];
        report.noise = vec![NoiseRecord {
            name: "SHODAN".to_string(),
            first_seen: "2017-01-05".to_string(),
            last_updated: "2019-06-01".to_string(),
        }];
        report.osint = vec![OsintRef {
            name: "Write-up".to_string(),
            url: "https://blog.example.org/a".to_string(),
        }];

        let out = render_intel(&report);
        assert!(out.contains(" -Campaign A (2019-03-26 - https://otx.alienvault.com/pulse/p1)"));
        assert!(out.contains("GreyNoise: IP identified as"));
        assert!(out.contains("\tSHODAN (2017-01-05 -> 2019-06-01)"));
        // A single OSINT reference renders inline
        assert!(out.contains("PT: Write-up https://blog.example.org/a"));

        report.osint.push(OsintRef {
            name: "Second".to_string(),
            url: "https://blog.example.org/b".to_string(),
        });
        let out = render_intel(&report);
        assert!(out.contains("PT:\n"));
        assert!(out.contains("-Write-up https://blog.example.org/a"));
        assert!(out.contains("-Second https://blog.example.org/b"));
    }

    #[test]
    fn captured_urls_are_not_rendered() {
        let mut report = empty_report(vec!["otx"]);
        report.urls = vec!["http://evil.example.org/dropper".to_string()];
        let out = render_intel(&report);
        assert!(!out.contains("dropper"));
    }
}
