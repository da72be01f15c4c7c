//! Aggregates derived from stored logs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, DurationRound, Utc};

use waf_dashboard_core::{
    AnomalousIp, AttackOriginEntry, AttackTimelinePoint, AttackType, LogRecord, OriginStats,
};

use super::traffic::country_of;

const TOP_ATTACK_TYPES: usize = 3;

/// Per-source aggregate for every address with at least one attack
pub fn anomalous_ips(logs: &[LogRecord]) -> Vec<AnomalousIp> {
    #[derive(Default)]
    struct Acc {
        total: u64,
        anomalous: u64,
        last_detected: Option<DateTime<Utc>>,
        rules: BTreeSet<String>,
    }

    let mut by_ip: HashMap<&str, Acc> = HashMap::new();
    for log in logs {
        let acc = by_ip.entry(log.ip.as_str()).or_default();
        acc.total += 1;
        if log.is_attack() {
            acc.anomalous += 1;
            acc.last_detected = acc.last_detected.max(Some(log.timestamp));
            acc.rules.extend(log.analysis_result.matched_rules.iter().cloned());
        }
    }

    let mut ips: Vec<AnomalousIp> = by_ip
        .into_iter()
        .filter_map(|(ip, acc)| {
            let last_detected = acc.last_detected?;
            let ratio = acc.anomalous as f64 / acc.total as f64;
            Some(AnomalousIp {
                ip: ip.to_string(),
                threat_level: (ratio * 1000.0).round() / 10.0,
                total_requests: acc.total,
                anomalous_requests: acc.anomalous,
                last_detected,
                matched_rules: acc.rules.into_iter().collect(),
            })
        })
        .collect();

    ips.sort_by(|a, b| {
        b.threat_level
            .total_cmp(&a.threat_level)
            .then_with(|| a.ip.cmp(&b.ip))
    });
    ips
}

/// Hourly buckets, oldest first
pub fn attack_timeline(logs: &[LogRecord]) -> Vec<AttackTimelinePoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, (u64, u64)> = BTreeMap::new();
    for log in logs {
        let bucket = log
            .timestamp
            .duration_trunc(Duration::hours(1))
            .unwrap_or(log.timestamp);
        let (attacks, total) = buckets.entry(bucket).or_default();
        *total += 1;
        if log.is_attack() {
            *attacks += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(timestamp, (attacks, total_requests))| AttackTimelinePoint {
            timestamp,
            attacks,
            total_requests,
        })
        .collect()
}

/// Per-country attack aggregate, keyed by country
pub fn attack_origins(logs: &[LogRecord]) -> BTreeMap<String, OriginStats> {
    #[derive(Default)]
    struct Acc<'a> {
        attacks: u64,
        ips: HashSet<&'a str>,
        last_attack: Option<DateTime<Utc>>,
        rules: HashMap<&'a str, u64>,
    }

    let mut by_country: BTreeMap<&str, Acc> = BTreeMap::new();
    for log in logs.iter().filter(|log| log.is_attack()) {
        let acc = by_country.entry(country_of(&log.ip)).or_default();
        acc.attacks += 1;
        acc.ips.insert(log.ip.as_str());
        acc.last_attack = acc.last_attack.max(Some(log.timestamp));
        for rule in &log.analysis_result.matched_rules {
            *acc.rules.entry(rule.as_str()).or_default() += 1;
        }
    }

    by_country
        .into_iter()
        .filter_map(|(country, acc)| {
            let mut top: Vec<AttackType> = acc
                .rules
                .into_iter()
                .map(|(rule, count)| AttackType {
                    rule: rule.to_string(),
                    count,
                })
                .collect();
            top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule.cmp(&b.rule)));
            top.truncate(TOP_ATTACK_TYPES);

            Some((
                country.to_string(),
                OriginStats {
                    attack_count: acc.attacks,
                    unique_ips: acc.ips.len() as u64,
                    last_attack: acc.last_attack?,
                    top_attack_types: top,
                },
            ))
        })
        .collect()
}

/// Keyed origins as a list, busiest country first
pub fn origins_list(keyed: BTreeMap<String, OriginStats>) -> Vec<AttackOriginEntry> {
    let mut list: Vec<AttackOriginEntry> = keyed
        .into_iter()
        .map(|(country, stats)| AttackOriginEntry { country, stats })
        .collect();
    list.sort_by(|a, b| {
        b.stats
            .attack_count
            .cmp(&a.stats.attack_count)
            .then_with(|| a.country.cmp(&b.country))
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use waf_dashboard_core::AnalysisResult;

    fn log(at: &str, ip: &str, rule: Option<&str>) -> LogRecord {
        LogRecord {
            timestamp: at.parse().unwrap(),
            method: "GET".into(),
            path: "/".into(),
            query: None,
            ip: ip.into(),
            analysis_result: AnalysisResult {
                injection_detected: rule.is_some(),
                matched_rules: rule.into_iter().map(str::to_string).collect(),
                message: None,
            },
        }
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            log("2024-01-01T10:05:00Z", "203.0.113.9", Some("sqli-union")),
            log("2024-01-01T10:15:00Z", "203.0.113.9", None),
            log("2024-01-01T10:20:00Z", "203.0.113.9", Some("xss-script-tag")),
            log("2024-01-01T10:30:00Z", "203.0.113.9", None),
            log("2024-01-01T11:01:00Z", "198.51.100.23", Some("sqli-union")),
            log("2024-01-01T11:02:00Z", "45.33.32.156", Some("sqli-union")),
            log("2024-01-01T11:03:00Z", "192.0.2.15", None),
        ]
    }

    #[test]
    fn test_anomalous_ips() {
        let ips = anomalous_ips(&sample());

        assert_eq!(ips.len(), 3);
        assert_eq!(ips[0].ip, "198.51.100.23");
        assert_eq!(ips[0].threat_level, 100.0);
        let au = ips.iter().find(|ip| ip.ip == "203.0.113.9").unwrap();
        assert_eq!(au.threat_level, 50.0);
        assert_eq!(au.total_requests, 4);
        assert_eq!(au.anomalous_requests, 2);
        assert_eq!(au.matched_rules, vec!["sqli-union", "xss-script-tag"]);
        assert_eq!(au.last_detected, "2024-01-01T10:20:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_hourly_timeline() {
        let timeline = attack_timeline(&sample());

        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].timestamp, "2024-01-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!((timeline[0].attacks, timeline[0].total_requests), (2, 4));
        assert_eq!((timeline[1].attacks, timeline[1].total_requests), (2, 3));
    }

    #[test]
    fn test_origins_by_country() {
        let keyed = attack_origins(&sample());

        assert_eq!(keyed.len(), 2);
        let us = &keyed["US"];
        assert_eq!(us.attack_count, 2);
        assert_eq!(us.unique_ips, 2);
        assert_eq!(us.top_attack_types, vec![AttackType { rule: "sqli-union".into(), count: 2 }]);

        let list = origins_list(keyed);
        assert_eq!(list[0].country, "AU");
        assert_eq!(list[1].country, "US");
    }
}
