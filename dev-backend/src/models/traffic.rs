//! Synthetic WAF traffic
//!
//! Produces plausible request logs: mostly benign browsing with a share of
//! injection attempts, from a small pool of source addresses whose prefixes
//! map to countries.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use waf_dashboard_core::{AnalysisResult, LogRecord};

/// Address prefix -> country identifier
const COUNTRY_PREFIXES: &[(&str, &str)] = &[
    ("203.0.113.", "AU"),
    ("198.51.100.", "US"),
    ("192.0.2.", "DE"),
    ("185.220.", "NL"),
    ("91.198.", "RU"),
    ("45.33.", "US"),
    ("10.", "Internal"),
];

const SOURCE_IPS: &[&str] = &[
    "203.0.113.9",
    "203.0.113.77",
    "198.51.100.23",
    "198.51.100.140",
    "192.0.2.15",
    "185.220.101.4",
    "91.198.174.2",
    "45.33.32.156",
    "10.0.0.12",
];

struct AttackPattern {
    path: &'static str,
    query: &'static str,
    rule: &'static str,
    message: &'static str,
}

const ATTACKS: &[AttackPattern] = &[
    AttackPattern {
        path: "/login",
        query: "user=admin'%20OR%20'1'='1",
        rule: "sqli-tautology",
        message: "SQL injection: boolean tautology",
    },
    AttackPattern {
        path: "/products",
        query: "id=1%20UNION%20SELECT%20password%20FROM%20users",
        rule: "sqli-union",
        message: "SQL injection: UNION SELECT",
    },
    AttackPattern {
        path: "/search",
        query: "q=%3Cscript%3Ealert(1)%3C/script%3E",
        rule: "xss-script-tag",
        message: "Cross-site scripting: script tag",
    },
    AttackPattern {
        path: "/download",
        query: "file=../../../../etc/passwd",
        rule: "path-traversal",
        message: "Path traversal sequence",
    },
    AttackPattern {
        path: "/ping",
        query: "host=127.0.0.1;cat%20/etc/shadow",
        rule: "cmd-injection",
        message: "OS command injection",
    },
];

const BENIGN: &[(&str, &str, Option<&str>)] = &[
    ("GET", "/", None),
    ("GET", "/products", Some("id=42")),
    ("GET", "/search", Some("q=running+shoes")),
    ("POST", "/api/cart", None),
    ("GET", "/static/app.js", None),
    ("POST", "/login", None),
];

/// Country of a source address, from the fixed prefix table
pub fn country_of(ip: &str) -> &'static str {
    COUNTRY_PREFIXES
        .iter()
        .find(|(prefix, _)| ip.starts_with(prefix))
        .map(|(_, country)| *country)
        .unwrap_or("Unknown")
}

pub struct TrafficGenerator {
    rng: StdRng,
    attack_ratio: f64,
}

impl TrafficGenerator {
    /// Reproducible traffic
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            attack_ratio: 0.3,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            attack_ratio: 0.3,
        }
    }

    pub fn with_attack_ratio(mut self, ratio: f64) -> Self {
        self.attack_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// One request observed at `at`
    pub fn next_record(&mut self, at: DateTime<Utc>) -> LogRecord {
        let ip = SOURCE_IPS.choose(&mut self.rng).copied().unwrap_or("10.0.0.1");

        if self.rng.gen_bool(self.attack_ratio) {
            let attack = &ATTACKS[self.rng.gen_range(0..ATTACKS.len())];
            LogRecord {
                timestamp: at,
                method: "GET".to_string(),
                path: attack.path.to_string(),
                query: Some(attack.query.to_string()),
                ip: ip.to_string(),
                analysis_result: AnalysisResult {
                    injection_detected: true,
                    matched_rules: vec![attack.rule.to_string()],
                    message: Some(attack.message.to_string()),
                },
            }
        } else {
            let (method, path, query) = BENIGN[self.rng.gen_range(0..BENIGN.len())];
            LogRecord {
                timestamp: at,
                method: method.to_string(),
                path: path.to_string(),
                query: query.map(str::to_string),
                ip: ip.to_string(),
                analysis_result: AnalysisResult::default(),
            }
        }
    }

    /// `count` records ending at `end`, oldest first, with distinct timestamps
    pub fn history(&mut self, count: usize, end: DateTime<Utc>) -> Vec<LogRecord> {
        let mut at = end;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(self.next_record(at));
            at -= Duration::seconds(self.rng.gen_range(30..600));
        }
        records.reverse();
        records
    }
}
