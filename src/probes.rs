// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Probe Catalog
 * Named request sequences designed to elicit specific edge behaviors
 *
 * The catalog order is canonical: the runner executes probes in this
 * order and the FSM consumes features in the same order. Baseline first.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use std::collections::{HashMap, HashSet};

use crate::http_client::ProbeRequest;

/// Sequence names referenced by the analysis stages
pub const BASELINE_SEQ: &str = "baseline";
pub const STATE_COOKIES_SEQ: &str = "state_cookies";
pub const SOFT_BURST_SEQ: &str = "soft_burst";
pub const CANONICALIZATION_SEQ: &str = "canonicalization";

/// One step of a probe: a request shape plus a repeat count.
#[derive(Debug, Clone)]
pub struct Step {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub repeat: usize,
}

impl Step {
    fn get(path: &str, repeat: usize) -> Self {
        let mut headers = HashMap::new();
        headers.insert("accept".to_string(), "text/html".to_string());
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            headers,
            body: None,
            repeat,
        }
    }
}

/// A named probe sequence with descriptive tags.
#[derive(Debug, Clone)]
pub struct Probe {
    pub name: String,
    pub steps: Vec<Step>,
    pub tags: HashSet<String>,
}

impl Probe {
    fn new(name: &str, steps: Vec<Step>, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            steps,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn request_count(&self) -> usize {
        self.steps.iter().map(|s| s.repeat).sum()
    }
}

/// The standard catalog, in canonical execution order.
pub fn build_probes() -> Vec<Probe> {
    vec![
        Probe::new(
            BASELINE_SEQ,
            vec![Step::get("/", 5)],
            &["baseline"],
        ),
        Probe::new(
            STATE_COOKIES_SEQ,
            vec![Step::get("/", 2), Step::get("/?a=", 3)],
            &["state", "cookies"],
        ),
        Probe::new(
            SOFT_BURST_SEQ,
            vec![Step::get("/", 10)],
            &["burst", "rate_limit"],
        ),
        Probe::new(
            CANONICALIZATION_SEQ,
            vec![Step::get("/.", 2), Step::get("//", 2), Step::get("/?utm=", 2)],
            &["canonicalization", "normalization"],
        ),
    ]
}

/// Expand a probe into concrete requests against the target.
///
/// Paths are appended to the trimmed base URL as raw strings on purpose:
/// URL normalization would collapse exactly the `/.` and `//` variants the
/// canonicalization probe exists to exercise.
pub fn materialize(
    base_url: &str,
    probe: &Probe,
    base_headers: &HashMap<String, String>,
) -> Vec<ProbeRequest> {
    let root = base_url.trim_end_matches('/');
    let mut out = Vec::with_capacity(probe.request_count());
    for step in &probe.steps {
        for _ in 0..step.repeat {
            let mut headers = base_headers.clone();
            for (k, v) in &step.headers {
                headers.insert(k.clone(), v.clone());
            }
            out.push(ProbeRequest {
                method: step.method.clone(),
                url: format!("{}{}", root, step.path),
                headers,
                body: step.body.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_starts_with_baseline() {
        let probes = build_probes();
        assert_eq!(probes[0].name, BASELINE_SEQ);
        let names: Vec<&str> = probes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                BASELINE_SEQ,
                STATE_COOKIES_SEQ,
                SOFT_BURST_SEQ,
                CANONICALIZATION_SEQ
            ]
        );
    }

    #[test]
    fn test_materialize_expands_repeats() {
        let probes = build_probes();
        let baseline = &probes[0];
        let reqs = materialize("https://example.com/", baseline, &HashMap::new());
        assert_eq!(reqs.len(), 5);
        assert!(reqs.iter().all(|r| r.url == "https://example.com/"));
    }

    #[test]
    fn test_materialize_preserves_raw_paths() {
        let probes = build_probes();
        let canon = probes
            .iter()
            .find(|p| p.name == CANONICALIZATION_SEQ)
            .unwrap();
        let reqs = materialize("https://example.com", canon, &HashMap::new());
        let urls: HashSet<&str> = reqs.iter().map(|r| r.url.as_str()).collect();
        assert!(urls.contains("https://example.com/."));
        assert!(urls.contains("https://example.com//"));
        assert!(urls.contains("https://example.com/?utm="));
    }

    #[test]
    fn test_step_headers_override_base() {
        let probes = build_probes();
        let mut base = HashMap::new();
        base.insert("accept".to_string(), "application/json".to_string());
        base.insert("user-agent".to_string(), "edgeprint-test".to_string());
        let reqs = materialize("https://example.com", &probes[0], &base);
        // step's accept wins, base user-agent survives
        assert_eq!(reqs[0].headers.get("accept").unwrap(), "text/html");
        assert_eq!(reqs[0].headers.get("user-agent").unwrap(), "edgeprint-test");
    }
}
