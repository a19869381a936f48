// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Run Configuration
 * Validated transport settings for a single fingerprinting run
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::errors::EdgeprintError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_JITTER_MIN_MS: u64 = 50;
pub const DEFAULT_JITTER_MAX_MS: u64 = 150;
pub const DEFAULT_USER_AGENT: &str = "edgeprint/0.2";

/// Settings for one run: target plus transport knobs.
///
/// The analysis pipeline never reads this; only the runner and the HTTP
/// client do. Every run is independent, nothing persists between runs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target base URL (scheme + authority, validated)
    pub target: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on pooled connections to the target
    pub max_connections: usize,
    /// Inter-request jitter window, milliseconds
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl RunConfig {
    pub fn new(target: &str) -> Result<Self, EdgeprintError> {
        let parsed = Url::parse(target).map_err(|e| EdgeprintError::InvalidTarget {
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(EdgeprintError::InvalidTarget {
                url: target.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.host_str().is_none() {
            return Err(EdgeprintError::InvalidTarget {
                url: target.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            target: target.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_connections: DEFAULT_CONCURRENCY,
            jitter_min_ms: DEFAULT_JITTER_MIN_MS,
            jitter_max_ms: DEFAULT_JITTER_MAX_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_concurrency(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_jitter(mut self, min_ms: u64, max_ms: u64) -> Result<Self, EdgeprintError> {
        if min_ms > max_ms {
            return Err(EdgeprintError::InvalidJitter {
                min: min_ms,
                max: max_ms,
            });
        }
        self.jitter_min_ms = min_ms;
        self.jitter_max_ms = max_ms;
        Ok(self)
    }

    pub fn with_user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    /// Headers applied to every materialized request, overridable per step.
    pub fn base_headers(&self) -> HashMap<String, String> {
        let mut h = HashMap::new();
        h.insert("user-agent".to_string(), self.user_agent.clone());
        h.insert("accept".to_string(), "text/html".to_string());
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_target() {
        let cfg = RunConfig::new("https://example.com").unwrap();
        assert_eq!(cfg.target, "https://example.com");
        assert_eq!(cfg.max_connections, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_rejects_bad_scheme() {
        assert!(RunConfig::new("ftp://example.com").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RunConfig::new("not a url").is_err());
    }

    #[test]
    fn test_rejects_inverted_jitter() {
        let cfg = RunConfig::new("https://example.com").unwrap();
        assert!(cfg.with_jitter(200, 100).is_err());
    }

    #[test]
    fn test_base_headers_carry_user_agent() {
        let cfg = RunConfig::new("https://example.com")
            .unwrap()
            .with_user_agent("test/1.0");
        let h = cfg.base_headers();
        assert_eq!(h.get("user-agent").unwrap(), "test/1.0");
        assert_eq!(h.get("accept").unwrap(), "text/html");
    }
}
