// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - HTTP Transport
 * Issues single probe requests and records per-request observations
 *
 * Every request yields exactly one Observation, success or not: a failed
 * attempt is recorded with status 0 and an error description instead of
 * being dropped, so downstream histograms and error counts stay honest.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use reqwest::{Client, Method};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RunConfig;
use crate::errors::EdgeprintError;

/// Only the first 4KB of a body feed the truncated content hash
const BODY_HASH_WINDOW: usize = 4096;

/// Hex characters kept from the SHA-256 digest
const BODY_HASH_LEN: usize = 16;

const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// One materialized probe request, ready to send.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// One completed (or failed) request attempt. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub url: String,
    pub method: String,
    /// HTTP status, 0 when the transport failed before a response
    pub status: u16,
    pub ttfb_ms: f64,
    pub total_ms: f64,
    /// Response headers, keys lower-cased
    pub headers: HashMap<String, String>,
    /// First set-cookie value, empty if absent
    pub set_cookie: String,
    pub body_len: usize,
    /// 16-hex-char SHA-256 prefix over at most the first 4096 body bytes
    pub body_hash16: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Observation {
    fn failure(req: &ProbeRequest, elapsed_ms: f64, error: String) -> Self {
        Self {
            url: req.url.clone(),
            method: req.method.clone(),
            status: 0,
            ttfb_ms: elapsed_ms,
            total_ms: elapsed_ms,
            headers: HashMap::new(),
            set_cookie: String::new(),
            body_len: 0,
            body_hash16: String::new(),
            error: Some(error),
        }
    }
}

/// Truncated content hash over the leading body window.
pub fn body_hash16(body: &[u8]) -> String {
    let window = &body[..body.len().min(BODY_HASH_WINDOW)];
    let digest = Sha256::digest(window);
    let mut hx = hex::encode(digest);
    hx.truncate(BODY_HASH_LEN);
    hx
}

/// Thin reqwest wrapper with the pool/timeout/redirect policy fixed for
/// fingerprinting runs. Redirects are never followed: a 301 from the edge
/// is itself a behavior worth observing.
#[derive(Clone)]
pub struct EdgeClient {
    client: Client,
}

impl EdgeClient {
    pub fn new(cfg: &RunConfig) -> Result<Self, EdgeprintError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(cfg.max_connections)
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(EdgeprintError::ClientBuild)?;

        Ok(Self { client })
    }

    /// Send one probe request and absorb any failure into the Observation.
    pub async fn send(&self, req: &ProbeRequest) -> Observation {
        let started = Instant::now();

        let method = match Method::from_bytes(req.method.as_bytes()) {
            Ok(m) => m,
            Err(e) => {
                return Observation::failure(req, ms_since(started), e.to_string());
            }
        };

        let mut builder = self.client.request(method, &req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %req.url, error = %e, "probe request failed");
                return Observation::failure(req, ms_since(started), e.to_string());
            }
        };

        // Headers are in; body not yet drained.
        let ttfb_ms = ms_since(started);
        let status = response.status().as_u16();

        let mut headers = HashMap::with_capacity(response.headers().len());
        for (k, v) in response.headers().iter() {
            if let Ok(value) = v.to_str() {
                // reqwest header names are already lower-case
                headers.insert(k.as_str().to_string(), value.to_string());
            }
        }
        let set_cookie = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                debug!(url = %req.url, error = %e, "body read failed");
                return Observation::failure(req, ms_since(started), e.to_string());
            }
        };
        let total_ms = ms_since(started);

        Observation {
            url: req.url.clone(),
            method: req.method.clone(),
            status,
            ttfb_ms,
            total_ms,
            headers,
            set_cookie,
            body_len: body.len(),
            body_hash16: body_hash16(&body),
            error: None,
        }
    }
}

fn ms_since(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
