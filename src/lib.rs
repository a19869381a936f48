// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Edge Behavior Fingerprinting Library
 * Probes an HTTP edge and classifies its defensive behavior
 *
 * Pipeline: probe catalog -> runner (observations) -> feature extraction
 * -> FSM inference -> scoring -> report. The analysis stages are pure and
 * synchronous; only the runner and HTTP client touch the network.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

pub mod config;
pub mod errors;
pub mod http_client;
pub mod probes;
pub mod runner;

// Analysis pipeline
pub mod features;
pub mod fsm;
pub mod report;
pub mod scoring;

use anyhow::Result;
use tracing::info;

use crate::config::RunConfig;
use crate::http_client::EdgeClient;
use crate::report::Report;
use crate::runner::ObservationSet;

/// Run the full analysis over an already-collected observation set.
///
/// Deterministic and side-effect free; drives the same code path the
/// integration tests use.
pub fn analyze(target: &str, observations: &ObservationSet) -> Report {
    let features = features::extract(observations);
    let fsm = fsm::infer(&features);
    let verdict = scoring::score(&features, &fsm);
    report::build_report(target, features, fsm, verdict)
}

/// Execute the standard probe catalog against the target and analyze it.
pub async fn fingerprint(cfg: &RunConfig) -> Result<Report> {
    let client = EdgeClient::new(cfg)?;
    let probes = probes::build_probes();
    let observations = runner::run_probes(&client, cfg, &probes).await;

    let report = analyze(&cfg.target, &observations);
    info!(
        target_url = %cfg.target,
        final_state = %report.summary.final_state,
        score = report.summary.score,
        family = report.summary.family.as_str(),
        "fingerprint complete"
    );
    Ok(report)
}
