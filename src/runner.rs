// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Probe Runner
 * Executes the probe catalog and collects the ordered observation set
 *
 * Ordering is load-bearing: probes run in catalog order, requests within
 * a probe run in materialization order, and the result preserves both.
 * The FSM stage is only defined over this ordering.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::http_client::{EdgeClient, Observation};
use crate::probes::{materialize, Probe};

/// Probe name -> ordered observations, itself in canonical probe order.
/// A plain pair list, not a map: iteration order is part of the contract.
pub type ObservationSet = Vec<(String, Vec<Observation>)>;

/// Run every probe in catalog order, one request at a time with jitter.
pub async fn run_probes(
    client: &EdgeClient,
    cfg: &RunConfig,
    probes: &[Probe],
) -> ObservationSet {
    let base_headers = cfg.base_headers();
    let mut out: ObservationSet = Vec::with_capacity(probes.len());

    for probe in probes {
        let requests = materialize(&cfg.target, probe, &base_headers);
        info!(
            probe = %probe.name,
            requests = requests.len(),
            "running probe sequence"
        );

        let mut observations = Vec::with_capacity(requests.len());
        for request in &requests {
            sleep_jitter(cfg).await;
            let obs = client.send(request).await;
            debug!(
                probe = %probe.name,
                url = %obs.url,
                status = obs.status,
                total_ms = obs.total_ms,
                "observation recorded"
            );
            observations.push(obs);
        }
        out.push((probe.name.clone(), observations));
    }

    out
}

async fn sleep_jitter(cfg: &RunConfig) {
    let jitter_ms = if cfg.jitter_max_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(cfg.jitter_min_ms..=cfg.jitter_max_ms)
    };
    if jitter_ms > 0 {
        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
    }
}
