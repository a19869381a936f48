// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Report Assembly
 * Read-only output record combining summary, FSM trace and features
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use serde::Serialize;

use crate::features::FeatureSet;
use crate::fsm::{EdgeState, FsmResult, Scope};
use crate::scoring::{Family, Verdict};

/// Compact verdict view placed at the top of the report.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub final_state: EdgeState,
    /// Absent when the final state carries no recorded properties
    pub scope: Option<Scope>,
    pub score: f64,
    pub family: Family,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub target: String,
    pub summary: Summary,
    pub edge_fsm: FsmResult,
    pub features: FeatureSet,
}

/// Pure assembly, no recomputation: the scope is read back from the FSM's
/// property bag keyed by the final state.
pub fn build_report(
    target: &str,
    features: FeatureSet,
    fsm: FsmResult,
    verdict: Verdict,
) -> Report {
    let summary = Summary {
        final_state: fsm.final_state,
        scope: fsm.final_scope(),
        score: verdict.score,
        family: verdict.family,
        signals: verdict.signals,
    };

    Report {
        target: target.to_string(),
        summary,
        edge_fsm: fsm,
        features,
    }
}
