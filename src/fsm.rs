// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Edge Behavior FSM
 * Infers a discrete escalation state from per-sequence features
 *
 * The machine walks sequence features strictly in canonical probe order.
 * Within a state, guards are checked in table order and the first match
 * wins. Only state changes are recorded; blocked_hard has no way out.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use serde::Serialize;
use std::collections::BTreeMap;

use crate::features::{FeatureSet, SequenceFeatures};
use crate::probes::BASELINE_SEQ;

pub const SIG_STATEFUL_EDGE: &str = "stateful_edge_detected";
pub const SIG_ADAPTIVE_RATE_LIMIT: &str = "adaptive_rate_limit_detected";
pub const SIG_NON_RECOVERABLE_BLOCK: &str = "non_recoverable_block";

/// Synthetic event label for the post-run escalation check
const TERMINAL_EVENT: &str = "terminal";

const OBSERVED_DRIFT_FLOOR: f64 = 1.2;
const CALM_DRIFT_CEILING: f64 = 1.1;

/// Closed set of edge escalation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeState {
    Neutral,
    Observed,
    Throttled,
    Challenged,
    BlockedSoft,
    BlockedHard,
}

impl EdgeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeState::Neutral => "neutral",
            EdgeState::Observed => "observed",
            EdgeState::Throttled => "throttled",
            EdgeState::Challenged => "challenged",
            EdgeState::BlockedSoft => "blocked_soft",
            EdgeState::BlockedHard => "blocked_hard",
        }
    }

    fn is_escalated(&self) -> bool {
        matches!(
            self,
            EdgeState::Throttled
                | EdgeState::Challenged
                | EdgeState::BlockedSoft
                | EdgeState::BlockedHard
        )
    }
}

impl std::fmt::Display for EdgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity at which the edge appears to track state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    CookieScoped,
    IpScoped,
    ConnectionScoped,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::CookieScoped => "cookie_scoped",
            Scope::IpScoped => "ip_scoped",
            Scope::ConnectionScoped => "connection_scoped",
        }
    }
}

/// One recorded state change, labeled with the probe that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub event: String,
    pub from_state: EdgeState,
    pub to_state: EdgeState,
}

/// Property bag attached to a visited state. Only the final state carries
/// one per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateProperties {
    pub scope: Scope,
}

#[derive(Debug, Clone, Serialize)]
pub struct FsmResult {
    pub initial_state: EdgeState,
    pub final_state: EdgeState,
    pub transitions: Vec<Transition>,
    pub state_properties: BTreeMap<String, StateProperties>,
    pub signals: Vec<String>,
}

impl FsmResult {
    pub fn has_signal(&self, name: &str) -> bool {
        self.signals.iter().any(|s| s == name)
    }

    pub fn final_scope(&self) -> Option<Scope> {
        self.state_properties
            .get(self.final_state.as_str())
            .map(|p| p.scope)
    }
}

// --- guards -------------------------------------------------------------

fn is_throttled(f: &SequenceFeatures) -> bool {
    f.saw_status("429") || f.lat_drift_ratio >= 1.5
}

fn is_challenged(f: &SequenceFeatures) -> bool {
    f.set_cookie_count > 0 && f.unique_body_hashes >= 2
}

fn is_blocked(f: &SequenceFeatures) -> bool {
    f.saw_status("403")
}

// --- inference ----------------------------------------------------------

/// Walk the feature set through the escalation machine.
pub fn infer(features: &FeatureSet) -> FsmResult {
    // A blocked baseline is a starting condition, not an event.
    let mut state = match features.get(BASELINE_SEQ) {
        Some(base) if is_blocked(base) => EdgeState::BlockedHard,
        _ => EdgeState::Neutral,
    };

    let mut transitions: Vec<Transition> = Vec::new();

    for (name, feat) in &features.seq {
        let next = next_state(state, feat);
        if let Some(next) = next {
            if next != state {
                transitions.push(Transition {
                    event: name.clone(),
                    from_state: state,
                    to_state: next,
                });
                state = next;
            }
        }
    }

    // Still soft-blocked at the end of the run with the last probe blocked
    // and not recovering: escalate to a hard block.
    if state == EdgeState::BlockedSoft {
        if let Some((_, last)) = features.seq.last() {
            if is_blocked(last) && !last.recovery {
                transitions.push(Transition {
                    event: TERMINAL_EVENT.to_string(),
                    from_state: EdgeState::BlockedSoft,
                    to_state: EdgeState::BlockedHard,
                });
                state = EdgeState::BlockedHard;
            }
        }
    }

    let mut signals: Vec<String> = Vec::new();
    if transitions.iter().any(|t| t.to_state.is_escalated()) {
        signals.push(SIG_STATEFUL_EDGE.to_string());
    }
    if transitions
        .iter()
        .any(|t| t.to_state == EdgeState::Throttled)
    {
        signals.push(SIG_ADAPTIVE_RATE_LIMIT.to_string());
    }
    if state == EdgeState::BlockedHard {
        signals.push(SIG_NON_RECOVERABLE_BLOCK.to_string());
    }

    // A run that produced no observations at all carries no property entry;
    // otherwise exactly one state (the final one) does.
    let saw_traffic = features
        .seq
        .iter()
        .any(|(_, f)| !f.status_hist.is_empty());
    let mut state_properties = BTreeMap::new();
    if saw_traffic {
        let scope = classify_scope(features, state);
        state_properties.insert(state.as_str().to_string(), StateProperties { scope });
    }

    FsmResult {
        initial_state: EdgeState::Neutral,
        final_state: state,
        transitions,
        state_properties,
        signals,
    }
}

fn next_state(state: EdgeState, feat: &SequenceFeatures) -> Option<EdgeState> {
    match state {
        EdgeState::Neutral => {
            if is_throttled(feat) {
                Some(EdgeState::Throttled)
            } else if is_challenged(feat) {
                Some(EdgeState::Challenged)
            } else if feat.lat_drift_ratio >= OBSERVED_DRIFT_FLOOR {
                Some(EdgeState::Observed)
            } else {
                None
            }
        }
        EdgeState::Observed => {
            if is_throttled(feat) {
                Some(EdgeState::Throttled)
            } else if is_challenged(feat) {
                Some(EdgeState::Challenged)
            } else {
                None
            }
        }
        EdgeState::Throttled => {
            if is_blocked(feat) {
                Some(EdgeState::BlockedSoft)
            } else if feat.lat_drift_ratio < CALM_DRIFT_CEILING {
                Some(EdgeState::Neutral)
            } else {
                None
            }
        }
        EdgeState::Challenged => {
            if is_blocked(feat) {
                Some(EdgeState::BlockedSoft)
            } else {
                None
            }
        }
        EdgeState::BlockedSoft => {
            if feat.recovery {
                Some(EdgeState::Neutral)
            } else {
                None
            }
        }
        // Terminal: no outgoing transitions
        EdgeState::BlockedHard => None,
    }
}

fn classify_scope(features: &FeatureSet, final_state: EdgeState) -> Scope {
    if features.total_set_cookies() > 0 {
        Scope::CookieScoped
    } else if matches!(
        final_state,
        EdgeState::BlockedSoft | EdgeState::BlockedHard | EdgeState::Throttled
    ) {
        Scope::IpScoped
    } else {
        Scope::ConnectionScoped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureSet, LatencyStats, SequenceFeatures};
    use std::collections::BTreeMap;

    fn feat() -> SequenceFeatures {
        SequenceFeatures {
            lat_mean: 100.0,
            lat_std: 5.0,
            lat_drift_ratio: 1.0,
            status_hist: BTreeMap::from([("200".to_string(), 5)]),
            error_count: 0,
            set_cookie_count: 0,
            unique_body_hashes: 1,
            unique_header_keys: 4,
            recovery: true,
        }
    }

    fn feature_set(seq: Vec<(&str, SequenceFeatures)>) -> FeatureSet {
        FeatureSet {
            baseline: LatencyStats {
                mean: 100.0,
                std: 5.0,
            },
            seq: seq.into_iter().map(|(n, f)| (n.to_string(), f)).collect(),
        }
    }

    fn with_status(mut f: SequenceFeatures, code: &str) -> SequenceFeatures {
        f.status_hist.insert(code.to_string(), 2);
        f.recovery = f.recovery && code != "403" && code != "429";
        f
    }

    #[test]
    fn test_calm_run_stays_neutral() {
        let fs = feature_set(vec![
            ("baseline", feat()),
            ("state_cookies", feat()),
            ("soft_burst", feat()),
            ("canonicalization", feat()),
        ]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Neutral);
        assert!(result.transitions.is_empty());
        assert!(result.signals.is_empty());
        assert_eq!(result.final_scope(), Some(Scope::ConnectionScoped));
    }

    #[test]
    fn test_429_escalates_to_throttled() {
        let mut burst = with_status(feat(), "429");
        burst.lat_drift_ratio = 1.6;
        burst.recovery = false;
        let fs = feature_set(vec![("baseline", feat()), ("soft_burst", burst)]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Throttled);
        assert_eq!(result.transitions.len(), 1);
        assert_eq!(result.transitions[0].event, "soft_burst");
        assert!(result.has_signal(SIG_ADAPTIVE_RATE_LIMIT));
        assert!(result.has_signal(SIG_STATEFUL_EDGE));
        assert_eq!(result.final_scope(), Some(Scope::IpScoped));
    }

    #[test]
    fn test_drift_alone_reaches_observed() {
        let mut slow = feat();
        slow.lat_drift_ratio = 1.3;
        slow.recovery = false;
        let fs = feature_set(vec![("baseline", feat()), ("soft_burst", slow)]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Observed);
        // observed is not an escalated destination
        assert!(!result.has_signal(SIG_STATEFUL_EDGE));
    }

    #[test]
    fn test_challenge_path() {
        let mut cookies = feat();
        cookies.set_cookie_count = 4;
        cookies.unique_body_hashes = 2;
        let fs = feature_set(vec![("baseline", feat()), ("state_cookies", cookies)]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Challenged);
        assert_eq!(result.final_scope(), Some(Scope::CookieScoped));
    }

    #[test]
    fn test_blocked_baseline_starts_hard_with_no_transitions() {
        let base = with_status(feat(), "403");
        let fs = feature_set(vec![("baseline", base), ("soft_burst", feat())]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::BlockedHard);
        assert!(result.transitions.is_empty());
        assert_eq!(result.initial_state, EdgeState::Neutral);
        assert!(result.has_signal(SIG_NON_RECOVERABLE_BLOCK));
    }

    #[test]
    fn test_throttled_then_blocked_escalates_to_terminal_hard() {
        let mut burst = with_status(feat(), "429");
        burst.lat_drift_ratio = 1.6;
        burst.recovery = false;
        let blocked = with_status(feat(), "403");
        let fs = feature_set(vec![
            ("baseline", feat()),
            ("soft_burst", burst),
            ("canonicalization", blocked),
        ]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::BlockedHard);
        let last = result.transitions.last().unwrap();
        assert_eq!(last.event, "terminal");
        assert_eq!(last.from_state, EdgeState::BlockedSoft);
        assert_eq!(last.to_state, EdgeState::BlockedHard);
    }

    #[test]
    fn test_throttled_calms_back_to_neutral() {
        let mut burst = with_status(feat(), "429");
        burst.lat_drift_ratio = 1.6;
        burst.recovery = false;
        let calm = feat(); // drift 1.0, clean histogram
        let fs = feature_set(vec![
            ("baseline", feat()),
            ("soft_burst", burst),
            ("canonicalization", calm),
        ]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Neutral);
        assert_eq!(result.transitions.len(), 2);
        assert_eq!(result.transitions[1].to_state, EdgeState::Neutral);
        // escalation happened mid-run even though the run ended calm
        assert!(result.has_signal(SIG_STATEFUL_EDGE));
    }

    #[test]
    fn test_soft_block_recovery_returns_to_neutral() {
        let mut burst = with_status(feat(), "429");
        burst.lat_drift_ratio = 1.6;
        burst.recovery = false;
        let blocked = with_status(feat(), "403");
        let recovered = feat();
        let fs = feature_set(vec![
            ("baseline", feat()),
            ("soft_burst", burst),
            ("state_cookies", blocked),
            ("canonicalization", recovered),
        ]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Neutral);
        assert!(result
            .transitions
            .iter()
            .all(|t| t.event != "terminal"));
    }

    #[test]
    fn test_no_self_loops_in_trace() {
        let mut burst = with_status(feat(), "429");
        burst.lat_drift_ratio = 1.6;
        burst.recovery = false;
        let mut still_throttled = with_status(feat(), "429");
        still_throttled.lat_drift_ratio = 1.6;
        still_throttled.recovery = false;
        let fs = feature_set(vec![
            ("baseline", feat()),
            ("soft_burst", burst),
            ("canonicalization", still_throttled),
        ]);
        let result = infer(&fs);
        assert!(result
            .transitions
            .iter()
            .all(|t| t.from_state != t.to_state));
        assert_eq!(result.transitions.len(), 1);
    }

    #[test]
    fn test_only_final_state_carries_properties() {
        let mut burst = with_status(feat(), "429");
        burst.recovery = false;
        let fs = feature_set(vec![("baseline", feat()), ("soft_burst", burst)]);
        let result = infer(&fs);
        assert_eq!(result.state_properties.len(), 1);
        assert!(result
            .state_properties
            .contains_key(result.final_state.as_str()));
    }

    #[test]
    fn test_empty_feature_set_stays_neutral() {
        let fs = feature_set(vec![]);
        let result = infer(&fs);
        assert_eq!(result.final_state, EdgeState::Neutral);
        assert!(result.transitions.is_empty());
        assert!(result.signals.is_empty());
        assert!(result.state_properties.is_empty());
        assert_eq!(result.final_scope(), None);
    }
}
