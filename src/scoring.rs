// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Verdict Scoring
 * Weighted combination of sequence features and FSM signals
 *
 * Both tables below are ordered and declarative: the score is a fold over
 * SCORE_RULES (each rule fires at most once, contributions are additive),
 * and the family is the first matching entry of FAMILY_RULES.
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use serde::Serialize;

use crate::features::{FeatureSet, SequenceFeatures};
use crate::fsm::{
    EdgeState, FsmResult, Scope, SIG_ADAPTIVE_RATE_LIMIT, SIG_NON_RECOVERABLE_BLOCK,
    SIG_STATEFUL_EDGE,
};
use crate::probes::{BASELINE_SEQ, CANONICALIZATION_SEQ, SOFT_BURST_SEQ};

/// Coarse behavioral classification of the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    PolicyEnforcedEdge,
    AdaptiveRateLimit,
    ChallengeBasedEdge,
    RateLimitFocused,
    Unknown,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::PolicyEnforcedEdge => "policy_enforced_edge",
            Family::AdaptiveRateLimit => "adaptive_rate_limit",
            Family::ChallengeBasedEdge => "challenge_based_edge",
            Family::RateLimitFocused => "rate_limit_focused",
            Family::Unknown => "unknown",
        }
    }
}

/// Final weighted classification. Signals appear in rule-evaluation order.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub score: f64,
    pub signals: Vec<String>,
    pub family: Family,
}

/// Everything a rule predicate may look at, gathered once per run.
struct ScoreContext<'a> {
    fsm: &'a FsmResult,
    total_cookies: usize,
    total_errors: usize,
    burst: Option<&'a SequenceFeatures>,
    canonicalization: Option<&'a SequenceFeatures>,
    baseline_hashes: usize,
}

impl<'a> ScoreContext<'a> {
    fn new(features: &'a FeatureSet, fsm: &'a FsmResult) -> Self {
        Self {
            fsm,
            total_cookies: features.total_set_cookies(),
            total_errors: features.total_errors(),
            burst: features.get(SOFT_BURST_SEQ),
            canonicalization: features.get(CANONICALIZATION_SEQ),
            baseline_hashes: features
                .get(BASELINE_SEQ)
                .map(|f| f.unique_body_hashes)
                .unwrap_or(0),
        }
    }

    fn burst_drift(&self) -> f64 {
        self.burst.map(|f| f.lat_drift_ratio).unwrap_or(0.0)
    }

    fn burst_saw(&self, code: &str) -> bool {
        self.burst.map(|f| f.saw_status(code)).unwrap_or(false)
    }

    fn scope(&self) -> Option<Scope> {
        self.fsm.final_scope()
    }
}

struct ScoreRule {
    signal: &'static str,
    weight: f64,
    applies: fn(&ScoreContext<'_>) -> bool,
}

const SCORE_RULES: &[ScoreRule] = &[
    ScoreRule {
        signal: "cookie_activity_high",
        weight: 1.0,
        applies: |ctx| ctx.total_cookies >= 3,
    },
    ScoreRule {
        signal: "resets_or_timeouts",
        weight: 0.7,
        applies: |ctx| ctx.total_errors >= 1,
    },
    ScoreRule {
        signal: "latency_drift_on_burst",
        weight: 1.0,
        applies: |ctx| ctx.burst_drift() >= 1.5,
    },
    ScoreRule {
        signal: "rate_limit_429",
        weight: 1.2,
        applies: |ctx| ctx.burst_saw("429"),
    },
    ScoreRule {
        signal: "block_on_behavior_change",
        weight: 0.8,
        applies: |ctx| ctx.burst_saw("403") && ctx.burst_drift() >= 1.2,
    },
    ScoreRule {
        signal: "interstitial_or_rewrite_suspected",
        weight: 0.6,
        applies: |ctx| {
            let hashes = ctx
                .canonicalization
                .map(|f| f.unique_body_hashes)
                .unwrap_or(0);
            hashes >= 2 && hashes > ctx.baseline_hashes
        },
    },
    ScoreRule {
        signal: SIG_STATEFUL_EDGE,
        weight: 0.8,
        applies: |ctx| ctx.fsm.has_signal(SIG_STATEFUL_EDGE),
    },
    ScoreRule {
        signal: SIG_ADAPTIVE_RATE_LIMIT,
        weight: 1.0,
        applies: |ctx| ctx.fsm.has_signal(SIG_ADAPTIVE_RATE_LIMIT),
    },
    ScoreRule {
        signal: SIG_NON_RECOVERABLE_BLOCK,
        weight: 1.5,
        applies: |ctx| ctx.fsm.has_signal(SIG_NON_RECOVERABLE_BLOCK),
    },
    ScoreRule {
        signal: "hard_block_state",
        weight: 1.2,
        applies: |ctx| ctx.fsm.final_state == EdgeState::BlockedHard,
    },
    ScoreRule {
        signal: "connection_scoped_state",
        weight: 0.3,
        applies: |ctx| ctx.scope() == Some(Scope::ConnectionScoped),
    },
    ScoreRule {
        signal: "cookie_scoped_state",
        weight: 0.8,
        applies: |ctx| ctx.scope() == Some(Scope::CookieScoped),
    },
    ScoreRule {
        signal: "ip_scoped_state",
        weight: 1.2,
        applies: |ctx| ctx.scope() == Some(Scope::IpScoped),
    },
];

struct FamilyRule {
    family: Family,
    applies: fn(&ScoreContext<'_>, &[String]) -> bool,
}

const FAMILY_RULES: &[FamilyRule] = &[
    FamilyRule {
        family: Family::PolicyEnforcedEdge,
        applies: |ctx, _| {
            matches!(
                ctx.fsm.final_state,
                EdgeState::BlockedHard | EdgeState::BlockedSoft
            )
        },
    },
    FamilyRule {
        family: Family::AdaptiveRateLimit,
        applies: |_, signals| signals.iter().any(|s| s == SIG_ADAPTIVE_RATE_LIMIT),
    },
    FamilyRule {
        family: Family::ChallengeBasedEdge,
        applies: |ctx, _| ctx.fsm.final_state == EdgeState::Challenged,
    },
    FamilyRule {
        family: Family::RateLimitFocused,
        applies: |_, signals| signals.iter().any(|s| s == "rate_limit_429"),
    },
];

/// Fold the rule tables into an immutable Verdict.
pub fn score(features: &FeatureSet, fsm: &FsmResult) -> Verdict {
    let ctx = ScoreContext::new(features, fsm);

    let (score, signals) = SCORE_RULES.iter().fold(
        (0.0_f64, Vec::with_capacity(SCORE_RULES.len())),
        |(total, mut fired), rule| {
            if (rule.applies)(&ctx) {
                fired.push(rule.signal.to_string());
                (total + rule.weight, fired)
            } else {
                (total, fired)
            }
        },
    );

    let family = FAMILY_RULES
        .iter()
        .find(|rule| (rule.applies)(&ctx, &signals))
        .map(|rule| rule.family)
        .unwrap_or(Family::Unknown);

    Verdict {
        score,
        signals,
        family,
    }
}
