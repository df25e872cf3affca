// DepSleuth - core/resolution.rs
//
// Conflict resolution: claims that describe the same edge are fused into a
// single canonical claim.
//
// Ranking is lexicographic over three signals, computed by `weight`:
//   1. source rank (configured authority order)
//   2. recency-decayed confidence
//   3. raw confidence
// Remaining ties go to the claim seen first in the input.

use crate::core::model::{Claim, ConfidenceScore, SourceType};
use crate::util::constants;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

// =============================================================================
// Configuration
// =============================================================================

/// Exponential recency decay.
///
/// A claim's age is measured against the newest claim of its group. The
/// first `min_gap_hours` of age are free; beyond that, confidence halves
/// every `half_life_hours`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecencyConfig {
    pub half_life_hours: f64,
    pub min_gap_hours: f64,
}

impl RecencyConfig {
    /// Decay factor in `(0, 1]` for a claim `age` older than the newest.
    pub fn decay(&self, age: Duration) -> f64 {
        let age_hours = age.num_seconds().max(0) as f64 / 3600.0;
        let effective = (age_hours - self.min_gap_hours).max(0.0);
        if effective == 0.0 || self.half_life_hours <= 0.0 {
            return 1.0;
        }
        0.5_f64.powf(effective / self.half_life_hours)
    }
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            half_life_hours: constants::DEFAULT_RECENCY_HALF_LIFE_HOURS,
            min_gap_hours: constants::DEFAULT_RECENCY_MIN_GAP_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Source authority, most trusted first.
    pub priority: Vec<SourceType>,
    pub recency: RecencyConfig,
    /// Confidence assumed for unscored claims.
    pub default_confidence: f64,
}

impl FusionConfig {
    /// Authority of `source`; higher wins. Sources absent from the priority
    /// list rank below all listed ones.
    pub fn rank(&self, source: SourceType) -> u32 {
        self.priority
            .iter()
            .position(|s| *s == source)
            .map_or(0, |index| (self.priority.len() - index) as u32)
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            priority: SourceType::evidence_sources().to_vec(),
            recency: RecencyConfig::default(),
            default_confidence: constants::DEFAULT_FUSION_CONFIDENCE,
        }
    }
}

// =============================================================================
// Weighting
// =============================================================================

/// Ranking key of one claim within its group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeight {
    pub source_rank: u32,
    /// Confidence after recency decay.
    pub effective: f64,
    pub confidence: f64,
}

impl FusionWeight {
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.source_rank
            .cmp(&other.source_rank)
            .then_with(|| self.effective.total_cmp(&other.effective))
            .then_with(|| self.confidence.total_cmp(&other.confidence))
    }
}

impl PartialOrd for FusionWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_cmp(other))
    }
}

/// Combine source rank, age and confidence into a ranking key.
pub fn weight(
    confidence: f64,
    age: Duration,
    source_rank: u32,
    recency: &RecencyConfig,
) -> FusionWeight {
    FusionWeight {
        source_rank,
        effective: confidence * recency.decay(age),
        confidence,
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ConflictResolutionEngine {
    config: FusionConfig,
}

impl ConflictResolutionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Group by edge key, fuse groups of more than one claim, and return
    /// the results in the order each edge key first appeared.
    pub fn resolve_claims<I>(&self, claims: I) -> Vec<Claim>
    where
        I: IntoIterator<Item = Claim>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Claim>> = HashMap::new();
        let mut input_count = 0usize;

        for claim in claims {
            input_count += 1;
            let key = claim.processed_data().to_string();
            match groups.get_mut(&key) {
                Some(group) => group.push(claim),
                None => {
                    order.push(key.clone());
                    groups.insert(key, vec![claim]);
                }
            }
        }

        let mut resolved = Vec::with_capacity(order.len());
        let mut fused_groups = 0usize;
        for key in order {
            let Some(mut group) = groups.remove(&key) else {
                continue;
            };
            if group.len() == 1 {
                resolved.extend(group.pop());
            } else {
                fused_groups += 1;
                resolved.extend(self.fuse(&group).map(|c| self.apply_business_rules(c)));
            }
        }

        if input_count > 0 {
            tracing::info!(
                input = input_count,
                edges = resolved.len(),
                fused = fused_groups,
                "Conflict resolution complete"
            );
        }
        resolved
    }

    /// Fuse a group of claims for one edge into a `CONFLICT_RESOLVED` claim.
    /// `None` only for an empty group.
    pub fn fuse(&self, group: &[Claim]) -> Option<Claim> {
        let newest = group.iter().map(Claim::timestamp).max()?;

        let mut winner: Option<(&Claim, FusionWeight)> = None;
        for claim in group {
            let w = self.weigh(claim, newest);
            // Strictly greater only: equal weights keep the earlier claim.
            if winner.map_or(true, |(_, best)| w.total_cmp(&best) == Ordering::Greater) {
                winner = Some((claim, w));
            }
        }
        let (winner, _) = winner?;

        let confidence = winner
            .confidence_score()
            .unwrap_or_else(|| ConfidenceScore::saturating(self.config.default_confidence));
        let losers: Vec<&str> = group
            .iter()
            .filter(|c| !std::ptr::eq(*c, winner))
            .map(Claim::id)
            .collect();

        tracing::debug!(
            edge = winner.processed_data(),
            winner = winner.id(),
            winner_source = %winner.source_type(),
            group_size = group.len(),
            losers = ?losers,
            "Fused conflicting claims"
        );

        Some(Claim::resolved_from(winner, confidence))
    }

    /// Hook for manual overrides. Currently the identity.
    pub fn apply_business_rules(&self, claim: Claim) -> Claim {
        claim
    }

    fn weigh(&self, claim: &Claim, newest: DateTime<Utc>) -> FusionWeight {
        let confidence = claim
            .confidence_score()
            .map_or(self.config.default_confidence, |c| c.value());
        weight(
            confidence,
            newest - claim.timestamp(),
            self.config.rank(claim.source_type()),
            &self.config.recency,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap()
    }

    fn claim(id: &str, source: SourceType, edge: &str, conf: Option<f64>, at: DateTime<Utc>) -> Claim {
        let c = Claim::new(id, source, format!("raw {id}"), edge, at).unwrap();
        match conf {
            Some(v) => c.with_confidence(ConfidenceScore::new(v).unwrap()),
            None => c,
        }
    }

    #[test]
    fn test_empty_input() {
        let engine = ConflictResolutionEngine::default();
        assert!(engine.resolve_claims(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_claim_is_identity() {
        let engine = ConflictResolutionEngine::default();
        let c = claim("c1", SourceType::Network, "a -> b", None, now());
        assert_eq!(engine.resolve_claims(vec![c.clone()]), vec![c]);
    }

    #[test]
    fn test_disjoint_edges_pass_through() {
        let engine = ConflictResolutionEngine::default();
        let ab = claim("c1", SourceType::RouterLog, "app-a -> app-b", Some(0.65), now());
        let cd = claim("c2", SourceType::Codebase, "app-c -> app-d", Some(0.8), now());
        let out = engine.resolve_claims(vec![ab.clone(), cd.clone()]);
        assert_eq!(out, vec![ab, cd]);
    }

    #[test]
    fn test_source_priority_beats_confidence() {
        let engine = ConflictResolutionEngine::default();
        let edge = "user-service -> database";
        let code = claim("codebase_1", SourceType::Codebase, edge, Some(0.95), now());
        let router = claim("router_1", SourceType::RouterLog, edge, Some(0.85), now());
        let out = engine.resolve_claims(vec![router, code]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_type(), SourceType::ConflictResolved);
        assert!(out[0].id().contains("codebase_1"));
        assert_eq!(out[0].processed_data(), edge);
        assert_eq!(out[0].raw_data(), "raw codebase_1");
        assert_eq!(out[0].confidence_score().unwrap().value(), 0.95);
    }

    #[test]
    fn test_lower_ranked_source_loses_even_with_higher_confidence() {
        let engine = ConflictResolutionEngine::default();
        let code = claim("c1", SourceType::Codebase, "a -> b", Some(0.3), now());
        let net = claim("n1", SourceType::Network, "a -> b", Some(1.0), now());
        assert_eq!(engine.resolve_claims(vec![net, code])[0].id(), "resolved_c1");
    }

    #[test]
    fn test_recent_claim_beats_older_higher_confidence() {
        let engine = ConflictResolutionEngine::default();
        let recent = claim("recent", SourceType::RouterLog, "app-x -> app-y", Some(0.80), now());
        let old = claim(
            "old",
            SourceType::RouterLog,
            "app-x -> app-y",
            Some(0.85),
            now() - Duration::hours(48),
        );
        let out = engine.resolve_claims(vec![old, recent]);
        assert_eq!(out.len(), 1);
        assert!(out[0].id().contains("recent"));
        assert_eq!(out[0].timestamp(), now());
    }

    #[test]
    fn test_small_age_gap_does_not_override_confidence() {
        let engine = ConflictResolutionEngine::default();
        let recent = claim("recent", SourceType::RouterLog, "x -> y", Some(0.80), now());
        let old = claim("old", SourceType::RouterLog, "x -> y", Some(0.85), now() - Duration::hours(6));
        assert!(engine.resolve_claims(vec![recent, old])[0].id().contains("old"));
    }

    #[test]
    fn test_exact_tie_keeps_first() {
        let engine = ConflictResolutionEngine::default();
        let first = claim("first", SourceType::Telemetry, "x -> y", Some(0.5), now());
        let second = claim("second", SourceType::Telemetry, "x -> y", Some(0.5), now());
        assert_eq!(engine.resolve_claims(vec![first, second])[0].id(), "resolved_first");
    }

    #[test]
    fn test_output_confidence_defaults_when_missing() {
        let engine = ConflictResolutionEngine::default();
        let a = claim("a", SourceType::CiCd, "x -> y", None, now());
        let b = claim("b", SourceType::CiCd, "x -> y", None, now());
        let out = engine.resolve_claims(vec![a, b]);
        assert_eq!(out[0].confidence_score().unwrap().value(), 0.5);
    }

    #[test]
    fn test_order_follows_first_appearance() {
        let engine = ConflictResolutionEngine::default();
        let out = engine.resolve_claims(vec![
            claim("1", SourceType::Network, "b -> c", None, now()),
            claim("2", SourceType::Network, "a -> b", None, now()),
            claim("3", SourceType::Codebase, "b -> c", None, now()),
            claim("4", SourceType::Network, "z -> z2", None, now()),
        ]);
        let edges: Vec<&str> = out.iter().map(Claim::processed_data).collect();
        assert_eq!(edges, vec!["b -> c", "a -> b", "z -> z2"]);
        assert_eq!(out[0].id(), "resolved_3");
        assert_eq!(out[1].id(), "2");
    }

    #[test]
    fn test_custom_priority_order() {
        let engine = ConflictResolutionEngine::new(FusionConfig {
            priority: vec![SourceType::Network, SourceType::Codebase],
            ..FusionConfig::default()
        });
        let code = claim("c", SourceType::Codebase, "a -> b", Some(0.9), now());
        let net = claim("n", SourceType::Network, "a -> b", Some(0.1), now());
        let tel = claim("t", SourceType::Telemetry, "a -> b", Some(1.0), now());
        assert_eq!(engine.resolve_claims(vec![tel, code, net])[0].id(), "resolved_n");
    }

    #[test]
    fn test_rank_order() {
        let config = FusionConfig::default();
        assert!(config.rank(SourceType::Codebase) > config.rank(SourceType::RouterLog));
        assert!(config.rank(SourceType::RouterLog) > config.rank(SourceType::ApiGateway));
        assert!(config.rank(SourceType::ApiGateway) > config.rank(SourceType::CiCd));
        assert!(config.rank(SourceType::CiCd) > config.rank(SourceType::Telemetry));
        assert!(config.rank(SourceType::Telemetry) > config.rank(SourceType::Network));
        assert_eq!(config.rank(SourceType::ConflictResolved), 0);
    }

    #[test]
    fn test_weight_function() {
        let recency = RecencyConfig::default();
        let fresh = weight(0.8, Duration::zero(), 5, &recency);
        assert_eq!(fresh.effective, 0.8);

        let within_gap = weight(0.8, Duration::hours(20), 5, &recency);
        assert_eq!(within_gap.effective, 0.8);

        let two_days = weight(0.8, Duration::hours(48), 5, &recency);
        assert!((two_days.effective - 0.4).abs() < 1e-9);
        assert_eq!(two_days.confidence, 0.8);

        assert!(fresh > two_days);
        assert!(weight(0.1, Duration::hours(500), 6, &recency) > fresh);
    }

    #[test]
    fn test_decay_tunable() {
        let fast = RecencyConfig {
            half_life_hours: 1.0,
            min_gap_hours: 0.0,
        };
        assert!((fast.decay(Duration::hours(2)) - 0.25).abs() < 1e-9);
        assert_eq!(fast.decay(Duration::hours(-3)), 1.0);
    }

    #[test]
    fn test_resolving_twice_is_stable() {
        let engine = ConflictResolutionEngine::default();
        let a = claim("a", SourceType::Codebase, "x -> y", Some(0.8), now());
        let b = claim("b", SourceType::RouterLog, "x -> y", Some(0.65), now());
        let first = engine.resolve_claims(vec![a, b]);
        let again = engine.resolve_claims(first.clone());
        assert_eq!(first, again);
    }
}
