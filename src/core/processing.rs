// DepSleuth - core/processing.rs
//
// Uniform claim pipeline between the adapters and fusion:
// validate -> normalize -> score, applied the same way to every origin.

use crate::core::model::{Claim, ClaimDraft, ConfidenceScore, SourceType};
use crate::util::constants;
use crate::util::error::ClaimError;
use std::collections::HashMap;

/// Scoring table: `base + boost(source_type)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub base: f64,
    /// Per-source boost. Sources without an entry get `0.0`.
    pub boosts: HashMap<SourceType, f64>,
}

impl ScoringConfig {
    pub fn boost(&self, source: SourceType) -> f64 {
        self.boosts.get(&source).copied().unwrap_or(0.0)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: constants::DEFAULT_SCORE_BASE,
            boosts: HashMap::from([
                (SourceType::Codebase, constants::DEFAULT_CODEBASE_BOOST),
                (SourceType::RouterLog, constants::DEFAULT_ROUTER_LOG_BOOST),
                (SourceType::ApiGateway, constants::DEFAULT_API_GATEWAY_BOOST),
            ]),
        }
    }
}

/// Validates, normalizes and scores claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimProcessingEngine {
    scoring: ScoringConfig,
}

impl ClaimProcessingEngine {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Check that every mandatory field is present, the source type is an
    /// evidence category and the optional confidence, if given, lies in
    /// `[0, 1]`.
    pub fn validate(&self, draft: &ClaimDraft) -> Result<(), ClaimError> {
        if let Some(field) = draft.first_missing_field() {
            return Err(ClaimError::MissingField {
                claim_id: draft.id.clone().filter(|id| !id.trim().is_empty()),
                field,
            });
        }
        if let Some(raw) = &draft.source_type {
            let source = raw.parse::<SourceType>()?;
            if !source.is_evidence() {
                return Err(ClaimError::ReservedSourceType {
                    value: source.to_string(),
                });
            }
        }
        if let Some(value) = draft.confidence_score {
            ConfidenceScore::new(value)?;
        }
        Ok(())
    }

    /// Currently the identity.
    pub fn normalize(&self, claim: Claim) -> Claim {
        claim
    }

    /// A copy of `claim` carrying `base + boost`, clamped into `[0, 1]`.
    /// Replaces any confidence the adapter seeded.
    pub fn score(&self, claim: &Claim) -> Claim {
        let value = self.scoring.base + self.scoring.boost(claim.source_type());
        claim.clone().with_confidence(ConfidenceScore::saturating(value))
    }

    /// Validate, normalize and score every claim, preserving order.
    ///
    /// All-or-nothing: the first invalid claim fails the whole batch.
    pub fn process_claims<I, C>(&self, claims: I) -> Result<Vec<Claim>, ClaimError>
    where
        I: IntoIterator<Item = C>,
        C: Into<ClaimDraft>,
    {
        let processed = claims
            .into_iter()
            .enumerate()
            .map(|(index, claim)| -> Result<Claim, ClaimError> {
                let draft: ClaimDraft = claim.into();
                self.validate(&draft).map_err(|e| {
                    tracing::warn!(index, error = %e, "Invalid claim, batch rejected");
                    e
                })?;
                let claim = Claim::try_from(draft)?;
                Ok(self.score(&self.normalize(claim)))
            })
            .collect::<Result<Vec<_>, ClaimError>>()?;

        tracing::debug!(count = processed.len(), "Claims processed");
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn claim(id: &str, source: SourceType) -> Claim {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap();
        Claim::new(id, source, "raw line", "a -> b", ts).unwrap()
    }

    fn scored(source: SourceType) -> f64 {
        ClaimProcessingEngine::default()
            .score(&claim("c1", source))
            .confidence_score()
            .unwrap()
            .value()
    }

    #[test]
    fn test_default_scores() {
        assert!((scored(SourceType::Codebase) - 0.80).abs() < 1e-4);
        assert!((scored(SourceType::RouterLog) - 0.65).abs() < 1e-4);
        assert!((scored(SourceType::ApiGateway) - 0.60).abs() < 1e-4);
        assert!((scored(SourceType::CiCd) - 0.50).abs() < 1e-4);
        assert!((scored(SourceType::Telemetry) - 0.50).abs() < 1e-4);
        assert!((scored(SourceType::Network) - 0.50).abs() < 1e-4);
    }

    #[test]
    fn test_score_is_deterministic_and_pure() {
        let engine = ClaimProcessingEngine::default();
        let input = claim("c1", SourceType::Codebase);
        let first = engine.score(&input);
        let second = engine.score(&input);
        assert_eq!(first.confidence_score(), second.confidence_score());
        assert!(input.confidence_score().is_none());
        assert_eq!(first.id(), input.id());
    }

    #[test]
    fn test_score_supersedes_seeded_confidence() {
        let seeded = claim("c1", SourceType::ApiGateway)
            .with_confidence(ConfidenceScore::new(0.9).unwrap());
        let out = ClaimProcessingEngine::default().score(&seeded);
        assert!((out.confidence_score().unwrap().value() - 0.60).abs() < 1e-4);
    }

    #[test]
    fn test_configured_boosts_are_clamped() {
        let engine = ClaimProcessingEngine::new(ScoringConfig {
            base: 0.9,
            boosts: HashMap::from([(SourceType::Network, 0.4)]),
        });
        let out = engine.score(&claim("c1", SourceType::Network));
        assert_eq!(out.confidence_score().unwrap().value(), 1.0);
    }

    #[test]
    fn test_validate_all_missing() {
        let engine = ClaimProcessingEngine::default();
        let err = engine.validate(&ClaimDraft::default()).unwrap_err();
        assert!(matches!(err, ClaimError::MissingField { claim_id: None, .. }));
    }

    #[test]
    fn test_validate_reports_missing_timestamp_with_id() {
        let mut draft = ClaimDraft::from(claim("c7", SourceType::Codebase));
        draft.timestamp = None;
        let err = ClaimProcessingEngine::default().validate(&draft).unwrap_err();
        assert_eq!(
            err,
            ClaimError::MissingField {
                claim_id: Some("c7".into()),
                field: "timestamp"
            }
        );
    }

    #[test]
    fn test_validate_accepts_complete_claim() {
        let draft = ClaimDraft::from(claim("c1", SourceType::Telemetry));
        assert!(ClaimProcessingEngine::default().validate(&draft).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let mut draft = ClaimDraft::from(claim("c1", SourceType::Telemetry));
        draft.confidence_score = Some(1.5);
        assert!(matches!(
            ClaimProcessingEngine::default().validate(&draft),
            Err(ClaimError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_fused_source_type() {
        let mut draft = ClaimDraft::from(claim("x", SourceType::Network));
        draft.source_type = Some("CONFLICT_RESOLVED".into());
        draft.confidence_score = Some(0.99);
        assert_eq!(
            ClaimProcessingEngine::default().validate(&draft),
            Err(ClaimError::ReservedSourceType {
                value: "CONFLICT_RESOLVED".into()
            })
        );

        let result = ClaimProcessingEngine::default()
            .process_claims(vec![draft, ClaimDraft::from(claim("y", SourceType::Network))]);
        assert!(matches!(result, Err(ClaimError::ReservedSourceType { .. })));
    }

    #[test]
    fn test_process_claims_preserves_order() {
        let engine = ClaimProcessingEngine::default();
        let out = engine
            .process_claims(vec![
                claim("c1", SourceType::Network),
                claim("c2", SourceType::Codebase),
                claim("c3", SourceType::RouterLog),
            ])
            .unwrap();
        let ids: Vec<&str> = out.iter().map(Claim::id).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(out.iter().all(|c| c.confidence_score().is_some()));
    }

    #[test]
    fn test_process_claims_is_all_or_nothing() {
        let engine = ClaimProcessingEngine::default();
        let good = ClaimDraft::from(claim("c1", SourceType::Codebase));
        let mut bad = good.clone();
        bad.processed_data = None;
        let result = engine.process_claims(vec![good.clone(), bad, good]);
        assert!(matches!(
            result,
            Err(ClaimError::MissingField {
                field: "processed_data",
                ..
            })
        ));
    }

    #[test]
    fn test_process_empty_batch() {
        let out = ClaimProcessingEngine::default()
            .process_claims(Vec::<Claim>::new())
            .unwrap();
        assert!(out.is_empty());
    }
}
