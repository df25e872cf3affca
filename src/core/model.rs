// DepSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::ClaimError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Source type
// =============================================================================

/// Origin category of a claim.
///
/// The six evidence categories form a closed set. `ConflictResolved` is
/// synthetic: only the conflict-resolution engine emits it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Codebase,
    RouterLog,
    ApiGateway,
    CiCd,
    Telemetry,
    Network,
    ConflictResolved,
}

impl SourceType {
    /// The evidence categories in default authority order (most trusted first).
    pub fn evidence_sources() -> &'static [SourceType] {
        &[
            SourceType::Codebase,
            SourceType::RouterLog,
            SourceType::ApiGateway,
            SourceType::CiCd,
            SourceType::Telemetry,
            SourceType::Network,
        ]
    }

    /// Wire tag, identical to the serialised form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Codebase => "CODEBASE",
            SourceType::RouterLog => "ROUTER_LOG",
            SourceType::ApiGateway => "API_GATEWAY",
            SourceType::CiCd => "CI_CD",
            SourceType::Telemetry => "TELEMETRY",
            SourceType::Network => "NETWORK",
            SourceType::ConflictResolved => "CONFLICT_RESOLVED",
        }
    }

    /// True for the six categories an adapter can produce.
    pub fn is_evidence(&self) -> bool {
        !matches!(self, SourceType::ConflictResolved)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ClaimError;

    /// Accepts the wire tag case-insensitively, with `-` in place of `_`
    /// (so `router-log` and `ROUTER_LOG` are the same).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase().replace('-', "_");
        match tag.as_str() {
            "CODEBASE" => Ok(SourceType::Codebase),
            "ROUTER_LOG" => Ok(SourceType::RouterLog),
            "API_GATEWAY" => Ok(SourceType::ApiGateway),
            "CI_CD" | "CICD" => Ok(SourceType::CiCd),
            "TELEMETRY" => Ok(SourceType::Telemetry),
            "NETWORK" => Ok(SourceType::Network),
            "CONFLICT_RESOLVED" => Ok(SourceType::ConflictResolved),
            _ => Err(ClaimError::UnknownSourceType {
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Confidence score
// =============================================================================

/// Reliability of a claim, confined to `[0, 1]` at construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    /// Create a score, rejecting values outside `[0, 1]` and NaN.
    pub fn new(value: f64) -> Result<Self, ClaimError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ClaimError::ConfidenceOutOfRange { value })
        }
    }

    /// Create a score, clamping into `[0, 1]`. NaN maps to 0.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = ClaimError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// =============================================================================
// Edge key
// =============================================================================

/// A directed edge between two applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Canonical `"<source> -> <target>"` key shared by adapters and fusion.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.source, constants::EDGE_SEPARATOR, self.target)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source, constants::EDGE_SEPARATOR, self.target)
    }
}

// =============================================================================
// Claim
// =============================================================================

/// A single piece of evidence for one directed edge.
///
/// Claims are immutable: fields are private and every transformation
/// returns a new value. Mandatory fields are enforced by [`Claim::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClaimDraft")]
pub struct Claim {
    id: String,
    source_type: SourceType,
    raw_data: String,
    processed_data: String,
    timestamp: DateTime<Utc>,
    confidence_score: Option<ConfidenceScore>,
}

impl Claim {
    /// Build an unscored claim. Empty `id`, `raw_data` or `processed_data`
    /// count as missing.
    pub fn new(
        id: impl Into<String>,
        source_type: SourceType,
        raw_data: impl Into<String>,
        processed_data: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let id = id.into();
        let raw_data = raw_data.into();
        let processed_data = processed_data.into();

        let claim_id = (!id.trim().is_empty()).then(|| id.clone());
        let missing = |field| ClaimError::MissingField {
            claim_id: claim_id.clone(),
            field,
        };
        if id.trim().is_empty() {
            return Err(missing("id"));
        }
        if raw_data.is_empty() {
            return Err(missing("raw_data"));
        }
        if processed_data.trim().is_empty() {
            return Err(missing("processed_data"));
        }

        Ok(Self {
            id,
            source_type,
            raw_data,
            processed_data,
            timestamp,
            confidence_score: None,
        })
    }

    /// Fused output for a group whose winner is `winner`.
    ///
    /// Inputs come from an already valid claim, so no re-validation is needed.
    pub(crate) fn resolved_from(winner: &Claim, confidence: ConfidenceScore) -> Self {
        Self {
            id: format!("{}_{}", constants::RESOLVED_ID_PREFIX, winner.id),
            source_type: SourceType::ConflictResolved,
            raw_data: winner.raw_data.clone(),
            processed_data: winner.processed_data.clone(),
            timestamp: winner.timestamp,
            confidence_score: Some(confidence),
        }
    }

    /// A copy of this claim carrying `score`.
    pub fn with_confidence(mut self, score: ConfidenceScore) -> Self {
        self.confidence_score = Some(score);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    /// The edge key, `"<source> -> <target>"`.
    pub fn processed_data(&self) -> &str {
        &self.processed_data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn confidence_score(&self) -> Option<ConfidenceScore> {
        self.confidence_score
    }
}

// =============================================================================
// Claim draft (unchecked external shape)
// =============================================================================

/// A claim as received from outside the crate, before validation.
///
/// Every field is optional so that incomplete records can be reported
/// precisely instead of failing deserialisation wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimDraft {
    pub id: Option<String>,
    pub source_type: Option<String>,
    pub raw_data: Option<String>,
    pub processed_data: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub confidence_score: Option<f64>,
}

impl ClaimDraft {
    /// First mandatory field that is absent or empty, in declaration order.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }
        if blank(&self.id) {
            Some("id")
        } else if blank(&self.source_type) {
            Some("source_type")
        } else if self.raw_data.as_deref().map_or(true, str::is_empty) {
            Some("raw_data")
        } else if blank(&self.processed_data) {
            Some("processed_data")
        } else if self.timestamp.is_none() {
            Some("timestamp")
        } else {
            None
        }
    }
}

impl TryFrom<ClaimDraft> for Claim {
    type Error = ClaimError;

    fn try_from(draft: ClaimDraft) -> Result<Self, Self::Error> {
        let present = |v: &String| !v.trim().is_empty();
        let claim_id = draft.id.clone().filter(present);
        let missing = |field| ClaimError::MissingField {
            claim_id: claim_id.clone(),
            field,
        };

        let id = draft.id.filter(present).ok_or_else(|| missing("id"))?;
        let source = draft
            .source_type
            .filter(present)
            .ok_or_else(|| missing("source_type"))?;
        let raw = draft
            .raw_data
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing("raw_data"))?;
        let processed = draft
            .processed_data
            .filter(present)
            .ok_or_else(|| missing("processed_data"))?;
        let timestamp = draft.timestamp.ok_or_else(|| missing("timestamp"))?;

        let source_type: SourceType = source.parse()?;
        let claim = Claim::new(id, source_type, raw, processed, timestamp)?;
        match draft.confidence_score {
            Some(value) => Ok(claim.with_confidence(ConfidenceScore::new(value)?)),
            None => Ok(claim),
        }
    }
}

impl From<Claim> for ClaimDraft {
    fn from(claim: Claim) -> Self {
        Self {
            id: Some(claim.id),
            source_type: Some(claim.source_type.as_str().to_string()),
            raw_data: Some(claim.raw_data),
            processed_data: Some(claim.processed_data),
            timestamp: Some(claim.timestamp),
            confidence_score: claim.confidence_score.map(f64::from),
        }
    }
}

// =============================================================================
// Parsed event (intermediate adapter record)
// =============================================================================

/// One grammar match, before it becomes a [`Claim`].
///
/// Ephemeral: exists only between a grammar's pattern match and the
/// adapter's claim conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedEvent {
    /// Parsed observation time. `None` when the line carried no timestamp or
    /// it could not be parsed; the adapter then falls back.
    pub timestamp: Option<DateTime<Utc>>,

    /// Calling side of the edge.
    pub upstream: String,

    /// Called side of the edge. Some platforms derive it after matching.
    pub downstream: Option<String>,

    /// Action or method (HTTP method, pipeline step, protocol, ...).
    pub action: Option<String>,

    /// Outcome (HTTP status, build result, firewall verdict, ...).
    pub status: Option<String>,

    /// Id of the grammar that matched.
    pub platform: String,

    /// The original line.
    pub raw_line: String,

    /// Any further named captures (endpoint, latency_ms, user_agent, ...).
    pub fields: HashMap<String, String>,
}

impl ParsedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap()
    }

    #[test]
    fn test_source_type_wire_tags() {
        assert_eq!(
            serde_json::to_string(&SourceType::CiCd).unwrap(),
            "\"CI_CD\""
        );
        assert_eq!(
            serde_json::to_string(&SourceType::ConflictResolved).unwrap(),
            "\"CONFLICT_RESOLVED\""
        );
        for source in SourceType::evidence_sources() {
            assert_eq!(source.as_str().parse::<SourceType>().unwrap(), *source);
        }
    }

    #[test]
    fn test_source_type_parse_accepts_kebab_case() {
        assert_eq!(
            "router-log".parse::<SourceType>().unwrap(),
            SourceType::RouterLog
        );
        assert!("FAX".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(ConfidenceScore::new(0.0).is_ok());
        assert!(ConfidenceScore::new(1.0).is_ok());
        assert!(matches!(
            ConfidenceScore::new(1.01),
            Err(ClaimError::ConfidenceOutOfRange { .. })
        ));
        assert!(ConfidenceScore::new(-0.1).is_err());
        assert!(ConfidenceScore::new(f64::NAN).is_err());
        assert_eq!(ConfidenceScore::saturating(1.7).value(), 1.0);
    }

    #[test]
    fn test_confidence_deserialise_rejects_out_of_range() {
        assert!(serde_json::from_str::<ConfidenceScore>("0.4").is_ok());
        assert!(serde_json::from_str::<ConfidenceScore>("4.0").is_err());
    }

    #[test]
    fn test_edge_key_uses_exact_separator() {
        let edge = Edge::new("user-service", "database");
        assert_eq!(edge.key(), "user-service -> database");
        assert_eq!(edge.to_string(), edge.key());
    }

    #[test]
    fn test_claim_new_rejects_missing_fields() {
        let err = Claim::new("", SourceType::Codebase, "raw", "a -> b", ts()).unwrap_err();
        assert_eq!(
            err,
            ClaimError::MissingField {
                claim_id: None,
                field: "id"
            }
        );

        let err = Claim::new("c1", SourceType::Codebase, "raw", "  ", ts()).unwrap_err();
        assert!(matches!(
            err,
            ClaimError::MissingField {
                field: "processed_data",
                ..
            }
        ));
    }

    #[test]
    fn test_with_confidence_returns_new_value() {
        let claim = Claim::new("c1", SourceType::RouterLog, "raw", "a -> b", ts()).unwrap();
        let scored = claim.clone().with_confidence(ConfidenceScore::new(0.7).unwrap());
        assert!(claim.confidence_score().is_none());
        assert_eq!(scored.confidence_score().unwrap().value(), 0.7);
        assert_eq!(scored.id(), claim.id());
    }

    #[test]
    fn test_draft_round_trip_through_claim() {
        let claim = Claim::new("c1", SourceType::Network, "raw", "a -> b", ts())
            .unwrap()
            .with_confidence(ConfidenceScore::new(0.3).unwrap());
        let draft = ClaimDraft::from(claim.clone());
        assert_eq!(Claim::try_from(draft).unwrap(), claim);
    }

    #[test]
    fn test_empty_draft_reports_id_first() {
        let err = Claim::try_from(ClaimDraft::default()).unwrap_err();
        assert!(matches!(err, ClaimError::MissingField { field: "id", .. }));
    }

    #[test]
    fn test_draft_with_unknown_source_type() {
        let draft = ClaimDraft {
            id: Some("x".into()),
            source_type: Some("CARRIER_PIGEON".into()),
            raw_data: Some("raw".into()),
            processed_data: Some("a -> b".into()),
            timestamp: Some(ts()),
            confidence_score: None,
        };
        assert!(matches!(
            Claim::try_from(draft),
            Err(ClaimError::UnknownSourceType { .. })
        ));
    }

    #[test]
    fn test_claim_json_shape() {
        let claim = Claim::new("c1", SourceType::ApiGateway, "raw", "a -> b", ts())
            .unwrap()
            .with_confidence(ConfidenceScore::new(0.6).unwrap());
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["source_type"], "API_GATEWAY");
        assert_eq!(json["processed_data"], "a -> b");
        assert_eq!(json["confidence_score"], 0.6);

        let back: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(back, claim);
    }

    #[test]
    fn test_claim_json_missing_field_is_rejected() {
        let json = r#"{"id": "c1", "source_type": "CODEBASE", "raw_data": "x"}"#;
        assert!(serde_json::from_str::<Claim>(json).is_err());
    }
}
