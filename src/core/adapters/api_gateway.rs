// DepSleuth - core/adapters/api_gateway.rs
//
// API gateway access records. Gateways log the calling client and the
// request, but rarely the backend service, so the callee is derived from
// the request path (or, failing that, the user agent).

use crate::core::adapter::SourceAdapter;
use crate::core::grammar::{builtin_catalog, GrammarSet};
use crate::core::model::{ConfidenceScore, ParsedEvent, SourceType};
use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

const KNOWN_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Path segments that never name a service.
const NOISE_SEGMENTS: &[&str] = &["api", "rest", "service", "services"];

#[derive(Debug, Clone)]
pub struct ApiGatewayAdapter {
    grammars: GrammarSet,
}

impl ApiGatewayAdapter {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }
}

impl Default for ApiGatewayAdapter {
    fn default() -> Self {
        Self::new(builtin_catalog().for_source(SourceType::ApiGateway))
    }
}

impl SourceAdapter for ApiGatewayAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::ApiGateway
    }

    fn id_prefix(&self) -> &'static str {
        "apigw"
    }

    fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    /// Fill in the callee when the record does not name it. Never drops a
    /// record: the last resort is the `unknown-service` sentinel.
    fn refine(&self, mut event: ParsedEvent) -> Option<ParsedEvent> {
        if event.downstream.is_none() {
            let derived = event
                .field("endpoint")
                .and_then(service_from_path)
                .or_else(|| event.field("user_agent").and_then(service_from_user_agent))
                .unwrap_or_else(|| constants::UNKNOWN_SERVICE.to_string());
            event.downstream = Some(derived);
        }
        Some(event)
    }

    fn seed_confidence(&self, event: &ParsedEvent) -> Option<ConfidenceScore> {
        let method_known = event
            .action
            .as_deref()
            .is_some_and(|m| KNOWN_METHODS.contains(&m.to_ascii_uppercase().as_str()));
        let path_known = event.field("endpoint").and_then(service_from_path).is_some();
        let latency_ms = event
            .field("latency_ms")
            .and_then(|raw| raw.trim().trim_end_matches("ms").parse::<f64>().ok());

        let seeded = if !method_known || !path_known {
            constants::GATEWAY_CONFIDENCE_LOW
        } else {
            match latency_ms {
                None => constants::GATEWAY_CONFIDENCE_NO_LATENCY,
                Some(ms) if ms < constants::GATEWAY_TOO_FAST_MS => {
                    constants::GATEWAY_CONFIDENCE_TOO_FAST
                }
                Some(ms) if ms > constants::GATEWAY_VERY_SLOW_MS => {
                    constants::GATEWAY_CONFIDENCE_SLOW
                }
                Some(_) => constants::GATEWAY_CONFIDENCE_HIGH,
            }
        };
        Some(ConfidenceScore::saturating(seeded))
    }
}

/// Service named by the first meaningful path segment:
/// `/api/v1/users/42` is `users-service`.
///
/// Skips empty segments, `api`/`rest`, version tokens (`v1`, `v2.1`),
/// numeric ids and UUIDs.
pub fn service_from_path(path: &str) -> Option<String> {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    path.split('/')
        .map(str::trim)
        .find(|seg| is_meaningful_segment(seg))
        .map(service_name)
}

/// Service named by a `<name>-service`, `-svc` or `-api` token in a
/// user-agent string. The token must end at `/`, `;`, `)`, whitespace or the
/// end of the string.
pub fn service_from_user_agent(user_agent: &str) -> Option<String> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z][a-z0-9]*(?:-[a-z0-9]+)*?)-(?:service|svc|api)(?:[/;)\s]|$)")
            .expect("user agent token regex")
    });
    re.captures(user_agent)
        .and_then(|caps| caps.get(1))
        .map(|m| service_name(m.as_str()))
}

fn is_meaningful_segment(seg: &str) -> bool {
    if seg.is_empty() || NOISE_SEGMENTS.iter().any(|n| seg.eq_ignore_ascii_case(n)) {
        return false;
    }
    if seg.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let is_version = seg
        .strip_prefix(|c: char| c == 'v' || c == 'V')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit() || b == b'.'));
    !is_version && Uuid::parse_str(seg).is_err()
}

fn service_name(segment: &str) -> String {
    let segment = segment.to_lowercase();
    if segment.ends_with("-service") {
        segment
    } else {
        format!("{segment}-service")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = r#"2024-01-15T14:30:22Z web-portal GET /api/v1/users 200 45ms "Mozilla/5.0""#;

    #[test]
    fn test_users_path_yields_users_service() {
        let claims = ApiGatewayAdapter::default().parse(ACCESS, Some("gateway-access"));
        assert_eq!(claims.len(), 1);
        let claim = &claims[0];
        assert_eq!(claim.processed_data(), "web-portal -> users-service");
        assert_eq!(claim.source_type(), SourceType::ApiGateway);
        assert!(claim.id().starts_with("apigw_"));
        assert!(claim.confidence_score().unwrap().value() > 0.7);
    }

    #[test]
    fn test_json_record() {
        let line = r#"{"requestTime":"2024-01-15T14:30:22Z","sourceService":"web-portal","httpMethod":"GET","path":"/api/v1/users","status":200,"responseLatency":45}"#;
        let claims = ApiGatewayAdapter::default().parse(line, None);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].processed_data(), "web-portal -> users-service");
        assert_eq!(claims[0].confidence_score().unwrap().value(), 0.90);
    }

    #[test]
    fn test_explicit_target_is_kept() {
        let line = r#"{"sourceService":"web-portal","targetService":"Billing","httpMethod":"POST","path":"/api/v2/invoices"}"#;
        let claims = ApiGatewayAdapter::default().parse(line, Some("gateway-json"));
        assert_eq!(claims[0].processed_data(), "web-portal -> billing");
    }

    #[test]
    fn test_service_from_path() {
        assert_eq!(service_from_path("/api/v1/users/42").as_deref(), Some("users-service"));
        assert_eq!(service_from_path("/rest/V2/Orders?id=1").as_deref(), Some("orders-service"));
        assert_eq!(
            service_from_path("/inventory-service/items").as_deref(),
            Some("inventory-service")
        );
        assert_eq!(
            service_from_path("/api/123e4567-e89b-12d3-a456-426614174000/carts").as_deref(),
            Some("carts-service")
        );
        assert_eq!(service_from_path("/api/v1/"), None);
        assert_eq!(service_from_path("/"), None);
        assert_eq!(service_from_path("/42/7"), None);
    }

    #[test]
    fn test_service_from_user_agent() {
        assert_eq!(
            service_from_user_agent("orders-api/1.4 (linux)").as_deref(),
            Some("orders-service")
        );
        assert_eq!(
            service_from_user_agent("okhttp web-portal-svc").as_deref(),
            Some("web-portal-service")
        );
        assert_eq!(
            service_from_user_agent("Mozilla/5.0 (compatible; billing-service)").as_deref(),
            Some("billing-service")
        );
        assert_eq!(service_from_user_agent("Mozilla/5.0"), None);
        assert_eq!(service_from_user_agent("my-api-client/1.0"), None);
        assert_eq!(service_from_user_agent("orders-svc.internal/2"), None);
    }

    #[test]
    fn test_uninformative_path_uses_user_agent_then_sentinel() {
        let adapter = ApiGatewayAdapter::default();
        let ua = r#"2024-01-15T14:30:22Z web-portal GET /api/v1 200 12ms "search-svc/2.0""#;
        assert_eq!(
            adapter.parse(ua, None)[0].processed_data(),
            "web-portal -> search-service"
        );

        let none = r#"2024-01-15T14:30:22Z web-portal GET / 200 12ms "curl/8.0""#;
        let claims = adapter.parse(none, None);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].processed_data(), "web-portal -> unknown-service");
        assert_eq!(claims[0].confidence_score().unwrap().value(), 0.55);
    }

    #[test]
    fn test_confidence_seeding() {
        let adapter = ApiGatewayAdapter::default();
        let seed = |line: &str| {
            adapter.parse(line, Some("gateway-access"))[0]
                .confidence_score()
                .unwrap()
                .value()
        };
        assert_eq!(seed("2024-01-15T14:30:22Z web GET /api/users 200"), 0.85);
        assert_eq!(seed("2024-01-15T14:30:22Z web GET /api/users 200 0.2ms"), 0.60);
        assert_eq!(seed("2024-01-15T14:30:22Z web GET /api/users 200 9000ms"), 0.70);
        assert_eq!(seed("2024-01-15T14:30:22Z web BREW /api/users 200 40ms"), 0.55);
        assert!(seed(ACCESS) > 0.8);
    }
}
