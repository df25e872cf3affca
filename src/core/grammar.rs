// DepSleuth - core/grammar.rs
//
// Line grammar loading, validation, and the built-in grammar catalog.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O for user grammars is handled by app::grammar_mgr which feeds content here.
//
// A grammar turns one raw evidence line into a `ParsedEvent`. Two kinds
// exist: regex grammars (named capture groups) and JSON grammars (field
// lookups on one JSON object per line). Both sit behind `LineGrammar`, so an
// adapter only ever sees an ordered list of strategies.

use crate::core::model::{ParsedEvent, SourceType};
use crate::core::timestamp;
use crate::util::constants;
use crate::util::error::GrammarError;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Capture groups with a dedicated slot in `ParsedEvent`. Every other named
/// group lands in `ParsedEvent::fields`.
const CORE_GROUPS: &[&str] = &["timestamp", "upstream", "downstream", "action", "status"];

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw TOML grammar definition as deserialized from a .toml file.
/// This is validated and compiled into a `LineGrammar` for runtime use.
#[derive(Debug, Deserialize)]
pub struct GrammarDefinition {
    pub grammar: GrammarMeta,
    #[serde(default)]
    pub detection: DetectionDef,
    #[serde(default)]
    pub parsing: ParsingDef,
    /// JSON grammars only: slot or extra field name -> candidate keys.
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct GrammarMeta {
    pub id: String,
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub kind: GrammarKind,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GrammarKind {
    #[default]
    Regex,
    Json,
}

#[derive(Debug, Deserialize, Default)]
pub struct DetectionDef {
    /// Cheap prefilter tested before the full line pattern.
    #[serde(default)]
    pub content_match: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ParsingDef {
    #[serde(default)]
    pub line_pattern: String,
    #[serde(default)]
    pub timestamp_format: String,
}

// =============================================================================
// Runtime grammar capability
// =============================================================================

/// Descriptive metadata shared by every grammar kind.
#[derive(Debug, Clone)]
pub struct GrammarInfo {
    /// Unique grammar identifier; doubles as the format tag.
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: SourceType,
    pub is_builtin: bool,
}

/// One parsing strategy for one platform format.
pub trait LineGrammar: fmt::Debug + Send + Sync {
    fn info(&self) -> &GrammarInfo;

    /// Match a single line. `None` means the line is not in this format.
    fn try_parse(&self, line: &str) -> Option<ParsedEvent>;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn source_type(&self) -> SourceType {
        self.info().source
    }
}

/// Grammar driven by a regex with named capture groups.
#[derive(Debug)]
pub struct RegexGrammar {
    info: GrammarInfo,
    content_match: Option<Regex>,
    line_pattern: Regex,
    timestamp_format: String,
}

impl LineGrammar for RegexGrammar {
    fn info(&self) -> &GrammarInfo {
        &self.info
    }

    fn try_parse(&self, line: &str) -> Option<ParsedEvent> {
        if let Some(prefilter) = &self.content_match {
            if !prefilter.is_match(line) {
                return None;
            }
        }
        let caps = self.line_pattern.captures(line)?;
        let capture = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let upstream = capture("upstream")?;
        let timestamp = capture("timestamp")
            .and_then(|raw| timestamp::parse_timestamp(&raw, &self.timestamp_format));

        let fields = self
            .line_pattern
            .capture_names()
            .flatten()
            .filter(|name| !CORE_GROUPS.contains(name))
            .filter_map(|name| capture(name).map(|v| (name.to_string(), v)))
            .collect();

        Some(ParsedEvent {
            timestamp,
            upstream,
            downstream: capture("downstream"),
            action: capture("action"),
            status: capture("status"),
            platform: self.info.id.clone(),
            raw_line: line.to_string(),
            fields,
        })
    }
}

/// Grammar for one JSON object per line.
#[derive(Debug)]
pub struct JsonGrammar {
    info: GrammarInfo,
    /// Field name -> candidate keys, tried in order. Keys may be literal
    /// (`"service.name"`) or dotted paths into nested objects.
    fields: Vec<(String, Vec<String>)>,
    timestamp_format: String,
}

impl JsonGrammar {
    fn lookup<'a>(&self, object: &'a Value, field: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, keys)| keys.iter().find_map(|key| lookup_path(object, key)))
    }

    fn lookup_string(&self, object: &Value, field: &str) -> Option<String> {
        self.lookup(object, field).and_then(scalar_to_string)
    }
}

impl LineGrammar for JsonGrammar {
    fn info(&self) -> &GrammarInfo {
        &self.info
    }

    fn try_parse(&self, line: &str) -> Option<ParsedEvent> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        let object: Value = serde_json::from_str(trimmed).ok()?;
        if !object.is_object() {
            return None;
        }

        let upstream = self.lookup_string(&object, "upstream")?;
        let timestamp = self.lookup(&object, "timestamp").and_then(|v| match v {
            Value::Number(n) => timestamp::parse_epoch(&n.to_string()),
            other => scalar_to_string(other)
                .and_then(|raw| timestamp::parse_timestamp(&raw, &self.timestamp_format)),
        });

        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| !CORE_GROUPS.contains(&name.as_str()))
            .filter_map(|(name, _)| {
                self.lookup_string(&object, name)
                    .map(|v| (name.clone(), v))
            })
            .collect();

        Some(ParsedEvent {
            timestamp,
            upstream,
            downstream: self.lookup_string(&object, "downstream"),
            action: self.lookup_string(&object, "action"),
            status: self.lookup_string(&object, "status"),
            platform: self.info.id.clone(),
            raw_line: line.to_string(),
            fields,
        })
    }
}

/// Resolve `path` in `value`: the literal key first, then every split of the
/// dotted path, so both `{"peer.service": x}` and `{"peer": {"service": x}}`
/// answer `peer.service`.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    if let Some(v) = object.get(path) {
        return Some(v);
    }
    let mut split = path.len();
    while let Some(dot) = path[..split].rfind('.') {
        if let Some(child) = object.get(&path[..dot]) {
            if let Some(v) = lookup_path(child, &path[dot + 1..]) {
                return Some(v);
            }
        }
        split = dot;
    }
    None
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Grammar validation and compilation
// =============================================================================

/// Parse a TOML string into a `GrammarDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_grammar_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<GrammarDefinition, GrammarError> {
    toml::from_str(toml_content).map_err(|e| GrammarError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate a `GrammarDefinition` and compile it into a runtime grammar.
///
/// Validates:
/// - Required fields are present and non-empty
/// - The source is an evidence source type
/// - Regex patterns are valid and within size limits
/// - The `upstream` slot is provided
pub fn validate_and_compile(
    def: GrammarDefinition,
    source_path: &Path,
    is_builtin: bool,
) -> Result<Arc<dyn LineGrammar>, GrammarError> {
    let id = def.grammar.id.trim().to_string();

    if id.is_empty() {
        return Err(GrammarError::MissingField {
            grammar_id: "(empty)".to_string(),
            field: "grammar.id",
        });
    }
    if def.grammar.name.trim().is_empty() {
        return Err(GrammarError::MissingField {
            grammar_id: id,
            field: "grammar.name",
        });
    }

    let source = def
        .grammar
        .source
        .parse::<SourceType>()
        .ok()
        .filter(SourceType::is_evidence)
        .ok_or_else(|| GrammarError::UnknownSourceType {
            grammar_id: id.clone(),
            value: def.grammar.source.clone(),
        })?;

    let info = GrammarInfo {
        id: id.clone(),
        name: def.grammar.name,
        description: def.grammar.description,
        source,
        is_builtin,
    };

    match def.grammar.kind {
        GrammarKind::Regex => {
            if def.parsing.line_pattern.is_empty() {
                return Err(GrammarError::MissingField {
                    grammar_id: id,
                    field: "parsing.line_pattern",
                });
            }
            let line_pattern = compile_regex(&id, "parsing.line_pattern", &def.parsing.line_pattern)?;
            if !line_pattern.capture_names().flatten().any(|n| n == "upstream") {
                return Err(GrammarError::MissingCaptureGroup {
                    grammar_id: id,
                    group: "upstream",
                });
            }
            if !line_pattern.capture_names().flatten().any(|n| n == "downstream") {
                tracing::debug!(
                    grammar_id = %id,
                    source = %source_path.display(),
                    "Grammar has no 'downstream' group; the adapter must derive it"
                );
            }
            let content_match = if def.detection.content_match.is_empty() {
                None
            } else {
                Some(compile_regex(&id, "detection.content_match", &def.detection.content_match)?)
            };

            Ok(Arc::new(RegexGrammar {
                info,
                content_match,
                line_pattern,
                timestamp_format: def.parsing.timestamp_format,
            }))
        }
        GrammarKind::Json => {
            if def.fields.get("upstream").map_or(true, Vec::is_empty) {
                return Err(GrammarError::MissingField {
                    grammar_id: id,
                    field: "fields.upstream",
                });
            }
            // Sorted so extra fields come out in a stable order.
            let mut fields: Vec<(String, Vec<String>)> = def.fields.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));

            Ok(Arc::new(JsonGrammar {
                info,
                fields,
                timestamp_format: def.parsing.timestamp_format,
            }))
        }
    }
}

/// Compile a regex pattern with length validation to prevent ReDoS.
fn compile_regex(grammar_id: &str, field: &'static str, pattern: &str) -> Result<Regex, GrammarError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(GrammarError::RegexTooLong {
            grammar_id: grammar_id.to_string(),
            field,
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    Regex::new(pattern).map_err(|e| GrammarError::InvalidRegex {
        grammar_id: grammar_id.to_string(),
        field,
        pattern: pattern.to_string(),
        source: e,
    })
}

// =============================================================================
// Grammar sets and the catalog
// =============================================================================

/// Ordered grammars for one source type. Order is auto-detect priority:
/// specific structured formats first, loose generic ones last.
#[derive(Debug, Clone, Default)]
pub struct GrammarSet {
    grammars: Vec<Arc<dyn LineGrammar>>,
}

impl GrammarSet {
    pub fn new(grammars: Vec<Arc<dyn LineGrammar>>) -> Self {
        Self { grammars }
    }

    /// Grammar for a format tag.
    pub fn get(&self, format: &str) -> Option<&Arc<dyn LineGrammar>> {
        self.grammars.iter().find(|g| g.id() == format)
    }

    /// First grammar in priority order that matches `line`.
    pub fn detect(&self, line: &str) -> Option<ParsedEvent> {
        self.grammars.iter().find_map(|g| g.try_parse(line))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.grammars.iter().map(|g| g.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

/// All known grammars across source types, in priority order.
#[derive(Debug, Clone, Default)]
pub struct GrammarCatalog {
    grammars: Vec<Arc<dyn LineGrammar>>,
}

impl GrammarCatalog {
    pub fn new(grammars: Vec<Arc<dyn LineGrammar>>) -> Self {
        Self { grammars }
    }

    /// Grammars belonging to `source`, preserving catalog order.
    pub fn for_source(&self, source: SourceType) -> GrammarSet {
        GrammarSet::new(
            self.grammars
                .iter()
                .filter(|g| g.source_type() == source)
                .cloned()
                .collect(),
        )
    }

    /// Merge user grammars into a copy of this catalog.
    ///
    /// A user grammar with the id of an existing grammar replaces it in
    /// place. A new id is placed ahead of the existing grammars of its
    /// source, since a hand-written grammar is more specific than the
    /// built-in fallbacks.
    pub fn with_overrides(&self, user: Vec<Arc<dyn LineGrammar>>) -> Self {
        let mut grammars = self.grammars.clone();
        for grammar in user {
            if let Some(pos) = grammars.iter().position(|g| g.id() == grammar.id()) {
                tracing::info!(grammar_id = %grammar.id(), "User grammar overrides built-in");
                grammars[pos] = grammar;
            } else {
                let pos = grammars
                    .iter()
                    .position(|g| g.source_type() == grammar.source_type())
                    .unwrap_or(grammars.len());
                tracing::info!(grammar_id = %grammar.id(), "Loaded user-defined grammar");
                grammars.insert(pos, grammar);
            }
        }
        Self { grammars }
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    pub fn truncate(&mut self, max: usize) {
        self.grammars.truncate(max);
    }
}

// =============================================================================
// Built-in grammars (embedded at compile time)
// =============================================================================

/// Embedded TOML content for built-in grammars, in priority order.
/// Each tuple is (filename, TOML content).
pub fn builtin_grammar_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("haproxy.toml", include_str!("../../grammars/router_log/haproxy.toml")),
        (
            "nginx_upstream.toml",
            include_str!("../../grammars/router_log/nginx_upstream.toml"),
        ),
        (
            "envoy_access.toml",
            include_str!("../../grammars/router_log/envoy_access.toml"),
        ),
        (
            "router_generic.toml",
            include_str!("../../grammars/router_log/router_generic.toml"),
        ),
        (
            "dependency_scan.toml",
            include_str!("../../grammars/codebase/dependency_scan.toml"),
        ),
        (
            "connection_string.toml",
            include_str!("../../grammars/codebase/connection_string.toml"),
        ),
        (
            "service_manifest.toml",
            include_str!("../../grammars/codebase/service_manifest.toml"),
        ),
        (
            "gateway_json.toml",
            include_str!("../../grammars/api_gateway/gateway_json.toml"),
        ),
        (
            "gateway_access.toml",
            include_str!("../../grammars/api_gateway/gateway_access.toml"),
        ),
        ("jenkins.toml", include_str!("../../grammars/ci_cd/jenkins.toml")),
        (
            "github_actions.toml",
            include_str!("../../grammars/ci_cd/github_actions.toml"),
        ),
        ("gitlab_ci.toml", include_str!("../../grammars/ci_cd/gitlab_ci.toml")),
        ("otel_json.toml", include_str!("../../grammars/telemetry/otel_json.toml")),
        ("span_text.toml", include_str!("../../grammars/telemetry/span_text.toml")),
        ("flow_log.toml", include_str!("../../grammars/network/flow_log.toml")),
        ("firewall_kv.toml", include_str!("../../grammars/network/firewall_kv.toml")),
        ("conntrack.toml", include_str!("../../grammars/network/conntrack.toml")),
    ]
}

/// Load and validate all built-in grammars.
///
/// Invalid grammars are logged as errors and skipped (non-fatal).
pub fn load_builtin_grammars() -> Vec<Arc<dyn LineGrammar>> {
    let mut grammars = Vec::new();
    let mut failures = 0usize;

    for (filename, content) in builtin_grammar_sources() {
        let path = Path::new("<builtin>").join(filename);
        match parse_grammar_toml(content, &path).and_then(|def| validate_and_compile(def, &path, true)) {
            Ok(grammar) => {
                tracing::debug!(grammar_id = %grammar.id(), "Loaded built-in grammar");
                grammars.push(grammar);
            }
            Err(e) => {
                // Built-in grammar failures are bugs, but we still degrade gracefully
                tracing::error!(file = filename, error = %e, "Failed to load built-in grammar");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        tracing::warn!(count = failures, "Some built-in grammars failed to load");
    }

    grammars
}

/// Process-wide catalog of the built-in grammars, compiled on first use and
/// never mutated afterwards.
pub fn builtin_catalog() -> &'static GrammarCatalog {
    static CATALOG: OnceLock<GrammarCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| GrammarCatalog::new(load_builtin_grammars()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_GRAMMAR_TOML: &str = r#"
[grammar]
id = "test-grammar"
name = "Test Grammar"
source = "ROUTER_LOG"
description = "A test grammar"

[detection]
content_match = '->'

[parsing]
line_pattern = '^(?P<timestamp>\S+ \S+) (?P<upstream>[\w-]+) -> (?P<downstream>[\w-]+) (?P<action>[A-Z]+) (?P<status>\d+) (?P<route>\S+)$'
timestamp_format = "%Y-%m-%d %H:%M:%S"
"#;

    fn compile(toml: &str) -> Result<Arc<dyn LineGrammar>, GrammarError> {
        let path = PathBuf::from("test.toml");
        let def = parse_grammar_toml(toml, &path)?;
        validate_and_compile(def, &path, false)
    }

    #[test]
    fn test_compile_valid_grammar() {
        let grammar = compile(VALID_GRAMMAR_TOML).unwrap();
        assert_eq!(grammar.id(), "test-grammar");
        assert_eq!(grammar.source_type(), SourceType::RouterLog);
        assert!(!grammar.info().is_builtin);
    }

    #[test]
    fn test_regex_grammar_extracts_slots_and_extras() {
        let grammar = compile(VALID_GRAMMAR_TOML).unwrap();
        let event = grammar
            .try_parse("2024-01-15 14:30:22 web-portal -> orders-service GET 200 /orders")
            .unwrap();
        assert_eq!(event.upstream, "web-portal");
        assert_eq!(event.downstream.as_deref(), Some("orders-service"));
        assert_eq!(event.action.as_deref(), Some("GET"));
        assert_eq!(event.status.as_deref(), Some("200"));
        assert_eq!(event.field("route"), Some("/orders"));
        assert_eq!(event.platform, "test-grammar");
        assert_eq!(
            event.timestamp.unwrap().format("%H:%M:%S").to_string(),
            "14:30:22"
        );
    }

    #[test]
    fn test_regex_grammar_prefilter_rejects_line() {
        let grammar = compile(VALID_GRAMMAR_TOML).unwrap();
        assert!(grammar.try_parse("nothing to see here").is_none());
    }

    #[test]
    fn test_bad_timestamp_leaves_none() {
        let grammar = compile(VALID_GRAMMAR_TOML).unwrap();
        let event = grammar
            .try_parse("yesterday noon web-portal -> orders-service GET 200 /orders")
            .unwrap();
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn test_missing_upstream_group() {
        let toml = r#"
[grammar]
id = "no-upstream"
name = "No Upstream"
source = "NETWORK"

[parsing]
line_pattern = '(?P<downstream>\w+)'
"#;
        assert!(matches!(
            compile(toml).unwrap_err(),
            GrammarError::MissingCaptureGroup { group: "upstream", .. }
        ));
    }

    #[test]
    fn test_synthetic_source_rejected() {
        let toml = r#"
[grammar]
id = "fused"
name = "Fused"
source = "CONFLICT_RESOLVED"

[parsing]
line_pattern = '(?P<upstream>\w+)'
"#;
        assert!(matches!(
            compile(toml).unwrap_err(),
            GrammarError::UnknownSourceType { .. }
        ));
    }

    #[test]
    fn test_missing_id() {
        let toml = r#"
[grammar]
id = ""
name = "Empty"
source = "NETWORK"
"#;
        match compile(toml).unwrap_err() {
            GrammarError::MissingField { field, .. } => assert_eq!(field, "grammar.id"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_regex() {
        let toml = r#"
[grammar]
id = "bad-regex"
name = "Bad Regex"
source = "NETWORK"

[parsing]
line_pattern = '(?P<upstream>[invalid'
"#;
        assert!(matches!(
            compile(toml).unwrap_err(),
            GrammarError::InvalidRegex { .. }
        ));
    }

    #[test]
    fn test_regex_too_long() {
        let long_pattern = "a".repeat(constants::MAX_REGEX_PATTERN_LENGTH + 1);
        let toml = format!(
            r#"
[grammar]
id = "long-regex"
name = "Long Regex"
source = "NETWORK"

[parsing]
line_pattern = '{long_pattern}'
"#
        );
        assert!(matches!(
            compile(&toml).unwrap_err(),
            GrammarError::RegexTooLong { .. }
        ));
    }

    #[test]
    fn test_json_grammar_requires_upstream_mapping() {
        let toml = r#"
[grammar]
id = "json-no-upstream"
name = "JSON"
source = "TELEMETRY"
kind = "json"

[fields]
downstream = ["peer"]
"#;
        assert!(matches!(
            compile(toml).unwrap_err(),
            GrammarError::MissingField { field: "fields.upstream", .. }
        ));
    }

    #[test]
    fn test_json_grammar_literal_and_nested_keys() {
        let toml = r#"
[grammar]
id = "json-test"
name = "JSON"
source = "TELEMETRY"
kind = "json"

[fields]
timestamp = ["ts"]
upstream = ["service.name"]
downstream = ["attributes.peer.service"]
status = ["status.code"]
trace_id = ["trace"]
"#;
        let grammar = compile(toml).unwrap();
        let line = r#"{"ts": 1705329022, "service.name": "checkout", "attributes": {"peer.service": "payments"}, "status": {"code": "OK"}, "trace": "abc"}"#;
        let event = grammar.try_parse(line).unwrap();
        assert_eq!(event.upstream, "checkout");
        assert_eq!(event.downstream.as_deref(), Some("payments"));
        assert_eq!(event.status.as_deref(), Some("OK"));
        assert_eq!(event.field("trace_id"), Some("abc"));
        assert_eq!(
            event.timestamp.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-01-15 14:30:22"
        );

        assert!(grammar.try_parse("not json").is_none());
        assert!(grammar.try_parse(r#"{"service": "wrong-key"}"#).is_none());
        assert!(grammar.try_parse("{broken").is_none());
    }

    #[test]
    fn test_all_builtin_grammars_load() {
        let grammars = load_builtin_grammars();
        assert_eq!(grammars.len(), builtin_grammar_sources().len());
        assert!(grammars.iter().all(|g| g.info().is_builtin));

        let mut ids: Vec<&str> = grammars.iter().map(|g| g.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), grammars.len(), "grammar ids must be unique");
    }

    #[test]
    fn test_catalog_covers_every_evidence_source() {
        let catalog = builtin_catalog();
        for source in SourceType::evidence_sources() {
            assert!(
                !catalog.for_source(*source).is_empty(),
                "no grammar for {source}"
            );
        }
    }

    #[test]
    fn test_router_generic_is_tried_last() {
        let set = builtin_catalog().for_source(SourceType::RouterLog);
        assert_eq!(set.ids().last(), Some(&"router-generic"));
    }

    #[test]
    fn test_user_grammar_placement() {
        let catalog = builtin_catalog();
        let user = compile(VALID_GRAMMAR_TOML).unwrap();
        let merged = catalog.with_overrides(vec![user]);
        assert_eq!(merged.len(), catalog.len() + 1);
        assert_eq!(
            merged.for_source(SourceType::RouterLog).ids().first(),
            Some(&"test-grammar")
        );
    }

    #[test]
    fn test_user_grammar_replaces_same_id() {
        let catalog = builtin_catalog();
        let toml = r#"
[grammar]
id = "router-generic"
name = "Replacement"
source = "ROUTER_LOG"

[parsing]
line_pattern = '^(?P<upstream>\w+)=>(?P<downstream>\w+)$'
"#;
        let merged = catalog.with_overrides(vec![compile(toml).unwrap()]);
        assert_eq!(merged.len(), catalog.len());
        let set = merged.for_source(SourceType::RouterLog);
        assert!(set.get("router-generic").unwrap().try_parse("a=>b").is_some());
    }
}
