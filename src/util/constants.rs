// DepSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "DepSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "DepSleuth";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Claim contract
// =============================================================================

/// Separator between the two application names of an edge key.
/// Every adapter and the fusion grouping key use exactly this literal.
pub const EDGE_SEPARATOR: &str = " -> ";

/// Prefix of the id assigned to a fused claim; followed by the winner's id.
pub const RESOLVED_ID_PREFIX: &str = "resolved";

/// Downstream name used when the API-gateway heuristic finds nothing usable.
pub const UNKNOWN_SERVICE: &str = "unknown-service";

// =============================================================================
// Scoring defaults
// =============================================================================

/// Base confidence every claim starts from before the source boost.
pub const DEFAULT_SCORE_BASE: f64 = 0.5;

/// Default boost for CODEBASE claims (0.5 + 0.30 = 0.80).
pub const DEFAULT_CODEBASE_BOOST: f64 = 0.30;

/// Default boost for ROUTER_LOG claims (0.5 + 0.15 = 0.65).
pub const DEFAULT_ROUTER_LOG_BOOST: f64 = 0.15;

/// Default boost for API_GATEWAY claims (0.5 + 0.10 = 0.60).
pub const DEFAULT_API_GATEWAY_BOOST: f64 = 0.10;

/// Allowed range for any configured boost.
pub const MIN_SCORE_BOOST: f64 = -0.5;
pub const MAX_SCORE_BOOST: f64 = 0.5;

// =============================================================================
// Fusion defaults
// =============================================================================

/// Confidence assumed for claims that carry no score, and assigned to fused
/// output when the winner has none.
pub const DEFAULT_FUSION_CONFIDENCE: f64 = 0.5;

/// Half-life of the recency decay applied during fusion, in hours.
pub const DEFAULT_RECENCY_HALF_LIFE_HOURS: f64 = 24.0;

/// Age gap (relative to the newest claim of a group) below which no recency
/// decay is applied, in hours.
pub const DEFAULT_RECENCY_MIN_GAP_HOURS: f64 = 24.0;

/// Bounds for the configurable half-life.
pub const MIN_RECENCY_HALF_LIFE_HOURS: f64 = 1.0;
pub const MAX_RECENCY_HALF_LIFE_HOURS: f64 = 24.0 * 365.0;

/// Bounds for the configurable minimum gap.
pub const MIN_RECENCY_MIN_GAP_HOURS: f64 = 0.0;
pub const MAX_RECENCY_MIN_GAP_HOURS: f64 = 24.0 * 30.0;

// =============================================================================
// API-gateway heuristics
// =============================================================================

/// Latency below which a gateway record is considered implausibly fast (ms).
pub const GATEWAY_TOO_FAST_MS: f64 = 1.0;

/// Latency above which a gateway record is considered very slow (ms).
pub const GATEWAY_VERY_SLOW_MS: f64 = 5_000.0;

/// Pre-seeded confidence: known method, recognizable path, plausible latency.
pub const GATEWAY_CONFIDENCE_HIGH: f64 = 0.90;

/// Pre-seeded confidence: known method and path, latency not reported.
pub const GATEWAY_CONFIDENCE_NO_LATENCY: f64 = 0.85;

/// Pre-seeded confidence: very slow but otherwise well-formed call.
pub const GATEWAY_CONFIDENCE_SLOW: f64 = 0.70;

/// Pre-seeded confidence: implausibly fast call.
pub const GATEWAY_CONFIDENCE_TOO_FAST: f64 = 0.60;

/// Pre-seeded confidence: unknown method or unrecognizable path.
pub const GATEWAY_CONFIDENCE_LOW: f64 = 0.55;

// =============================================================================
// Grammar limits
// =============================================================================

/// Maximum number of grammars loaded (built-in plus user).
pub const MAX_GRAMMARS: usize = 100;

/// Maximum size of a single grammar file in bytes.
pub const MAX_GRAMMAR_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Maximum allowed length for a regex pattern in a grammar.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Maximum length of a single input line handed to a grammar. Longer lines
/// are skipped rather than matched.
pub const MAX_LINE_LENGTH: usize = 64 * 1024; // 64 KB

// =============================================================================
// Discovery limits
// =============================================================================

/// Maximum directory recursion depth when an input is a directory.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth.
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of evidence files ingested per run.
pub const DEFAULT_MAX_FILES: usize = 500;

/// Minimum sensible value for the max-files limit.
pub const MIN_MAX_FILES: usize = 1;

/// Hard upper bound on max files.
pub const ABSOLUTE_MAX_FILES: usize = 10_000;

/// Maximum size of a single evidence file read into memory.
pub const MAX_EVIDENCE_FILE_SIZE: u64 = 256 * 1024 * 1024; // 256 MB

/// File name suffix identifying pre-built claim files.
pub const CLAIMS_FILE_SUFFIX: &str = ".claims.json";

/// Default file-name globs used to infer a file's source type, as
/// (source type tag, patterns). Checked in order; first match wins.
pub const DEFAULT_SOURCE_PATTERNS: &[(&str, &[&str])] = &[
    ("CODEBASE", &["*codebase*", "*manifest*"]),
    ("ROUTER_LOG", &["*router*"]),
    ("API_GATEWAY", &["*gateway*", "*apigw*"]),
    ("CI_CD", &["*cicd*", "*ci_*", "*ci-*", "*pipeline*", "*jenkins*"]),
    ("TELEMETRY", &["*telemetry*", "*trace*", "*span*"]),
    ("NETWORK", &["*network*", "*flow*", "*firewall*"]),
];

// =============================================================================
// Miscellaneous
// =============================================================================

/// Default log level when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum characters of a raw line included in trace-level log output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User grammar subdirectory name inside the config directory.
pub const GRAMMARS_DIR_NAME: &str = "grammars";
