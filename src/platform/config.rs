// DepSleuth - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::SourceType;
use crate::core::processing::ScoringConfig;
use crate::core::resolution::{FusionConfig, RecencyConfig};
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolved platform paths for DepSleuth configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/depsleuth/ or %APPDATA%\DepSleuth\config\)
    pub config_dir: PathBuf,

    /// User grammar directory (e.g. ~/.config/depsleuth/grammars/)
    pub user_grammars_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let user_grammars_dir = config_dir.join(constants::GRAMMARS_DIR_NAME);

            tracing::debug!(
                config = %config_dir.display(),
                grammars = %user_grammars_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                user_grammars_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                user_grammars_dir: fallback.join(constants::GRAMMARS_DIR_NAME),
                config_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scoring]` section.
    pub scoring: ScoringSection,
    /// `[fusion]` section.
    pub fusion: FusionSection,
    /// `[sources]` section: source type tag -> file name globs.
    pub sources: HashMap<String, Vec<String>>,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[grammars]` section.
    pub grammars: GrammarsSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[scoring]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    /// Base confidence before the source boost.
    pub base: Option<f64>,
    /// `[scoring.boosts]`: source type tag -> boost.
    pub boosts: HashMap<String, f64>,
}

/// `[fusion]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FusionSection {
    /// Source authority order, most trusted first.
    pub priority: Option<Vec<String>>,
    pub recency_half_life_hours: Option<f64>,
    pub recency_min_gap_hours: Option<f64>,
    /// Confidence assumed for unscored claims.
    pub default_confidence: Option<f64>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
    /// Maximum evidence files per run.
    pub max_files: Option<usize>,
}

/// `[grammars]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct GrammarsSection {
    /// Additional grammar directory.
    pub user_grammar_directory: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Core --
    pub scoring: ScoringConfig,
    pub fusion: FusionConfig,

    // -- Ingest --
    /// File name globs per source type, checked in order.
    pub source_patterns: Vec<(SourceType, Vec<String>)>,
    /// Maximum directory recursion depth.
    pub max_depth: usize,
    /// Maximum evidence files per run.
    pub max_files: usize,

    // -- Grammars --
    pub user_grammar_dir: Option<PathBuf>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            fusion: FusionConfig::default(),
            source_patterns: default_source_patterns(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            user_grammar_dir: None,
            log_level: None,
        }
    }
}

/// Built-in file name globs per source type.
pub fn default_source_patterns() -> Vec<(SourceType, Vec<String>)> {
    constants::DEFAULT_SOURCE_PATTERNS
        .iter()
        .filter_map(|(tag, patterns)| {
            let source = tag.parse::<SourceType>().ok()?;
            Some((source, patterns.iter().map(|p| p.to_string()).collect()))
        })
        .collect()
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unreadable or unparseable, returns defaults with a warning:
/// the run still proceeds but the user is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content, config_path),
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Validate config.toml content. `config_path` is used for messages and to
/// resolve a relative grammar directory.
pub fn parse_config(content: &str, config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source: e,
            };
            let msg = format!(
                "Failed to parse config file: {err}. Using defaults. \
                 See config.example.toml for the expected format."
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    // Validate each field against named constants, accumulating all errors.
    let mut config = AppConfig::default();

    validate_scoring(&raw.scoring, &mut config.scoring, &mut warnings);
    validate_fusion(&raw.fusion, &mut config.fusion, &mut warnings);
    validate_sources(&raw.sources, &mut config.source_patterns, &mut warnings);

    // -- Discovery: max_depth --
    if let Some(depth) = raw.discovery.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(out_of_range(
                "discovery.max_depth",
                depth,
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
                constants::DEFAULT_MAX_DEPTH,
            ));
        }
    }

    // -- Discovery: max_files --
    if let Some(files) = raw.discovery.max_files {
        if (constants::MIN_MAX_FILES..=constants::ABSOLUTE_MAX_FILES).contains(&files) {
            config.max_files = files;
        } else {
            warnings.push(out_of_range(
                "discovery.max_files",
                files,
                format!("{}-{}", constants::MIN_MAX_FILES, constants::ABSOLUTE_MAX_FILES),
                constants::DEFAULT_MAX_FILES,
            ));
        }
    }

    // -- Grammars: user_grammar_directory --
    if let Some(ref dir) = raw.grammars.user_grammar_directory {
        if !dir.trim().is_empty() {
            let dir = PathBuf::from(dir.trim());
            config.user_grammar_dir = Some(if dir.is_relative() {
                config_path.parent().unwrap_or(Path::new(".")).join(dir)
            } else {
                dir
            });
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

fn validate_scoring(raw: &ScoringSection, scoring: &mut ScoringConfig, warnings: &mut Vec<String>) {
    if let Some(base) = raw.base {
        if (0.0..=1.0).contains(&base) {
            scoring.base = base;
        } else {
            warnings.push(out_of_range(
                "scoring.base",
                base,
                "0.0-1.0".to_string(),
                constants::DEFAULT_SCORE_BASE,
            ));
        }
    }

    // Sorted so warnings come out in a stable order.
    let mut boosts: Vec<(&String, &f64)> = raw.boosts.iter().collect();
    boosts.sort_by(|a, b| a.0.cmp(b.0));
    for (tag, &boost) in boosts {
        let source = match evidence_source(tag) {
            Some(s) => s,
            None => {
                warnings.push(format!(
                    "[scoring.boosts] \"{tag}\" is not a known source type. Ignored."
                ));
                continue;
            }
        };
        if (constants::MIN_SCORE_BOOST..=constants::MAX_SCORE_BOOST).contains(&boost) {
            scoring.boosts.insert(source, boost);
        } else {
            warnings.push(out_of_range(
                &format!("scoring.boosts.{tag}"),
                boost,
                format!("{}-{}", constants::MIN_SCORE_BOOST, constants::MAX_SCORE_BOOST),
                scoring.boost(source),
            ));
        }
    }
}

fn validate_fusion(raw: &FusionSection, fusion: &mut FusionConfig, warnings: &mut Vec<String>) {
    // -- Fusion: priority --
    if let Some(ref names) = raw.priority {
        let mut priority: Vec<SourceType> = Vec::new();
        for name in names {
            match evidence_source(name) {
                Some(source) if priority.contains(&source) => warnings.push(format!(
                    "[fusion] priority lists \"{name}\" more than once. Later entry ignored."
                )),
                Some(source) => priority.push(source),
                None => warnings.push(format!(
                    "[fusion] priority entry \"{name}\" is not a known source type. Ignored."
                )),
            }
        }
        // Unlisted sources keep their default relative order, after the listed ones.
        for source in SourceType::evidence_sources() {
            if !priority.contains(source) {
                priority.push(*source);
            }
        }
        fusion.priority = priority;
    }

    // -- Fusion: recency_half_life_hours --
    if let Some(hours) = raw.recency_half_life_hours {
        if (constants::MIN_RECENCY_HALF_LIFE_HOURS..=constants::MAX_RECENCY_HALF_LIFE_HOURS)
            .contains(&hours)
        {
            fusion.recency.half_life_hours = hours;
        } else {
            warnings.push(out_of_range(
                "fusion.recency_half_life_hours",
                hours,
                format!(
                    "{}-{}",
                    constants::MIN_RECENCY_HALF_LIFE_HOURS,
                    constants::MAX_RECENCY_HALF_LIFE_HOURS
                ),
                RecencyConfig::default().half_life_hours,
            ));
        }
    }

    // -- Fusion: recency_min_gap_hours --
    if let Some(hours) = raw.recency_min_gap_hours {
        if (constants::MIN_RECENCY_MIN_GAP_HOURS..=constants::MAX_RECENCY_MIN_GAP_HOURS)
            .contains(&hours)
        {
            fusion.recency.min_gap_hours = hours;
        } else {
            warnings.push(out_of_range(
                "fusion.recency_min_gap_hours",
                hours,
                format!(
                    "{}-{}",
                    constants::MIN_RECENCY_MIN_GAP_HOURS,
                    constants::MAX_RECENCY_MIN_GAP_HOURS
                ),
                RecencyConfig::default().min_gap_hours,
            ));
        }
    }

    // -- Fusion: default_confidence --
    if let Some(value) = raw.default_confidence {
        if (0.0..=1.0).contains(&value) {
            fusion.default_confidence = value;
        } else {
            warnings.push(out_of_range(
                "fusion.default_confidence",
                value,
                "0.0-1.0".to_string(),
                constants::DEFAULT_FUSION_CONFIDENCE,
            ));
        }
    }
}

fn validate_sources(
    raw: &HashMap<String, Vec<String>>,
    patterns: &mut [(SourceType, Vec<String>)],
    warnings: &mut Vec<String>,
) {
    let mut entries: Vec<(&String, &Vec<String>)> = raw.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (tag, globs) in entries {
        let Some(source) = evidence_source(tag) else {
            warnings.push(format!(
                "[sources] \"{tag}\" is not a known source type. Ignored."
            ));
            continue;
        };
        let valid: Vec<String> = globs
            .iter()
            .filter(|g| match glob::Pattern::new(g) {
                Ok(_) => true,
                Err(e) => {
                    warnings.push(format!(
                        "[sources] {tag} pattern \"{g}\" is invalid ({e}). Ignored."
                    ));
                    false
                }
            })
            .cloned()
            .collect();
        if valid.is_empty() {
            continue;
        }
        if let Some(slot) = patterns.iter_mut().find(|(s, _)| *s == source) {
            slot.1 = valid;
        }
    }
}

/// Warning text for a rejected value that falls back to `default`.
fn out_of_range(
    field: &str,
    value: impl fmt::Display,
    expected: String,
    default: impl fmt::Display,
) -> String {
    let err = ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    };
    format!("{err}. Using default ({default}).")
}

fn evidence_source(tag: &str) -> Option<SourceType> {
    tag.parse::<SourceType>().ok().filter(SourceType::is_evidence)
}
