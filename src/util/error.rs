// DepSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation. All errors preserve the causal chain
// for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all DepSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum DepSleuthError {
    /// A claim failed construction or validation.
    Claim(ClaimError),

    /// Grammar loading or validation failed.
    Grammar(GrammarError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Reading evidence from disk failed.
    Ingest(IngestError),
}

impl fmt::Display for DepSleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim(e) => write!(f, "Invalid claim: {e}"),
            Self::Grammar(e) => write!(f, "Grammar error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Ingest(e) => write!(f, "Ingest error: {e}"),
        }
    }
}

impl std::error::Error for DepSleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Claim(e) => Some(e),
            Self::Grammar(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Ingest(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Claim errors
// ---------------------------------------------------------------------------

/// Errors raised when a claim is constructed or validated.
///
/// All variants are the invalid-argument condition of the processing
/// pipeline: a batch containing one of them is rejected as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimError {
    /// A mandatory field is absent or empty.
    MissingField {
        /// Id of the offending claim, when it has one.
        claim_id: Option<String>,
        field: &'static str,
    },

    /// A confidence value lies outside `[0, 1]` or is not a number.
    ConfidenceOutOfRange { value: f64 },

    /// A source type tag is not one of the known categories.
    UnknownSourceType { value: String },

    /// An external claim carries a category only fusion may emit.
    ReservedSourceType { value: String },
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField {
                claim_id: Some(id),
                field,
            } => write!(f, "claim '{id}' is missing required field '{field}'"),
            Self::MissingField {
                claim_id: None,
                field,
            } => write!(f, "claim is missing required field '{field}'"),
            Self::ConfidenceOutOfRange { value } => {
                write!(f, "confidence {value} is outside the range [0, 1]")
            }
            Self::UnknownSourceType { value } => {
                write!(f, "unknown source type '{value}'")
            }
            Self::ReservedSourceType { value } => {
                write!(f, "source type '{value}' is reserved for fused claims")
            }
        }
    }
}

impl std::error::Error for ClaimError {}

impl From<ClaimError> for DepSleuthError {
    fn from(e: ClaimError) -> Self {
        Self::Claim(e)
    }
}

// ---------------------------------------------------------------------------
// Grammar errors
// ---------------------------------------------------------------------------

/// Errors related to grammar loading and validation.
#[derive(Debug)]
pub enum GrammarError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Grammar file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing from the grammar definition.
    MissingField {
        grammar_id: String,
        field: &'static str,
    },

    /// A regex pattern in the grammar is invalid.
    InvalidRegex {
        grammar_id: String,
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// A regex pattern exceeds the maximum allowed length.
    RegexTooLong {
        grammar_id: String,
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    /// The line pattern lacks a capture group every grammar must provide.
    MissingCaptureGroup {
        grammar_id: String,
        group: &'static str,
    },

    /// The grammar names a source type that is unknown or synthetic.
    UnknownSourceType { grammar_id: String, value: String },

    /// Maximum number of grammars exceeded.
    TooManyGrammars { count: usize, max: usize },

    /// I/O error reading a grammar file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Grammar '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { grammar_id, field } => {
                write!(f, "Grammar '{grammar_id}': missing required field '{field}'")
            }
            Self::InvalidRegex {
                grammar_id,
                field,
                pattern,
                source,
            } => write!(
                f,
                "Grammar '{grammar_id}': invalid regex in '{field}' ('{pattern}'): {source}"
            ),
            Self::RegexTooLong {
                grammar_id,
                field,
                length,
                max_length,
            } => write!(
                f,
                "Grammar '{grammar_id}': regex in '{field}' is {length} chars, \
                 exceeds maximum of {max_length}"
            ),
            Self::MissingCaptureGroup { grammar_id, group } => write!(
                f,
                "Grammar '{grammar_id}': line_pattern has no '{group}' capture group"
            ),
            Self::UnknownSourceType { grammar_id, value } => write!(
                f,
                "Grammar '{grammar_id}': source '{value}' is not an evidence source type"
            ),
            Self::TooManyGrammars { count, max } => {
                write!(f, "Too many grammars loaded ({count}), maximum is {max}")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error reading grammar '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GrammarError> for DepSleuthError {
    fn from(e: GrammarError) -> Self {
        Self::Grammar(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::ValueOutOfRange { .. } => None,
        }
    }
}

impl From<ConfigError> for DepSleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors raised while turning input paths into evidence batches.
#[derive(Debug)]
pub enum IngestError {
    /// An input path does not exist.
    NotFound { path: PathBuf },

    /// No source type was given and none could be inferred from the name.
    UnknownSource { path: PathBuf },

    /// A file exceeds the maximum evidence file size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Maximum input file count exceeded.
    MaxFilesExceeded { max: usize },

    /// A claims file is not a JSON array of claims.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// I/O error reading an evidence file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "Input '{}' does not exist", path.display())
            }
            Self::UnknownSource { path } => write!(
                f,
                "Cannot infer the source type of '{}'. Pass --source or add a \
                 pattern to the [sources] section of config.toml.",
                path.display()
            ),
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MaxFilesExceeded { max } => write!(
                f,
                "Ingest stopped: exceeded maximum of {max} files. \
                 Increase [discovery] max_files in config or narrow the inputs."
            ),
            Self::Json { path, source } => {
                write!(f, "'{}': invalid claims JSON: {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<IngestError> for DepSleuthError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

/// Convenience type alias for DepSleuth results.
pub type Result<T> = std::result::Result<T, DepSleuthError>;
