// DepSleuth - app/ingest.rs
//
// Turns command-line inputs (files and directories) into in-memory evidence
// batches. This is the only place evidence files are read; the core only ever
// sees the resulting text.
//
//   - Directories are walked with `walkdir`, bounded by max_depth/max_files.
//   - A file's source type comes from the override, otherwise from the first
//     matching filename glob in the configured source patterns.
//   - `*.claims.json` files are pre-built claims and bypass the adapters.
//   - Unclassifiable files found while walking a directory are skipped with a
//     warning; an explicitly named one is an error.

use crate::core::model::{ClaimDraft, SourceType};
use crate::platform::config::AppConfig;
use crate::util::constants;
use crate::util::error::IngestError;
use std::path::{Path, PathBuf};

// =============================================================================
// Types
// =============================================================================

/// Options controlling one ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Forces every evidence file to this source type.
    pub source_override: Option<SourceType>,

    /// Filename globs per source type, in evidence order.
    pub source_patterns: Vec<(SourceType, Vec<String>)>,

    pub max_depth: usize,
    pub max_files: usize,
}

impl IngestOptions {
    pub fn from_config(config: &AppConfig, source_override: Option<SourceType>) -> Self {
        Self {
            source_override,
            source_patterns: config.source_patterns.clone(),
            max_depth: config.max_depth,
            max_files: config.max_files,
        }
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), None)
    }
}

/// The raw text of one evidence file, tagged with its source type.
#[derive(Debug, Clone)]
pub struct EvidenceBatch {
    pub path: PathBuf,
    pub source: SourceType,
    pub text: String,
}

/// Everything read from the inputs.
#[derive(Debug, Default)]
pub struct Ingested {
    /// Evidence text for the adapters, in input order.
    pub batches: Vec<EvidenceBatch>,

    /// Pre-built claims from `*.claims.json` files, in input order.
    pub drafts: Vec<ClaimDraft>,

    /// Number of `*.claims.json` files read.
    pub claim_files: usize,

    /// Non-fatal problems (skipped files, inaccessible entries).
    pub warnings: Vec<String>,
}

impl Ingested {
    pub fn file_count(&self) -> usize {
        self.batches.len() + self.claim_files
    }
}

// =============================================================================
// Ingest
// =============================================================================

/// Read every input path.
///
/// # Errors
/// Missing inputs, unreadable or oversize files, malformed claim files, an
/// explicitly named file with no inferable source, and exceeding `max_files`
/// are fatal.
pub fn ingest(inputs: &[PathBuf], options: &IngestOptions) -> Result<Ingested, IngestError> {
    let max_files = options.max_files.min(constants::ABSOLUTE_MAX_FILES);
    let patterns = compile_source_patterns(&options.source_patterns);

    let mut files: Vec<(PathBuf, bool)> = Vec::new();
    let mut ingested = Ingested::default();

    for input in inputs {
        if !input.exists() {
            return Err(IngestError::NotFound {
                path: input.clone(),
            });
        }
        if input.is_dir() {
            walk_directory(input, options.max_depth, &mut files, &mut ingested.warnings);
        } else {
            files.push((input.clone(), true));
        }
        if files.len() > max_files {
            return Err(IngestError::MaxFilesExceeded { max: max_files });
        }
    }

    for (path, explicit) in files {
        if is_claims_file(&path) {
            let drafts = read_claims_file(&path)?;
            tracing::debug!(file = %path.display(), claims = drafts.len(), "Claims file loaded");
            ingested.drafts.extend(drafts);
            ingested.claim_files += 1;
            continue;
        }

        let source = match options
            .source_override
            .or_else(|| infer_source(&path, &patterns))
        {
            Some(source) => source,
            None if explicit => return Err(IngestError::UnknownSource { path }),
            None => {
                let msg = format!(
                    "Skipping '{}': source type cannot be inferred from its name",
                    path.display()
                );
                tracing::debug!(warning = %msg, "Ingest warning");
                ingested.warnings.push(msg);
                continue;
            }
        };

        let text = read_evidence_file(&path)?;
        tracing::debug!(
            file = %path.display(),
            source = %source,
            bytes = text.len(),
            "Evidence file loaded"
        );
        ingested.batches.push(EvidenceBatch { path, source, text });
    }

    tracing::info!(
        evidence_files = ingested.batches.len(),
        claim_files = ingested.claim_files,
        warnings = ingested.warnings.len(),
        "Ingest complete"
    );

    Ok(ingested)
}

/// Collect regular files under `root` in a stable (name-sorted) order.
fn walk_directory(
    root: &Path,
    max_depth: usize,
    files: &mut Vec<(PathBuf, bool)>,
    warnings: &mut Vec<String>,
) {
    let max_depth = max_depth.min(constants::ABSOLUTE_MAX_DEPTH);
    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Ingest warning");
                warnings.push(msg);
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push((entry.into_path(), false));
        }
    }
}

// =============================================================================
// Source inference
// =============================================================================

fn compile_source_patterns(
    patterns: &[(SourceType, Vec<String>)],
) -> Vec<(SourceType, Vec<glob::Pattern>)> {
    patterns
        .iter()
        .map(|(source, globs)| {
            let compiled = globs
                .iter()
                .filter_map(|p| match glob::Pattern::new(p) {
                    Ok(compiled) => Some(compiled),
                    Err(e) => {
                        tracing::warn!(pattern = p, error = %e, "Invalid source glob, skipping");
                        None
                    }
                })
                .collect();
            (*source, compiled)
        })
        .collect()
}

/// First source whose glob matches the file name (case-insensitive).
pub fn infer_source(
    path: &Path,
    patterns: &[(SourceType, Vec<glob::Pattern>)],
) -> Option<SourceType> {
    let opts = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let file_name = path.file_name()?.to_str()?;
    patterns
        .iter()
        .find(|(_, globs)| globs.iter().any(|g| g.matches_with(file_name, opts)))
        .map(|(source, _)| *source)
}

fn is_claims_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(constants::CLAIMS_FILE_SUFFIX))
}

// =============================================================================
// Readers
// =============================================================================

fn check_size(path: &Path) -> Result<(), IngestError> {
    let metadata = std::fs::metadata(path).map_err(|e| IngestError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > constants::MAX_EVIDENCE_FILE_SIZE {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_EVIDENCE_FILE_SIZE,
        });
    }
    Ok(())
}

/// Read an evidence file as text. Invalid UTF-8 is replaced rather than
/// rejected; the adapters skip lines they cannot match anyway.
pub fn read_evidence_file(path: &Path) -> Result<String, IngestError> {
    check_size(path)?;
    let bytes = std::fs::read(path).map_err(|e| IngestError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(file = %path.display(), "Evidence file is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Read a JSON array of claim drafts.
pub fn read_claims_file(path: &Path) -> Result<Vec<ClaimDraft>, IngestError> {
    check_size(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| IngestError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}
