// DepSleuth - app/grammar_mgr.rs
//
// Manages loading of line grammars from both built-in sources
// (embedded in the binary) and user-defined TOML files on disk.
// User grammars override built-in grammars with the same ID.

use crate::core::grammar::{self, GrammarCatalog, LineGrammar};
use crate::util::constants;
use crate::util::error::GrammarError;
use std::path::Path;
use std::sync::Arc;

/// Build the grammar catalog: built-in grammars, then each user directory
/// in order.
///
/// Invalid grammar files are skipped (non-fatal); the errors are returned so
/// the caller can report them.
pub fn load_catalog(user_grammar_dirs: &[&Path]) -> (GrammarCatalog, Vec<GrammarError>) {
    let builtin = grammar::builtin_catalog();
    let mut errors = Vec::new();

    tracing::info!(builtin_count = builtin.len(), "Loaded built-in grammars");

    let mut user_grammars = Vec::new();
    for dir in user_grammar_dirs {
        if dir.is_dir() {
            let (loaded, dir_errors) = load_user_grammars(dir);
            user_grammars.extend(loaded);
            errors.extend(dir_errors);
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User grammar directory does not exist (skipping)"
            );
        }
    }

    let mut catalog = builtin.with_overrides(user_grammars);

    // Enforce maximum grammar count
    if catalog.len() > constants::MAX_GRAMMARS {
        tracing::warn!(
            count = catalog.len(),
            max = constants::MAX_GRAMMARS,
            "Too many grammars loaded, truncating"
        );
        errors.push(GrammarError::TooManyGrammars {
            count: catalog.len(),
            max: constants::MAX_GRAMMARS,
        });
        catalog.truncate(constants::MAX_GRAMMARS);
    }

    tracing::info!(total = catalog.len(), "Grammar loading complete");

    (catalog, errors)
}

/// Load user-defined grammars from a directory (non-recursive, `*.toml`).
/// Files are read in name order so overrides are reproducible.
fn load_user_grammars(dir: &Path) -> (Vec<Arc<dyn LineGrammar>>, Vec<GrammarError>) {
    let mut grammars = Vec::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(GrammarError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (grammars, errors);
        }
    };

    let mut paths = Vec::new();
    for entry_result in entries {
        match entry_result {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => errors.push(GrammarError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }
    paths.sort();

    for path in paths {
        // Only process .toml files
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                errors.push(GrammarError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        if metadata.len() > constants::MAX_GRAMMAR_FILE_SIZE {
            errors.push(GrammarError::FileTooLarge {
                path: path.clone(),
                size: metadata.len(),
                max_size: constants::MAX_GRAMMAR_FILE_SIZE,
            });
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                errors.push(GrammarError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        match grammar::parse_grammar_toml(&content, &path)
            .and_then(|def| grammar::validate_and_compile(def, &path, false))
        {
            Ok(g) => grammars.push(g),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping invalid grammar");
                errors.push(e);
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        loaded = grammars.len(),
        errors = errors.len(),
        "User grammars scanned"
    );

    (grammars, errors)
}
