// DepSleuth - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and logging initialisation
// 3. Grammar loading (built-in + user-defined)
// 4. Ingest, pipeline run and JSON output

use clap::Parser;
use depsleuth::app::pipeline::{Pipeline, PipelineOutput};
use depsleuth::app::{grammar_mgr, ingest};
use depsleuth::core::model::SourceType;
use depsleuth::platform::config::{self, AppConfig, PlatformPaths};
use depsleuth::util;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// DepSleuth - discover application dependencies from heterogeneous evidence.
///
/// Reads router, gateway, CI/CD, telemetry and network logs plus codebase
/// manifests, turns every line into a claim about a directed edge, and prints
/// one canonical claim per edge as JSON.
#[derive(Parser, Debug)]
#[command(name = "depsleuth", version, about)]
struct Cli {
    /// Evidence files or directories.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Force the source type for all inputs (e.g. ROUTER_LOG, codebase).
    #[arg(short = 's', long = "source")]
    source: Option<String>,

    /// Force a grammar id (format tag) instead of auto-detection.
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Configuration file (default: config.toml in the platform config dir).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Additional directory containing user-defined grammars.
    #[arg(short = 'g', long = "grammar-dir")]
    grammar_dir: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Print a run summary to stderr.
    #[arg(long)]
    summary: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config comes first so its log level can seed the subscriber; its
    // warnings are reported once logging is up.
    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file());
    let (app_config, config_warnings) = config::load_config(&config_path);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "DepSleuth starting"
    );

    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Configuration warning");
    }

    // Grammar directories, lowest precedence first
    let mut grammar_dirs: Vec<&Path> = vec![platform_paths.user_grammars_dir.as_path()];
    if let Some(dir) = app_config.user_grammar_dir.as_deref() {
        grammar_dirs.push(dir);
    }
    if let Some(dir) = cli.grammar_dir.as_deref() {
        grammar_dirs.push(dir);
    }

    let (catalog, grammar_errors) = grammar_mgr::load_catalog(&grammar_dirs);
    for err in &grammar_errors {
        tracing::warn!(error = %err, "Grammar loading warning");
    }

    let pipeline = Pipeline::from_config(&app_config, &catalog);

    let source = match resolve_source(&cli, &pipeline) {
        Ok(source) => source,
        Err(msg) => {
            tracing::error!(error = %msg, "Invalid arguments");
            eprintln!("Error: {msg}");
            return ExitCode::FAILURE;
        }
    };

    let output = match run(&cli, &app_config, &pipeline, source) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output.claims)
    } else {
        serde_json::to_string(&output.claims)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise claims");
            eprintln!("Error: Failed to serialise claims: {e}");
            return ExitCode::FAILURE;
        }
    }

    if cli.summary {
        let s = &output.summary;
        eprintln!(
            "{} evidence file(s), {} parsed claim(s), {} external claim(s), \
             {} edge(s), {} fused",
            s.evidence_files, s.parsed_claims, s.external_claims, s.edges, s.fused_edges
        );
    }

    ExitCode::SUCCESS
}

/// Ingest every input and run the pipeline over it.
fn run(
    cli: &Cli,
    app_config: &AppConfig,
    pipeline: &Pipeline,
    source: Option<SourceType>,
) -> util::error::Result<PipelineOutput> {
    let options = ingest::IngestOptions::from_config(app_config, source);
    let ingested = ingest::ingest(&cli.inputs, &options)?;
    for warning in &ingested.warnings {
        tracing::warn!(warning = %warning, "Ingest warning");
    }
    Ok(pipeline.run(&ingested, cli.format.as_deref())?)
}

/// Source type forced for every input: `--source` if given, otherwise the
/// source owning `--format`, otherwise none (infer per file).
///
/// An unknown `--format` is only a warning; no grammar matches it, so the
/// run yields an empty result.
fn resolve_source(cli: &Cli, pipeline: &Pipeline) -> Result<Option<SourceType>, String> {
    let forced = match cli.source.as_deref() {
        Some(raw) => {
            let source: SourceType = raw.parse().map_err(|e| format!("{e}"))?;
            if !source.is_evidence() {
                return Err(format!("'{source}' is not an evidence source"));
            }
            Some(source)
        }
        None => None,
    };

    let Some(format) = cli.format.as_deref() else {
        return Ok(forced);
    };

    match (forced, pipeline.registry().source_for_format(format)) {
        (_, None) => {
            let known: Vec<String> = pipeline
                .registry()
                .formats()
                .into_iter()
                .flat_map(|(_, ids)| ids)
                .collect();
            tracing::warn!(
                format,
                known = %known.join(", "),
                "Unknown format, no evidence will be parsed"
            );
            Ok(forced)
        }
        (Some(forced), Some(owner)) if forced != owner => Err(format!(
            "Format '{format}' belongs to {owner}, not {forced}"
        )),
        (_, Some(owner)) => Ok(Some(owner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("depsleuth").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_unknown_format_is_not_fatal() {
        let pipeline = Pipeline::default();
        let unknown = cli(&["-f", "no-such-format", "in.log"]);
        assert_eq!(resolve_source(&unknown, &pipeline), Ok(None));

        let forced = cli(&["-s", "network", "-f", "no-such-format", "in.log"]);
        assert_eq!(
            resolve_source(&forced, &pipeline),
            Ok(Some(SourceType::Network))
        );
    }

    #[test]
    fn test_format_selects_its_source() {
        let pipeline = Pipeline::default();
        assert_eq!(
            resolve_source(&cli(&["-f", "haproxy", "in.log"]), &pipeline),
            Ok(Some(SourceType::RouterLog))
        );
        let mismatch = cli(&["-s", "CODEBASE", "-f", "haproxy", "in.log"]);
        assert!(resolve_source(&mismatch, &pipeline).is_err());
        assert!(resolve_source(&cli(&["-s", "CONFLICT_RESOLVED", "in.log"]), &pipeline).is_err());
        assert!(resolve_source(&cli(&["-s", "bogus", "in.log"]), &pipeline).is_err());
    }
}
