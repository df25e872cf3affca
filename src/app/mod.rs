// DepSleuth - app/mod.rs
//
// Application layer: reading evidence from disk, grammar loading, and the
// end-to-end pipeline run.
// Dependencies: core, platform configuration, util.

pub mod grammar_mgr;
pub mod ingest;
pub mod pipeline;
