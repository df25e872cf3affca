// DepSleuth - core/mod.rs
//
// Core business logic layer: data model, grammars, adapters, processing and
// conflict resolution.
// Dependencies: util, and crates without I/O (regex, chrono, serde, uuid).
// Must NOT depend on: platform, app, or touch the filesystem.

pub mod adapter;
pub mod adapters;
pub mod grammar;
pub mod model;
pub mod processing;
pub mod resolution;
pub mod timestamp;
