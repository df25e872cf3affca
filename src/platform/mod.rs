// DepSleuth - platform/mod.rs
//
// Platform abstraction layer: directory resolution and config.toml.
// Dependencies: util, core configuration types, directories crate.
// Must NOT depend on: app.

pub mod config;
