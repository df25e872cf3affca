// DepSleuth - lib.rs
//
// Library entry point. The `depsleuth` binary in `main.rs` is a thin shell
// over these modules; integration tests use them directly.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
