//! Library wrapper around the `fpx` CLI implementation.
//!
//! The CLI is exercised through its binary (`src/main.rs`) and integration
//! tests; compiling `main.rs` as a module here keeps `cargo test --lib` a fast
//! typecheck of the CLI code.

#[allow(dead_code)]
#[path = "main.rs"]
mod main_bin;
