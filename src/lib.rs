//! Uplink: watch a mission folder tree and push finished products to storage.
//!
//! The binary in `main.rs` is a thin shell over [`cli::run`]; the modules
//! are public so each stage can be driven on its own.

pub mod classify;
pub mod cli;
pub mod config;
pub mod key;
pub mod model;
pub mod pipeline;
pub mod scaffold;
pub mod stability;
pub mod storage;
pub mod watch;
