//! Terminal side of plan execution
//!
//! The orchestration itself lives in the `hostplan` crate; this module
//! wires it to config and prints progress and summaries.

pub mod display;
pub mod executor;

pub use display::{display_report, display_slice};
pub use executor::{ConsoleObserver, ExecuteOverrides, build_registry, exec_options};
