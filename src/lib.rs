// Library module for treesum
// Re-exports modules for use in integration tests and the CLI

pub mod config;
pub mod hash;
pub mod job;
pub mod logging;
