//! harvest: proxy subscription aggregation CLI.
//!
//! The binary glues [`harvest_core`] and [`harvest_probe`] to the outside
//! world: configuration layering, logging, HTTP/file retrieval, Clash config
//! emission and the `run` / `list` commands.

pub mod cli;
pub mod config;
pub mod emit;
pub mod fetch;
pub mod logging;
