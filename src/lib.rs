//! cardmatch
//!
//! File-based collaborators around the `cardmatch-common` engine: card
//! directory scanning, registry snapshot and style source loading, JSON
//! result files and the CLI definition.

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod scanner;
