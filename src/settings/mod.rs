//! Layered configuration: built-in defaults, then a TOML file, then
//! `TRAVELMAP__*` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
