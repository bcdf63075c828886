//! Merges the TOML config file, `--set` overrides and command-line flags into
//! the core configuration. Precedence, highest first: flags, `--set`, file,
//! defaults.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_index_config, build_lookup_config, build_search_config};
pub use models::{IndexSettings, LookupSettings};
