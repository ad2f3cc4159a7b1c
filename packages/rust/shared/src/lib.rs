//! Shared types, error model, and configuration for Themis.
//!
//! This crate is the foundation depended on by all other Themis crates.
//! It provides:
//! - [`ThemisError`]: the unified error type
//! - Domain types ([`AssignmentLink`]) and the [`AssignmentSource`] fetch capability
//! - Configuration ([`AppConfig`], [`PullConfig`], config loading)

pub mod config;
pub mod error;
pub mod source;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_TREE_FILE, PortalConfig, PullConfig, TreeConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, parse_url,
};
pub use error::{Result, ThemisError};
pub use source::AssignmentSource;
pub use types::AssignmentLink;
