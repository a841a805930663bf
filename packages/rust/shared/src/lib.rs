//! Shared types, error model, and configuration for placeseo.
//!
//! This crate is the foundation depended on by all other placeseo crates.
//! It provides:
//! - [`PlaceSeoError`]: the unified error type
//! - Domain types ([`StageName`], [`ArtifactKind`], [`BrandPaths`], [`Intake`], [`Violation`])
//! - Configuration ([`AppConfig`], [`ProjectPaths`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CollectorConfig, DefaultsConfig, ImproverConfig, ProjectPaths,
    StageCommandConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CircuitOpenError, PlaceSeoError, Result};
pub use types::{
    Address, ArtifactKind, BrandPaths, Business, CURRENT_SCHEMA_VERSION, Category, Intake, RunId,
    StageName, Violation, check_brand,
};
