//! Configuration module for Decoy-Cloner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use decoy_cloner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cloner.toml")).unwrap();
//! println!("Cloning {} to depth {}", config.cloner.target, config.cloner.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ClonerConfig, Config, HttpConfig, OutputConfig, Renderer, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_config_hash, compute_effective_hash, load_config, load_config_with_hash};
pub use validation::validate;
