//! URL handling module for Decoy-Cloner
//!
//! This module provides URL normalization (the visited-set identity key),
//! host extraction, wildcard domain matching, and the link scope check that
//! keeps a clone on the target site.

mod normalize;
mod scope;

pub use normalize::{normalize, normalize_url};
pub use scope::{extract_domain, matches_domain_pattern, LinkScope};
