//! Environment selection and value resolution for Quarry.
//!
//! This crate hosts:
//! - The registry context object holding envs, selector categories, and
//!   mappings for one load session
//! - Specificity-based mapping selection (most-specific-rule-wins)
//! - Field value resolution with prefix fallback and cross-env references
//! - Load-instruction processing and presentation substitutions

pub mod load;
pub mod mapping;
pub mod registry;
pub mod resolve;
pub mod subst;

pub use load::{ConfigSources, Settings, SourceValue, ValueFns, load};
pub use mapping::Mapping;
pub use registry::{Criteria, Registry};
pub use resolve::{resolve_list, resolve_scalar};
