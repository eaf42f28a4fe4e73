//! Core domain types for the Quarry environment resolver.
//!
//! This crate contains:
//! - Environment records (`Env`) and their typed field table
//! - Selector match values and category-tagged matchers
//! - The shared error type

pub mod env;
pub mod error;
pub mod selector;

pub use env::{Atom, Env, EnvValue, FieldKind};
pub use error::{Error, Result};
pub use selector::{Match, SelectorFactory, SelectorMatcher};
