//! # kotoba Config
//!
//! Type-safe configuration management for kotoba.
//!
//! This crate provides configuration loading (TOML or YAML), environment
//! overrides, validation and lock-free caching with atomic updates.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;

pub use cache::*;
pub use defaults::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
