//! # kotoba CLI
//!
//! Composition root for the kotoba localization engine: turns a
//! [`kotoba_config::Config`] into a running [`kotoba_i18n::Localizer`] bound
//! to a sample popup document.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod cli;
pub mod error;

pub use app::*;
pub use cli::*;
pub use error::*;
