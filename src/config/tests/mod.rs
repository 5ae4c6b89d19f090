//! Unit tests for tlsdind configuration.
//!
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults and TOML parsing
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence

mod helpers;
