//! Configuration module for mapbrush
//!
//! Provides types, discovery and loading for `mapbrush.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
