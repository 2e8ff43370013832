// src/config/mod.rs

//! TOML launch descriptions.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a launch file from disk or a string (`loader.rs`).
//! - Validate it before anything is spawned (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{LaunchConfig, RawLaunchConfig};
