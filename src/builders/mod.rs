//! Builders to construct scheduler components from configuration.

pub mod runtime_builder;

pub use runtime_builder::{build_runtime, build_runtime_from_env, Runtime};
