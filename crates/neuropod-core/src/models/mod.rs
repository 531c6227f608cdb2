//! Data definitions: tensor specs and loader configuration.

pub mod config;
pub mod spec;
