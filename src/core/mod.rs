//! Core functionality for the vault, project detection and configuration

pub mod config;
pub mod file_system;
pub mod project;
pub mod vault;
