//! UI components for Robsidian

pub mod create_project;
pub mod file_tree;
pub mod preview;
pub mod settings;
