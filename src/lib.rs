//! Inheritance graph, resolution and editing for slicer profile documents.

pub mod cli;
pub mod config;
pub mod profile;
