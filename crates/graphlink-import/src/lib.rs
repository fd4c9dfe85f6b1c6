//! graphlink-import: Relationship importer for pre-existing graph nodes.
//!
//! Reads tabular row sources, resolves endpoint keys through declarative
//! relationship mappings, and upserts one relationship per valid row. Bad
//! rows are counted and reported; they never stop the rest of the file.

pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod source;
