//! graphlink-core: Shared types for the graphlink relationship importer.
//!
//! This crate provides the foundational types used across all graphlink components:
//! - Records produced by row sources
//! - The declarative relationship mapping model
//! - Endpoint references and upsert requests sent to the graph store
//! - Per-row outcomes and per-mapping summaries
//! - Configuration errors

pub mod error;
pub mod mapping;
pub mod types;

pub use error::ConfigurationError;
pub use mapping::{EndpointMapping, FieldSelector, RelationshipMapping};
pub use types::{
    EndpointRef, MappingSummary, Record, RelationshipUpsert, RowFailure, UpsertEffect,
    UpsertOutcome,
};
