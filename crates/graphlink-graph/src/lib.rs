//! graphlink-graph — the graph store boundary.
//!
//! Every relationship write issued by graphlink flows through the
//! [`UpsertExecutor`] trait. [`GraphClient`] implements it against Neo4j;
//! [`MemoryGraph`] implements it in memory for tests and local checks.
//! Neither ever creates nodes.

pub mod client;
pub mod executor;
pub mod memory;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, StoreError};
pub use executor::{DryRun, UpsertExecutor};
pub use memory::MemoryGraph;
