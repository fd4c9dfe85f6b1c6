//! The upsert seam between the import engine and a graph store.

use async_trait::async_trait;

use graphlink_core::{RelationshipUpsert, UpsertEffect};

use crate::client::{GraphClient, StoreError};

/// Applies one resolved relationship upsert against a store.
///
/// Each call is an independent unit of work: either the relationship ends up
/// present, or an error is returned and nothing was written. Implementations
/// must never create nodes or set properties.
#[async_trait]
pub trait UpsertExecutor: Send + Sync {
    async fn upsert(&self, request: &RelationshipUpsert) -> Result<UpsertEffect, StoreError>;
}

#[async_trait]
impl UpsertExecutor for GraphClient {
    async fn upsert(&self, request: &RelationshipUpsert) -> Result<UpsertEffect, StoreError> {
        self.upsert_relationship(request).await
    }
}

/// Accepts every request without touching a store.
///
/// Lets an operator see how a file would be classified before writing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

#[async_trait]
impl UpsertExecutor for DryRun {
    async fn upsert(&self, request: &RelationshipUpsert) -> Result<UpsertEffect, StoreError> {
        tracing::debug!(
            rel_type = %request.relationship_type,
            from = %request.from.value,
            to = %request.to.value,
            "Dry run: upsert not sent"
        );
        Ok(UpsertEffect::Applied)
    }
}
