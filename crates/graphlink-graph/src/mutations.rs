//! Write operations for the graph store.
//!
//! Relationships are upserted with MERGE between endpoints located by MATCH,
//! so a missing endpoint never produces a placeholder node and repeated runs
//! never produce parallel edges. No properties are written.

use neo4rs::query;

use graphlink_core::{RelationshipUpsert, UpsertEffect};

use crate::client::{GraphClient, StoreError};

impl GraphClient {
    /// Ensure the relationship described by `req` exists.
    ///
    /// Runs as a single auto-committed statement. When no row comes back one
    /// of the endpoints is absent, and a read-only lookup determines which.
    pub async fn upsert_relationship(
        &self,
        req: &RelationshipUpsert,
    ) -> Result<UpsertEffect, StoreError> {
        let cypher = upsert_cypher(req);
        let q = query(&cypher)
            .param("from_value", req.from.value.clone())
            .param("to_value", req.to.value.clone());

        let rows = self.query_rows(q).await?;
        if rows.is_empty() {
            return Err(self.missing_endpoint(req).await?);
        }

        let mut created = false;
        for row in &rows {
            let before: i64 = row
                .get("before")
                .map_err(|e| StoreError::Serialization(format!("Failed to read count: {e}")))?;
            if before == 0 {
                created = true;
            }
        }

        tracing::debug!(
            rel_type = %req.relationship_type,
            from = %req.from.value,
            to = %req.to.value,
            pairs = rows.len(),
            created,
            "Relationship upserted"
        );

        Ok(if created {
            UpsertEffect::Created
        } else {
            UpsertEffect::MatchedExisting
        })
    }

    /// Build the `EndpointNotFound` error for a request whose MATCH came back
    /// empty. Prefers reporting the source endpoint when both are absent.
    async fn missing_endpoint(&self, req: &RelationshipUpsert) -> Result<StoreError, StoreError> {
        let endpoint = if self.count_endpoint(&req.from).await? == 0 {
            &req.from
        } else {
            &req.to
        };
        Ok(StoreError::EndpointNotFound {
            label: endpoint.label.clone(),
            key: endpoint.key.clone(),
            value: endpoint.value.clone(),
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn upsert_cypher(req: &RelationshipUpsert) -> String {
    let from_label = quote(&req.from.label);
    let from_key = quote(&req.from.key);
    let to_label = quote(&req.to.label);
    let to_key = quote(&req.to.key);
    let rel_type = quote(&req.relationship_type);

    format!(
        "MATCH (a:{from_label} {{{from_key}: $from_value}})
         MATCH (b:{to_label} {{{to_key}: $to_value}})
         OPTIONAL MATCH (a)-[existing:{rel_type}]->(b)
         WITH a, b, count(existing) AS before
         MERGE (a)-[:{rel_type}]->(b)
         RETURN before"
    )
}

/// Backtick-quote a label, property or relationship type for interpolation.
pub(crate) fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}
