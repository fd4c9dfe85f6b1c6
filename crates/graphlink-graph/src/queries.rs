//! Read operations against the graph store.

use neo4rs::query;

use graphlink_core::{EndpointRef, RelationshipUpsert};

use crate::client::{GraphClient, StoreError};
use crate::mutations::quote;

impl GraphClient {
    /// Count nodes matching a label and key property value.
    pub async fn count_endpoint(&self, endpoint: &EndpointRef) -> Result<i64, StoreError> {
        let cypher = format!(
            "MATCH (n:{} {{{}: $value}})
             RETURN count(n) AS cnt",
            quote(&endpoint.label),
            quote(&endpoint.key)
        );

        let q = query(&cypher).param("value", endpoint.value.clone());
        self.count(q).await
    }

    /// Count relationships of the request's type between its two endpoints.
    pub async fn count_relationships(&self, req: &RelationshipUpsert) -> Result<i64, StoreError> {
        let cypher = format!(
            "MATCH (a:{} {{{}: $from_value}})-[r:{}]->(b:{} {{{}: $to_value}})
             RETURN count(r) AS cnt",
            quote(&req.from.label),
            quote(&req.from.key),
            quote(&req.relationship_type),
            quote(&req.to.label),
            quote(&req.to.key)
        );

        let q = query(&cypher)
            .param("from_value", req.from.value.clone())
            .param("to_value", req.to.value.clone());
        self.count(q).await
    }

    async fn count(&self, q: neo4rs::Query) -> Result<i64, StoreError> {
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }
}
