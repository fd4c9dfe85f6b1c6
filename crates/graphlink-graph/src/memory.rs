//! In-memory adjacency store.
//!
//! Mirrors the relationship semantics of the Neo4j client: endpoints are
//! located by label and key property, a missing endpoint is an error, and a
//! relationship type between an ordered pair of nodes exists at most once.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use graphlink_core::{EndpointRef, RelationshipUpsert, UpsertEffect};

use crate::client::StoreError;
use crate::executor::UpsertExecutor;

#[derive(Debug)]
struct MemNode {
    label: String,
    properties: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct MemState {
    nodes: Vec<MemNode>,
    relationships: HashSet<(usize, String, usize)>,
}

impl MemState {
    fn find(&self, endpoint: &EndpointRef) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                n.label == endpoint.label
                    && n.properties.get(&endpoint.key) == Some(&endpoint.value)
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// A thread-safe graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<MemState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a node and return its internal index.
    pub fn add_node(&self, label: &str, properties: &[(&str, &str)]) -> usize {
        let mut state = self.lock();
        state.nodes.push(MemNode {
            label: label.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        state.nodes.len() - 1
    }

    /// Convenience for the common single-key node.
    pub fn add_keyed(&self, label: &str, key: &str, value: &str) -> usize {
        self.add_node(label, &[(key, value)])
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Number of `rel_type` relationships from nodes matching `from` to nodes
    /// matching `to`.
    pub fn relationship_count(&self, from: &EndpointRef, rel_type: &str, to: &EndpointRef) -> usize {
        let state = self.lock();
        let sources = state.find(from);
        let targets = state.find(to);
        state
            .relationships
            .iter()
            .filter(|(a, t, b)| t == rel_type && sources.contains(a) && targets.contains(b))
            .count()
    }

    pub fn has_relationship(&self, from: &EndpointRef, rel_type: &str, to: &EndpointRef) -> bool {
        self.relationship_count(from, rel_type, to) > 0
    }

    /// Number of relationships of the given type across the whole graph.
    pub fn count_of_type(&self, rel_type: &str) -> usize {
        self.lock()
            .relationships
            .iter()
            .filter(|(_, t, _)| t == rel_type)
            .count()
    }

    pub fn total_relationships(&self) -> usize {
        self.lock().relationships.len()
    }

    /// Every relationship as a sorted `(from node, type, to node)` list.
    pub fn snapshot(&self) -> Vec<(usize, String, usize)> {
        let mut rels: Vec<_> = self.lock().relationships.iter().cloned().collect();
        rels.sort();
        rels
    }
}

#[async_trait]
impl UpsertExecutor for MemoryGraph {
    async fn upsert(&self, request: &RelationshipUpsert) -> Result<UpsertEffect, StoreError> {
        let mut state = self.lock();

        let sources = state.find(&request.from);
        if sources.is_empty() {
            return Err(not_found(&request.from));
        }
        let targets = state.find(&request.to);
        if targets.is_empty() {
            return Err(not_found(&request.to));
        }

        let mut created = false;
        for &a in &sources {
            for &b in &targets {
                created |= state
                    .relationships
                    .insert((a, request.relationship_type.clone(), b));
            }
        }

        Ok(if created {
            UpsertEffect::Created
        } else {
            UpsertEffect::MatchedExisting
        })
    }
}

fn not_found(endpoint: &EndpointRef) -> StoreError {
    StoreError::EndpointNotFound {
        label: endpoint.label.clone(),
        key: endpoint.key.clone(),
        value: endpoint.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(label: &str, key: &str, value: &str) -> EndpointRef {
        EndpointRef {
            label: label.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    fn has_account(cust: &str, acct: &str) -> RelationshipUpsert {
        RelationshipUpsert {
            from: ep("Customer", "CustomerID", cust),
            to: ep("Account", "AccountID", acct),
            relationship_type: "HAS_ACCOUNT".into(),
        }
    }

    fn seeded() -> MemoryGraph {
        let g = MemoryGraph::new();
        g.add_keyed("Customer", "CustomerID", "C1");
        g.add_keyed("Account", "AccountID", "A1");
        g
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let g = seeded();
        let req = has_account("C1", "A1");

        assert_eq!(g.upsert(&req).await.unwrap(), UpsertEffect::Created);
        for _ in 0..5 {
            assert_eq!(g.upsert(&req).await.unwrap(), UpsertEffect::MatchedExisting);
        }

        assert_eq!(g.relationship_count(&req.from, "HAS_ACCOUNT", &req.to), 1);
        assert_eq!(g.total_relationships(), 1);
    }

    #[tokio::test]
    async fn test_missing_endpoint_creates_nothing() {
        let g = seeded();

        let err = g.upsert(&has_account("C1", "A9")).await.unwrap_err();
        match err {
            StoreError::EndpointNotFound { label, value, .. } => {
                assert_eq!(label, "Account");
                assert_eq!(value, "A9");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = g.upsert(&has_account("C9", "A1")).await.unwrap_err();
        assert!(matches!(err, StoreError::EndpointNotFound { ref label, .. } if label == "Customer"));

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.total_relationships(), 0);
    }

    #[tokio::test]
    async fn test_direction_and_type_are_distinct() {
        let g = seeded();
        g.upsert(&has_account("C1", "A1")).await.unwrap();

        let other_type = RelationshipUpsert {
            relationship_type: "OWNS".into(),
            ..has_account("C1", "A1")
        };
        assert_eq!(g.upsert(&other_type).await.unwrap(), UpsertEffect::Created);

        let reversed = RelationshipUpsert {
            from: ep("Account", "AccountID", "A1"),
            to: ep("Customer", "CustomerID", "C1"),
            relationship_type: "HAS_ACCOUNT".into(),
        };
        assert_eq!(g.upsert(&reversed).await.unwrap(), UpsertEffect::Created);

        assert_eq!(g.total_relationships(), 3);
        assert_eq!(g.count_of_type("HAS_ACCOUNT"), 2);
    }

    #[tokio::test]
    async fn test_key_match_requires_label() {
        let g = seeded();
        // Same key property and value, different label.
        g.add_keyed("Prospect", "CustomerID", "C2");

        let err = g.upsert(&has_account("C2", "A1")).await.unwrap_err();
        assert!(matches!(err, StoreError::EndpointNotFound { .. }));
    }
}
