//! In-process semantic network.
//!
//! Answers the same endpoints as the remote service from a small graph built
//! in code, and counts every request it serves. Used for offline runs and as
//! the test double behind [`SemanticClient`](super::SemanticClient).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use super::transport::{Transport, TransportError, TransportResult};
use super::{NodeInfo, Relation, RelationKind, RelationType};
use crate::factoid::normalize_term;

/// Shared view of how many requests a [`MemoryTransport`] has served.
#[derive(Debug, Clone, Default)]
pub struct RequestCounter(Arc<AtomicUsize>);

impl RequestCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A programmable graph implementing [`Transport`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    nodes: BTreeMap<String, NodeInfo>,
    relations: Vec<Relation>,
    catalog: Vec<RelationType>,
    failure: Option<u16>,
    requests: RequestCounter,
}

impl MemoryTransport {
    /// Empty graph whose catalog lists every [`RelationKind`] (ids 1..=12).
    pub fn new() -> Self {
        let catalog = RelationKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| RelationType {
                id: i as i64 + 1,
                name: kind.wire_name().to_string(),
                gpname: String::new(),
                help: String::new(),
            })
            .collect();
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Every request fails with `status`.
    pub fn failing_with(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::new()
        }
    }

    /// Handle for observing the request count after the transport is boxed.
    pub fn counter(&self) -> RequestCounter {
        self.requests.clone()
    }

    /// Add a node (idempotent).
    pub fn node(mut self, name: &str) -> Self {
        self.ensure_node(name);
        self
    }

    /// Add several nodes.
    pub fn nodes(mut self, names: &[&str]) -> Self {
        for name in names {
            self.ensure_node(name);
        }
        self
    }

    /// Add an edge `from -kind-> to` with weight `w`, creating both nodes.
    pub fn relation(mut self, from: &str, kind: RelationKind, to: &str, w: f64) -> Self {
        let node1 = self.ensure_node(from);
        let node2 = self.ensure_node(to);
        let relation_type = self.type_id(kind.wire_name()).unwrap_or(0);
        let id = self.relations.len() as i64 + 1;
        self.relations.push(Relation {
            id,
            node1,
            node2,
            relation_type,
            w,
        });
        self
    }

    fn ensure_node(&mut self, name: &str) -> i64 {
        let key = normalize_term(name);
        let next_id = self.nodes.len() as i64 + 1;
        self.nodes
            .entry(key.clone())
            .or_insert_with(|| NodeInfo {
                id: next_id,
                name: key,
                node_type: 1,
                w: 50.0,
            })
            .id
    }

    fn type_id(&self, name: &str) -> Option<i64> {
        self.catalog.iter().find(|t| t.name == name).map(|t| t.id)
    }

    fn node_by_id(&self, id: i64) -> Option<&NodeInfo> {
        self.nodes.values().find(|n| n.id == id)
    }

    fn relations(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        params: &[(&'static str, String)],
    ) -> TransportResult<Value> {
        let lookup = |name: Option<&str>| -> Option<Option<i64>> {
            match name {
                None => Some(None),
                Some(n) => self.nodes.get(&normalize_term(n)).map(|node| Some(node.id)),
            }
        };
        let (Some(from_id), Some(to_id)) = (lookup(from), lookup(to)) else {
            return Err(TransportError::Status { code: 404 });
        };

        let types: Vec<i64> = params
            .iter()
            .filter(|(k, _)| *k == "types_ids")
            .filter_map(|(_, v)| v.parse().ok())
            .collect();
        let number = |key: &str| -> Option<f64> {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.parse().ok())
        };
        let min_weight = number("min_weight");
        let max_weight = number("max_weight");
        let limit = number("limit").map(|l| l as usize).unwrap_or(usize::MAX);

        let relations: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| from_id.is_none_or(|id| r.node1 == id))
            .filter(|r| to_id.is_none_or(|id| r.node2 == id))
            .filter(|r| types.is_empty() || types.contains(&r.relation_type))
            .filter(|r| min_weight.is_none_or(|m| r.w >= m))
            .filter(|r| max_weight.is_none_or(|m| r.w <= m))
            .take(limit)
            .collect();

        let mut node_ids: Vec<i64> = relations.iter().flat_map(|r| [r.node1, r.node2]).collect();
        node_ids.sort_unstable();
        node_ids.dedup();
        let nodes: Vec<&NodeInfo> = node_ids.iter().filter_map(|id| self.node_by_id(*id)).collect();

        Ok(json!({ "nodes": nodes, "relations": relations }))
    }
}

impl Transport for MemoryTransport {
    fn get(&self, path: &str, params: &[(&'static str, String)]) -> TransportResult<Value> {
        self.requests.bump();
        if let Some(code) = self.failure {
            return Err(TransportError::Status { code });
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["v0", "relations_types"] => Ok(json!(self.catalog)),
            ["v0", "node_by_name", name] => self
                .nodes
                .get(&normalize_term(name))
                .map(|n| json!(n))
                .ok_or(TransportError::Status { code: 404 }),
            ["v0", "relations", "from", a, "to", b] => self.relations(Some(*a), Some(*b), params),
            ["v0", "relations", "from", a] => self.relations(Some(*a), None, params),
            ["v0", "relations", "to", b] => self.relations(None, Some(*b), params),
            _ => Err(TransportError::Status { code: 404 }),
        }
    }
}
