//! Gateway to the external lexical-semantic network.
//!
//! - [`Transport`]: raw GET access to the network's HTTP endpoints
//!   ([`HttpTransport`] over `ureq`, [`MemoryTransport`] in process)
//! - [`ResponseCache`]: two-tier (memory → disk) response cache
//! - [`SemanticClient`]: typed, cached queries and relation checks
//!
//! Failures never leave this module: a non-success response reads as
//! "no data".

pub mod cache;
pub mod client;
pub mod memory;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use cache::{CacheKey, ResponseCache};
pub use client::{RelationQuery, SemanticClient};
pub use memory::MemoryTransport;
pub use transport::{HttpTransport, Transport, TransportError, TransportResult};

/// Relation kinds the system resolves from the network's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    Agent,
    AgentInverse,
    IsA,
    Hyponym,
    Patient,
    ActionLocation,
    Time,
    Instrument,
    Masculine,
    Feminine,
    Synonym,
    StrictSynonym,
}

impl RelationKind {
    pub const ALL: [RelationKind; 12] = [
        RelationKind::Agent,
        RelationKind::AgentInverse,
        RelationKind::IsA,
        RelationKind::Hyponym,
        RelationKind::Patient,
        RelationKind::ActionLocation,
        RelationKind::Time,
        RelationKind::Instrument,
        RelationKind::Masculine,
        RelationKind::Feminine,
        RelationKind::Synonym,
        RelationKind::StrictSynonym,
    ];

    /// Name of the relation type in the network's catalog.
    pub fn wire_name(self) -> &'static str {
        match self {
            RelationKind::Agent => "r_agent",
            RelationKind::AgentInverse => "r_agent-1",
            RelationKind::IsA => "r_isa",
            RelationKind::Hyponym => "r_hypo",
            RelationKind::Patient => "r_patient",
            RelationKind::ActionLocation => "r_action_lieu",
            RelationKind::Time => "r_time",
            RelationKind::Instrument => "r_instr",
            RelationKind::Masculine => "r_masc",
            RelationKind::Feminine => "r_fem",
            RelationKind::Synonym => "r_syn",
            RelationKind::StrictSynonym => "r_syn_strict",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == name)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A node of the semantic network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub node_type: i64,
    #[serde(default)]
    pub w: f64,
}

/// A weighted, typed edge `node1 → node2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub id: i64,
    pub node1: i64,
    pub node2: i64,
    #[serde(rename = "type")]
    pub relation_type: i64,
    #[serde(default)]
    pub w: f64,
}

/// Result of a relation query: the edges plus the nodes they touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSet {
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl RelationSet {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn node(&self, id: i64) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// `(target name, weight)` for every edge whose target node is known.
    pub fn targets(&self) -> Vec<(&str, f64)> {
        self.relations
            .iter()
            .filter_map(|r| self.node(r.node2).map(|n| (n.name.as_str(), r.w)))
            .collect()
    }
}

/// An entry of the relation-type catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub gpname: String,
    #[serde(default)]
    pub help: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for kind in RelationKind::ALL {
            assert_eq!(RelationKind::from_wire(kind.wire_name()), Some(kind));
        }
        assert_eq!(RelationKind::from_wire("r_bogus"), None);
    }

    #[test]
    fn relation_set_decodes_network_payload() {
        let payload = serde_json::json!({
            "nodes": [
                {"id": 1, "name": "chat", "type": 1, "w": 50},
                {"id": 2, "name": "animal", "type": 1, "w": 80}
            ],
            "relations": [
                {"id": 10, "node1": 1, "node2": 2, "type": 6, "w": 120}
            ]
        });
        let set: RelationSet = serde_json::from_value(payload).unwrap();
        assert_eq!(set.targets(), vec![("animal", 120.0)]);
    }

    #[test]
    fn missing_collections_decode_as_empty() {
        let set: RelationSet = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(set.is_empty());
    }
}
