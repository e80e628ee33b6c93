//! Typed, cached queries against the semantic network.
//!
//! Every query is keyed on its method name and normalized parameters; the
//! cache is consulted before the transport and filled after it. A failed
//! request yields "no data" and is not cached.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::cache::{CacheKey, ResponseCache};
use super::transport::Transport;
use super::{NodeInfo, RelationKind, RelationSet, RelationType};
use crate::config::NetworkConfig;
use crate::factoid::normalize_term;

/// Filters for relation queries. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationQuery {
    pub type_ids: Vec<i64>,
    pub min_weight: Option<i64>,
    pub max_weight: Option<i64>,
    pub limit: Option<u32>,
}

impl RelationQuery {
    pub fn of_type(id: i64) -> Self {
        Self {
            type_ids: vec![id],
            ..Default::default()
        }
    }

    pub fn min_weight(mut self, w: i64) -> Self {
        self.min_weight = Some(w);
        self
    }

    pub fn max_weight(mut self, w: i64) -> Self {
        self.max_weight = Some(w);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = self
            .type_ids
            .iter()
            .map(|id| ("types_ids", id.to_string()))
            .collect();
        if let Some(w) = self.min_weight {
            params.push(("min_weight", w.to_string()));
        }
        if let Some(w) = self.max_weight {
            params.push(("max_weight", w.to_string()));
        }
        if let Some(n) = self.limit {
            params.push(("limit", n.to_string()));
        }
        params
    }

    fn key_fields(&self, key: &mut Map<String, Value>) {
        key.insert("types_ids".into(), Value::from(self.type_ids.clone()));
        key.insert("min_weight".into(), Value::from(self.min_weight));
        key.insert("max_weight".into(), Value::from(self.max_weight));
        key.insert("limit".into(), Value::from(self.limit));
    }
}

/// One logical request: what to fetch and how to key it.
struct Request {
    method: &'static str,
    path: String,
    params: Vec<(&'static str, String)>,
    key: Map<String, Value>,
    delay: Option<Duration>,
}

/// Cached client for the semantic network.
pub struct SemanticClient {
    transport: Box<dyn Transport>,
    cache: Option<ResponseCache>,
    settings: NetworkConfig,
    catalog: Vec<RelationType>,
    relation_ids: HashMap<RelationKind, i64>,
}

impl SemanticClient {
    /// Build a client over any transport and fetch the relation-type catalog.
    pub fn new(
        transport: Box<dyn Transport>,
        settings: NetworkConfig,
        cache: Option<ResponseCache>,
    ) -> Self {
        let mut client = Self {
            transport,
            cache,
            settings,
            catalog: Vec::new(),
            relation_ids: HashMap::new(),
        };
        client.catalog = client.relation_types();
        client.relation_ids = client
            .catalog
            .iter()
            .filter_map(|t| RelationKind::from_wire(&t.name).map(|k| (k, t.id)))
            .collect();
        tracing::info!(
            catalog = client.catalog.len(),
            resolved = client.relation_ids.len(),
            "semantic network client ready"
        );
        client
    }

    fn fetch(&self, request: Request) -> Option<Value> {
        let key = CacheKey::new(request.method, &request.key);
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&key) {
                return Some(data);
            }
        }

        if let Some(delay) = request.delay {
            std::thread::sleep(delay);
        }
        match self.transport.get(&request.path, &request.params) {
            Ok(data) => {
                if let Some(cache) = &self.cache {
                    cache.put(&key, data.clone());
                }
                Some(data)
            }
            Err(e) => {
                tracing::warn!(method = request.method, path = %request.path, error = %e, "semantic network request failed");
                None
            }
        }
    }

    fn fetch_as<T: DeserializeOwned>(&self, request: Request) -> Option<T> {
        let method = request.method;
        let data = self.fetch(request)?;
        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(method, error = %e, "payload does not match the expected shape");
                None
            }
        }
    }

    /// Node for `term`, or `None` if the network does not know it.
    pub fn lookup_node(&self, term: &str) -> Option<NodeInfo> {
        let name = normalize_term(term);
        let mut key = Map::new();
        key.insert("node_name".into(), Value::from(name.clone()));
        self.fetch_as(Request {
            method: "node_by_name",
            path: format!("/v0/node_by_name/{name}"),
            params: Vec::new(),
            key,
            delay: None,
        })
    }

    /// Outgoing relations of `term`.
    pub fn relations_from(&self, term: &str, query: &RelationQuery) -> RelationSet {
        let name = normalize_term(term);
        let mut key = Map::new();
        key.insert("node_name".into(), Value::from(name.clone()));
        query.key_fields(&mut key);
        self.fetch_as(Request {
            method: "relations_from",
            path: format!("/v0/relations/from/{name}"),
            params: query.params(),
            key,
            delay: None,
        })
        .unwrap_or_default()
    }

    /// Incoming relations of `term`.
    pub fn relations_to(&self, term: &str, query: &RelationQuery) -> RelationSet {
        let name = normalize_term(term);
        let mut key = Map::new();
        key.insert("node_name".into(), Value::from(name.clone()));
        query.key_fields(&mut key);
        self.fetch_as(Request {
            method: "relations_to",
            path: format!("/v0/relations/to/{name}"),
            params: query.params(),
            key,
            delay: None,
        })
        .unwrap_or_default()
    }

    /// Relations from `source` to `target`.
    pub fn relations_between(&self, source: &str, target: &str, query: &RelationQuery) -> RelationSet {
        let (a, b) = (normalize_term(source), normalize_term(target));
        let mut key = Map::new();
        key.insert("node1_name".into(), Value::from(a.clone()));
        key.insert("node2_name".into(), Value::from(b.clone()));
        query.key_fields(&mut key);
        self.fetch_as(Request {
            method: "relations_from_to",
            path: format!("/v0/relations/from/{a}/to/{b}"),
            params: query.params(),
            key,
            delay: None,
        })
        .unwrap_or_default()
    }

    /// Fetch the relation-type catalog (cached; throttled before any network request).
    pub fn relation_types(&self) -> Vec<RelationType> {
        self.fetch_as(Request {
            method: "relations_types",
            path: "/v0/relations_types".into(),
            params: Vec::new(),
            key: Map::new(),
            delay: Some(Duration::from_millis(self.settings.catalog_delay_ms)),
        })
        .unwrap_or_default()
    }

    /// The catalog fetched at construction.
    pub fn relation_type_catalog(&self) -> &[RelationType] {
        &self.catalog
    }

    /// Catalog id of `kind`, if the network advertised it.
    pub fn relation_id(&self, kind: RelationKind) -> Option<i64> {
        self.relation_ids.get(&kind).copied()
    }

    /// Whether `source -kind-> target` exists with at least the configured
    /// minimum weight.
    pub fn has_relation(&self, source: &str, target: &str, kind: RelationKind) -> bool {
        let Some(id) = self.relation_id(kind) else {
            tracing::warn!(relation = %kind, "relation type missing from the catalog");
            return false;
        };
        let query = RelationQuery::of_type(id)
            .min_weight(self.settings.relation_min_weight)
            .limit(self.settings.relation_limit);
        !self.relations_between(source, target, &query).is_empty()
    }

    /// [`has_relation`](Self::has_relation) by catalog name; unknown names are `false`.
    pub fn has_relation_named(&self, source: &str, target: &str, name: &str) -> bool {
        match RelationKind::from_wire(name) {
            Some(kind) => self.has_relation(source, target, kind),
            None => {
                tracing::warn!(relation = name, "unknown relation type");
                false
            }
        }
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn settings(&self) -> &NetworkConfig {
        &self.settings
    }
}

impl std::fmt::Debug for SemanticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticClient")
            .field("base_url", &self.settings.base_url)
            .field("catalog", &self.catalog.len())
            .field("cached", &self.cache.as_ref().map(ResponseCache::memory_len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::network::MemoryTransport;

    fn settings() -> NetworkConfig {
        NetworkConfig {
            catalog_delay_ms: 0,
            ..Default::default()
        }
    }

    fn graph() -> MemoryTransport {
        MemoryTransport::new()
            .relation("manger", RelationKind::Agent, "chat", 40.0)
            .relation("manger", RelationKind::Agent, "caillou", 2.0)
            .relation("chat", RelationKind::IsA, "animal", 120.0)
    }

    fn client(transport: MemoryTransport, cache_dir: &Path, max_age: Duration) -> SemanticClient {
        SemanticClient::new(
            Box::new(transport),
            settings(),
            Some(ResponseCache::open(cache_dir, max_age)),
        )
    }

    #[test]
    fn catalog_resolves_known_kinds() {
        let c = SemanticClient::new(Box::new(graph()), settings(), None);
        assert_eq!(c.relation_type_catalog().len(), RelationKind::ALL.len());
        for kind in RelationKind::ALL {
            assert!(c.relation_id(kind).is_some());
        }
    }

    #[test]
    fn has_relation_respects_direction_and_weight() {
        let c = SemanticClient::new(Box::new(graph()), settings(), None);
        assert!(c.has_relation("manger", "chat", RelationKind::Agent));
        assert!(!c.has_relation("chat", "manger", RelationKind::Agent));
        // Below the minimum weight of 5.
        assert!(!c.has_relation("manger", "caillou", RelationKind::Agent));
        assert!(c.has_relation_named("chat", "animal", "r_isa"));
        assert!(!c.has_relation_named("chat", "animal", "r_unknown"));
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let tmp = tempfile::TempDir::new().unwrap();
        let transport = graph();
        let counter = transport.counter();
        let c = client(transport, tmp.path(), Duration::from_secs(3600));
        let after_catalog = counter.get();

        let first = c.lookup_node("Chat").unwrap();
        let second = c.lookup_node("chat").unwrap();
        assert_eq!(first, second);
        assert_eq!(counter.get(), after_catalog + 1);
    }

    #[test]
    fn expired_entries_are_refetched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let transport = graph();
        let counter = transport.counter();
        let c = client(transport, tmp.path(), Duration::ZERO);
        let after_catalog = counter.get();

        c.lookup_node("chat");
        c.lookup_node("chat");
        assert_eq!(counter.get(), after_catalog + 2);
    }

    #[test]
    fn failures_degrade_to_no_data_and_are_not_cached() {
        let tmp = tempfile::TempDir::new().unwrap();
        let transport = MemoryTransport::failing_with(500);
        let counter = transport.counter();
        let c = client(transport, tmp.path(), Duration::from_secs(3600));

        assert!(c.relation_type_catalog().is_empty());
        assert_eq!(c.lookup_node("chat"), None);
        assert!(!c.has_relation("manger", "chat", RelationKind::Agent));
        assert!(c.relations_from("chat", &RelationQuery::default()).is_empty());
        let before = counter.get();
        c.lookup_node("chat");
        assert_eq!(counter.get(), before + 1);
    }

    #[test]
    fn relations_from_lists_targets() {
        let c = SemanticClient::new(Box::new(graph()), settings(), None);
        let isa = c.relation_id(RelationKind::IsA).unwrap();
        let set = c.relations_from("chat", &RelationQuery::of_type(isa).min_weight(5));
        assert_eq!(set.targets(), vec![("animal", 120.0)]);
        let incoming = c.relations_to("chat", &RelationQuery::default());
        assert_eq!(incoming.relations.len(), 1);
    }
}
