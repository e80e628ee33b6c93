//! Persistence and recovery tests for the fabula knowledge base.
//!
//! These tests verify that stories, factoids, allow-lists and cached network
//! responses survive an engine restart (flush + reopen cycle).

use fabula::checker::Policy;
use fabula::config::FabulaConfig;
use fabula::engine::Engine;
use fabula::error::{FabulaError, StoreError};
use fabula::network::{MemoryTransport, RelationKind};
use fabula::paths::DataLayout;

const TEXT: &str = "\
Repas
[sujet] chat [predicat] manger [objet] croquettes
[sujet] chat [predicat] dormir
";

fn config() -> FabulaConfig {
    let mut config = FabulaConfig::default();
    config.network.catalog_delay_ms = 0;
    config
}

fn graph() -> MemoryTransport {
    MemoryTransport::new()
        .nodes(&["croquettes"])
        .relation("manger", RelationKind::Agent, "chat", 40.0)
        .relation("manger", RelationKind::Patient, "croquettes", 40.0)
        .relation("dormir", RelationKind::Agent, "chat", 40.0)
}

fn persistent_engine(dir: &std::path::Path, transport: MemoryTransport) -> Engine {
    Engine::with_transport(DataLayout::rooted_at(dir), config(), Box::new(transport)).unwrap()
}

#[test]
fn stories_and_factoids_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: import and flush.
    {
        let mut engine = persistent_engine(dir.path(), graph());
        engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
        engine.flush().unwrap();
    }

    // Second session: reopen and verify.
    {
        let engine = persistent_engine(dir.path(), graph());
        assert_eq!(engine.store().list_stories(), vec!["repas_1"]);
        let story = engine.store().get_story("repas_1").unwrap();
        assert_eq!(story.factoids.len(), 2);
        assert_eq!(story.domain, "Repas");

        let f = engine
            .store()
            .find_factoid("chat", "manger", Some("croquettes"), None, None, Some(false))
            .unwrap();
        assert_eq!(f.stories, vec!["repas_1"]);
        assert_eq!(engine.info().original_factoids, 2);
    }
}

#[test]
fn factoid_ids_continue_across_sessions() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let mut engine = persistent_engine(dir.path(), graph());
        engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
    }
    let mut engine = persistent_engine(dir.path(), graph());
    engine
        .import_text("Sieste\n[sujet] chat [predicat] dormir\n", &mut Policy::Ignore)
        .unwrap();
    let story = engine.store().get_story("sieste_1").unwrap();
    assert_eq!(story.factoids[0].id, 3);
    // Same fact as in repas_1: one record, two stories.
    let f = engine
        .store()
        .find_factoid("chat", "dormir", None, None, None, Some(false))
        .unwrap();
    assert_eq!(f.stories, vec!["repas_1", "sieste_1"]);
}

#[test]
fn allow_lists_spare_network_queries_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = config();
    config.network.use_cache = false;

    {
        let mut engine =
            Engine::with_transport(DataLayout::rooted_at(dir.path()), config.clone(), Box::new(graph()))
                .unwrap();
        engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
    }

    let transport = graph();
    let counter = transport.counter();
    let mut engine =
        Engine::with_transport(DataLayout::rooted_at(dir.path()), config, Box::new(transport)).unwrap();
    let after_catalog = counter.get();
    engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
    assert_eq!(counter.get(), after_catalog);
    assert!(engine.info().valid_terms >= 4);
}

#[test]
fn cached_responses_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let mut engine = persistent_engine(dir.path(), graph());
        engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
    }

    // Fresh allow-lists force the checker back to the client, which must
    // answer from the disk cache.
    std::fs::remove_file(dir.path().join("valid_terms.json")).unwrap();
    std::fs::remove_file(dir.path().join("valid_relations.json")).unwrap();

    let transport = graph();
    let counter = transport.counter();
    let mut engine = persistent_engine(dir.path(), transport);
    engine.import_text(TEXT, &mut Policy::Ignore).unwrap();
    assert_eq!(counter.get(), 0);
}

#[test]
fn malformed_story_file_aborts_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let layout = DataLayout::rooted_at(dir.path());
    layout.ensure_dirs().unwrap();
    std::fs::write(layout.stories_dir().join("repas_1.json"), "{\"id\": ").unwrap();

    let err = Engine::with_transport(layout, config(), Box::new(graph())).unwrap_err();
    assert!(matches!(err, FabulaError::Store(StoreError::Malformed { .. })));
}
