//! End-to-end tests: import, generalization and prediction over an
//! in-process semantic network.

use fabula::checker::{Decision, Policy, RejectReason, UnknownItem};
use fabula::config::FabulaConfig;
use fabula::engine::Engine;
use fabula::factoid::Role;
use fabula::network::{MemoryTransport, RelationKind};
use fabula::paths::DataLayout;

const REPAS: &str = "\
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
        .relation("chat", RelationKind::IsA, "animal", 100.0)
        .relation("chien", RelationKind::IsA, "animal", 90.0)
        .relation("manger", RelationKind::Agent, "chat", 40.0)
        .relation("manger", RelationKind::Agent, "chien", 40.0)
        .relation("manger", RelationKind::Agent, "animal", 40.0)
        .relation("manger", RelationKind::Patient, "croquettes", 40.0)
        .relation("dormir", RelationKind::Agent, "chat", 40.0)
        .relation("dormir", RelationKind::Agent, "chien", 40.0)
        .relation("dormir", RelationKind::Agent, "animal", 40.0)
}

#[test]
fn imported_story_predicts_its_own_continuation() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();

    let lines = ["[sujet] chat [predicat] manger [objet] croquettes", "?"];
    let predictions = engine.predict_missing(&lines, false).unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].render("?"), "[sujet] chat [predicat] dormir");
}

#[test]
fn generalized_story_transfers_to_another_subject() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();
    engine.generalize_all().unwrap();

    let lines = ["[sujet] chien [predicat] manger [objet] croquettes", "?"];
    let with = engine.predict_missing(&lines, true).unwrap();
    assert_eq!(with[0].render("?"), "[sujet] chien [predicat] dormir");
}

#[test]
fn story_without_analogue_stays_unresolved() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();

    let lines = ["[sujet] licorne [predicat] voler", "?"];
    let predictions = engine.predict_missing(&lines, true).unwrap();
    assert!(!predictions[0].is_resolved());
    assert_eq!(predictions[0].render("?"), "?");
}

#[test]
fn reimport_is_idempotent() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();

    let info = engine.info();
    assert_eq!(info.original_stories, 1);
    assert_eq!(info.original_factoids, 2);
    let f = engine
        .store()
        .find_factoid("chat", "dormir", None, None, None, Some(false))
        .unwrap();
    assert_eq!(f.stories, vec!["repas_1"]);
}

#[test]
fn generalization_mapping_recovers_the_original() {
    let text = "\
Parc
[sujet] chat [predicat] manger [objet] croquettes
[sujet] chien [predicat] dormir
";
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine.import_text(text, &mut Policy::Ignore).unwrap();

    let g = engine.generalize_story("parc_1", false).unwrap().unwrap();
    let original = engine.store().get_story("parc_1").unwrap();
    assert_eq!(g.story.factoids[0].subject, "(animal:1)");
    assert_eq!(g.story.factoids[1].subject, "(animal:2)");

    for (general, concrete) in g.story.factoids.iter().zip(&original.factoids) {
        assert_eq!(g.mapping.resolve(&general.subject), vec![concrete.subject.as_str()]);
        assert_eq!(general.predicate, concrete.predicate);
        assert_eq!(general.object, concrete.object);
    }
    assert!(g.mapping.get(Role::Subject, "chien").is_some());
}

#[test]
fn rejection_reports_the_first_unknown_item() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    let text = "Nuit\n[sujet] chat [predicat] dormir\n[sujet] licorne [predicat] voler\n";
    let report = engine.import_text(text, &mut Policy::Ignore).unwrap();
    assert!(report.admitted.is_empty());
    assert_eq!(
        report.rejected,
        vec![("nuit_1".to_string(), RejectReason::UnknownTerm("licorne".into()))]
    );
    assert_eq!(engine.info().original_stories, 0);
}

#[test]
fn accepted_items_are_never_asked_again() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    let text = "Nuit\n[sujet] chat [predicat] dormir [lieu] panier\n";

    let mut asked: Vec<UnknownItem> = Vec::new();
    let mut accept = |item: &UnknownItem| {
        asked.push(item.clone());
        Decision::Accept
    };
    engine
        .import_text(text, &mut Policy::Interactive(&mut accept))
        .unwrap();
    assert_eq!(asked.len(), 2);

    // Same items a second time: the allow-lists answer.
    let report = engine.import_text(text, &mut Policy::Ignore).unwrap();
    assert_eq!(report.admitted, vec!["nuit_1"]);
}

#[test]
fn unreachable_network_rejects_under_ignore_and_admits_under_force() {
    let mut engine = Engine::in_memory(config(), Box::new(MemoryTransport::failing_with(503)));
    assert_eq!(engine.info().relation_types, 0);

    let report = engine.import_text(REPAS, &mut Policy::Ignore).unwrap();
    assert_eq!(report.rejected.len(), 1);

    let report = engine.import_text(REPAS, &mut Policy::Force).unwrap();
    assert_eq!(report.admitted, vec!["repas_1"]);
}

#[test]
fn batch_file_completes_every_story() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut engine =
        Engine::with_transport(DataLayout::rooted_at(tmp.path()), config(), Box::new(graph())).unwrap();
    engine.import_text(REPAS, &mut Policy::Ignore).unwrap();
    engine.generalize_all().unwrap();

    let batch = "\
Histoire 1
[sujet] chat [predicat] manger [objet] croquettes
?

Histoire 2
[sujet] licorne [predicat] voler
?
";
    let done = engine.complete_batch(batch, true).unwrap();
    assert_eq!(done.len(), 2);
    assert_eq!(done[0].title, "Histoire 1");
    assert_eq!(done[0].lines[1], "> [sujet] chat [predicat] dormir");
    assert_eq!(done[1].lines[1], "> ?");
}

#[test]
fn factoid_ids_are_unique_across_partitions() {
    let mut engine = Engine::in_memory(config(), Box::new(graph()));
    engine
        .import_text("Nuit\n[sujet] chat [predicat] dormir\n", &mut Policy::Ignore)
        .unwrap();
    engine.generalize_all().unwrap();

    let mut ids: Vec<u64> = engine.store().list_factoids(None).iter().map(|f| f.id).collect();
    assert_eq!(ids.len(), 2);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 2);

    let original = engine
        .store()
        .find_factoid("chat", "dormir", None, None, None, Some(false))
        .unwrap();
    let by_id = engine.store().factoid_by_id(original.id).unwrap();
    assert_eq!(by_id.subject, "chat");
}
