//! Analogical predictor: fill the blanks of a partial story.
//!
//! Each blank is predicted from its nearest non-blank neighbours (anchors).
//! Stored factoids similar to an anchor are located in the stories they came
//! from; the factoid next to them, adapted to the anchor through the role
//! pattern linking the two, becomes a candidate. The best candidate wins, and
//! its subject is swapped for one already present in the story when possible.

use crate::checker::{Policy, check_story};
use crate::config::PredictorConfig;
use crate::error::StoreResult;
use crate::factoid::{Factoid, Story, normalize_term};
use crate::generalize::{bare_category, is_category};
use crate::network::{RelationKind, SemanticClient};
use crate::store::KnowledgeStore;
use crate::tagger::tag_sentence;

/// How two consecutive factoids share their roles. Checked in declaration
/// order; the first that holds wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// The earlier subject is the later object.
    ChainedSwap,
    SameSubjectAndObject,
    SameSubject,
    SameObject,
}

/// Classify the pair `(earlier, later)`. Empty roles never match.
pub fn classify(earlier: &Factoid, later: &Factoid) -> Option<Pattern> {
    let same = |a: &str, b: &str| !a.is_empty() && normalize_term(a) == normalize_term(b);
    if same(&earlier.subject, &later.object) {
        Some(Pattern::ChainedSwap)
    } else if same(&earlier.subject, &later.subject) && same(&earlier.object, &later.object) {
        Some(Pattern::SameSubjectAndObject)
    } else if same(&earlier.subject, &later.subject) {
        Some(Pattern::SameSubject)
    } else if same(&earlier.object, &later.object) {
        Some(Pattern::SameObject)
    } else {
        None
    }
}

/// Which side of the blank an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Anchor precedes the blank; the candidate follows the stored match.
    Before,
    /// Anchor follows the blank; the candidate precedes the stored match.
    After,
}

/// Rewrite `predicted` (the neighbour) with the anchor's terms according to
/// `pattern`. Empty anchor values are never copied in.
fn adapt(predicted: &mut Factoid, anchor: &Factoid, pattern: Pattern, side: Side) {
    let copy = |slot: &mut String, value: &str| {
        if !value.is_empty() {
            *slot = value.to_string();
        }
    };
    match (pattern, side) {
        (Pattern::ChainedSwap, Side::Before) => copy(&mut predicted.object, &anchor.subject),
        (Pattern::ChainedSwap, Side::After) => copy(&mut predicted.subject, &anchor.object),
        (Pattern::SameSubjectAndObject, _) => {
            copy(&mut predicted.subject, &anchor.subject);
            copy(&mut predicted.object, &anchor.object);
        }
        (Pattern::SameSubject, _) => copy(&mut predicted.subject, &anchor.subject),
        (Pattern::SameObject, _) => copy(&mut predicted.object, &anchor.object),
    }
}

/// Ordered fallbacks for a bare subject absent from the story.
const SUBJECT_DERIVATIONS: [RelationKind; 3] = [
    RelationKind::Masculine,
    RelationKind::Feminine,
    RelationKind::Synonym,
];

/// Result for one blank.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Resolved {
        factoid: Factoid,
        score: f64,
        /// Story the candidate was taken from.
        origin_story: String,
    },
    Unresolved,
}

impl Prediction {
    /// Tagged-text form, or `unresolved` when nothing qualified.
    pub fn render(&self, unresolved: &str) -> String {
        match self {
            Prediction::Resolved { factoid, .. } => factoid.render(),
            Prediction::Unresolved => unresolved.to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Prediction::Resolved { .. })
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    score: f64,
    factoid: Factoid,
    story_id: String,
}

/// Scores stored factoids against anchors and assembles predictions.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    /// Also draw candidates from generalized stories.
    pub fn with_generalized(mut self, include: bool) -> Self {
        self.config.include_generalized = include;
        self
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn is_blank(&self, line: &str) -> bool {
        line.trim() == self.config.blank_marker
    }

    /// One prediction per blank line of `lines`, in order.
    pub fn predict_missing<S: AsRef<str>>(
        &self,
        lines: &[S],
        store: &mut KnowledgeStore,
        client: &SemanticClient,
    ) -> StoreResult<Vec<Prediction>> {
        let lines: Vec<&str> = lines.iter().map(|l| l.as_ref().trim()).collect();

        let mut present: Vec<String> = Vec::new();
        for line in lines.iter().filter(|l| !l.is_empty() && !self.is_blank(l)) {
            let subject = normalize_term(&tag_sentence(line).subject);
            if !subject.is_empty() && !present.contains(&subject) {
                present.push(subject);
            }
        }

        let mut predictions = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if !self.is_blank(line) {
                continue;
            }
            let anchor = |range: &mut dyn Iterator<Item = usize>| {
                range
                    .map(|j| lines[j])
                    .find(|l| !l.is_empty() && !self.is_blank(l))
                    .map(tag_sentence)
            };
            let before = anchor(&mut (0..i).rev());
            let after = anchor(&mut (i + 1..lines.len()));

            let mut candidates = Vec::new();
            if let Some(a) = &before {
                candidates.extend(self.candidates(a, Side::Before, store));
            }
            if let Some(a) = &after {
                candidates.extend(self.candidates(a, Side::After, store));
            }
            // Stable: ties keep the earlier-anchor candidates first.
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

            let Some(best) = candidates.into_iter().next() else {
                tracing::debug!(line = i, "blank unresolved");
                predictions.push(Prediction::Unresolved);
                continue;
            };
            let factoid = self.fit_subject(best.factoid, &best.story_id, &present, store, client)?;
            tracing::debug!(line = i, score = best.score, origin = %best.story_id, "blank resolved");
            predictions.push(Prediction::Resolved {
                factoid,
                score: best.score,
                origin_story: best.story_id,
            });
        }
        Ok(predictions)
    }

    /// Similarity of a stored factoid to an anchor.
    pub fn score(&self, stored: &Factoid, anchor: &Factoid) -> f64 {
        let eq = |a: &str, b: &str| normalize_term(a) == normalize_term(b);
        let both = |a: &str, b: &str| !a.is_empty() && eq(a, b);
        let c = &self.config;
        let mut score = 0.0;
        if eq(&stored.subject, &anchor.subject) {
            score += c.subject_weight;
        }
        if eq(&stored.predicate, &anchor.predicate) {
            score += c.predicate_weight;
        }
        if eq(&stored.object, &anchor.object) {
            score += c.object_weight;
        }
        if both(&stored.location, &anchor.location) {
            score += c.location_weight;
        }
        if both(&stored.time, &anchor.time) {
            score += c.time_weight;
        }
        score
    }

    fn candidates(&self, anchor: &Factoid, side: Side, store: &KnowledgeStore) -> Vec<Candidate> {
        let mut out = Vec::new();
        for stored in store.list_factoids(None) {
            let score = self.score(stored, anchor);
            if score < self.config.min_score {
                continue;
            }
            for story_id in &stored.stories {
                if out.len() >= self.config.sample_size {
                    return out;
                }
                let Some(story) = store.get_story(story_id) else {
                    continue;
                };
                if story.generalized && !self.config.include_generalized {
                    continue;
                }
                let Some(pos) = story.position_of(stored) else {
                    continue;
                };
                let (earlier, later, neighbour) = match side {
                    Side::Before if pos + 1 < story.factoids.len() => {
                        (pos, pos + 1, pos + 1)
                    }
                    Side::After if pos > 0 => (pos - 1, pos, pos - 1),
                    _ => continue,
                };
                let mut predicted = story.factoids[neighbour].clone();
                predicted.stories.clear();
                if let Some(pattern) = classify(&story.factoids[earlier], &story.factoids[later]) {
                    adapt(&mut predicted, anchor, pattern, side);
                }
                tracing::debug!(score, story = %story_id, ?side, "candidate");
                out.push(Candidate {
                    score,
                    factoid: predicted,
                    story_id: story_id.clone(),
                });
            }
        }
        out
    }

    /// Swap the predicted subject for one already in the story when the
    /// prediction introduces a new one.
    fn fit_subject(
        &self,
        mut predicted: Factoid,
        origin: &str,
        present: &[String],
        store: &mut KnowledgeStore,
        client: &SemanticClient,
    ) -> StoreResult<Factoid> {
        let subject = normalize_term(&predicted.subject);
        if subject.is_empty() || present.contains(&subject) {
            return Ok(predicted);
        }

        let replacement = if is_category(&predicted.subject) {
            self.instantiate_category(&predicted.subject, origin, present, store, client)?
        } else {
            derive_subject(&subject, present, client)
        };
        if let Some(found) = replacement {
            tracing::debug!(from = %predicted.subject, to = %found, "subject substituted");
            predicted.subject = found;
        }
        Ok(predicted)
    }

    /// First present subject that keeps the origin story consistent when it
    /// replaces `category` throughout.
    fn instantiate_category(
        &self,
        category: &str,
        origin: &str,
        present: &[String],
        store: &mut KnowledgeStore,
        client: &SemanticClient,
    ) -> StoreResult<Option<String>> {
        let Some(origin_story) = store.get_story(origin).cloned() else {
            return Ok(None);
        };
        for subject in present.iter().take(self.config.max_category_trials) {
            let trial = instantiate(&origin_story, category, subject);
            if check_story(&trial, &mut Policy::Ignore, client, store.allow_lists_mut())?.is_admitted() {
                return Ok(Some(subject.clone()));
            }
        }
        tracing::debug!(category = bare_category(category), "no present subject fits");
        Ok(None)
    }
}

/// First present subject, in story order, related to `subject` by one of the
/// derivations. Each present subject is tried against every derivation before
/// the next subject.
fn derive_subject(subject: &str, present: &[String], client: &SemanticClient) -> Option<String> {
    present
        .iter()
        .find(|p| {
            SUBJECT_DERIVATIONS
                .iter()
                .any(|&kind| client.has_relation(subject, p, kind))
        })
        .cloned()
}

/// Copy of `story` with `category` replaced by `subject` as subject or
/// object, and every remaining category reduced to its bare name.
fn instantiate(story: &Story, category: &str, subject: &str) -> Story {
    let mut trial = story.clone();
    trial.id = format!("{}_trial", story.id);
    for f in &mut trial.factoids {
        for slot in [&mut f.subject, &mut f.object] {
            if *slot == category {
                *slot = subject.to_string();
            }
            *slot = bare_category(slot).to_string();
        }
    }
    trial
}
