//! Story generalizer: abstract concrete subjects into categories.
//!
//! For each distinct subject the generalizer looks for an is-a parent that
//! keeps the story consistent, first among its known-good categories and then
//! among the subject's own is-a edges. Accepted categories are substituted as
//! `(category)`; when two subjects share a category each gets its own
//! `(category:i)` label.

use crate::checker::{Policy, check_story};
use crate::config::GeneralizerConfig;
use crate::error::StoreResult;
use crate::factoid::{Role, Story};
use crate::network::{RelationKind, RelationQuery, SemanticClient};
use crate::store::{AllowLists, KnowledgeStore};

/// Separators the semantic network uses in disambiguated node names
/// (`chat>animal`, `avocat:fruit`).
const DISAMBIGUATION_SEPARATORS: [char; 2] = [':', '>'];

/// Split a disambiguated node name into its base and qualifier.
pub fn split_disambiguated(name: &str) -> (&str, Option<&str>) {
    match name.split_once(DISAMBIGUATION_SEPARATORS) {
        Some((base, qualifier)) => (base, Some(qualifier)),
        None => (name, None),
    }
}

/// Whether `term` is a substituted category such as `(animal)` or `(animal:2)`.
pub fn is_category(term: &str) -> bool {
    term.len() >= 2 && term.starts_with('(') && term.ends_with(')')
}

/// `(animal:2)` → `animal`; anything that is not a category is returned as is.
pub fn bare_category(term: &str) -> &str {
    if !is_category(term) {
        return term;
    }
    let inner = &term[1..term.len() - 1];
    strip_index(inner)
}

fn strip_index(label: &str) -> &str {
    match label.rsplit_once(':') {
        Some((base, idx)) if !idx.is_empty() && idx.chars().all(|c| c.is_ascii_digit()) => base,
        _ => label,
    }
}

/// One concrete value and the category that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub role: Role,
    pub concrete: String,
    pub category: String,
    /// 1-based index when several values share `category`.
    pub index: Option<usize>,
}

impl MappingEntry {
    /// `category` or `category:i`.
    pub fn label(&self) -> String {
        match self.index {
            Some(i) => format!("{}:{i}", self.category),
            None => self.category.clone(),
        }
    }

    /// Text placed in the generalized story.
    pub fn substituted(&self) -> String {
        format!("({})", self.label())
    }
}

/// Concrete → category mapping built while generalizing one story.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralizationMapping {
    entries: Vec<MappingEntry>,
}

impl GeneralizationMapping {
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, role: Role, concrete: &str) -> Option<&MappingEntry> {
        self.entries
            .iter()
            .find(|e| e.role == role && e.concrete == concrete)
    }

    /// Concrete values behind a substituted term. `(animal:2)` resolves to
    /// exactly one value; a bare `(animal)` to every value mapped to `animal`.
    pub fn resolve(&self, substituted: &str) -> Vec<&str> {
        let label = substituted
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(substituted);
        let category = strip_index(label);
        let indexed = category.len() != label.len();
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .filter(|e| !indexed || e.label() == label)
            .map(|e| e.concrete.as_str())
            .collect()
    }

    fn push(&mut self, role: Role, concrete: &str, category: String) {
        self.entries.push(MappingEntry {
            role,
            concrete: concrete.to_string(),
            category,
            index: None,
        });
    }

    /// Number colliding categories 1, 2, ... in first-seen order.
    fn disambiguate(&mut self) {
        let categories: Vec<(Role, String)> = self
            .entries
            .iter()
            .map(|e| (e.role, e.category.clone()))
            .collect();
        let mut seen: Vec<(Role, String, usize)> = Vec::new();
        for (i, (role, category)) in categories.iter().enumerate() {
            let total = categories.iter().filter(|(r, c)| r == role && c == category).count();
            if total < 2 {
                continue;
            }
            let next = match seen.iter_mut().find(|(r, c, _)| r == role && c == category) {
                Some(slot) => {
                    slot.2 += 1;
                    slot.2
                }
                None => {
                    seen.push((*role, category.clone(), 1));
                    1
                }
            };
            self.entries[i].index = Some(next);
        }
    }
}

/// A generalized story and the mapping that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generalization {
    pub story: Story,
    pub mapping: GeneralizationMapping,
}

/// Generalizer state: the growing list of known-good categories.
#[derive(Debug, Clone)]
pub struct Generalizer {
    categories: Vec<String>,
    top_k: usize,
    min_weight: i64,
}

impl Generalizer {
    pub fn new(config: &GeneralizerConfig) -> Self {
        Self {
            categories: config.seed_categories.clone(),
            top_k: config.top_k,
            min_weight: config.min_weight,
        }
    }

    /// Known-good categories, seeds first, then discoveries.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    fn remember(&mut self, category: &str) {
        if !self.categories.iter().any(|c| c == category) {
            tracing::debug!(category, "new known-good category");
            self.categories.push(category.to_string());
        }
    }

    /// Abstract `story`'s subjects. The returned story has the generalized id
    /// and flag, and fresh factoid ids drawn from `store`; storing it is up to
    /// the caller.
    pub fn generalize(
        &mut self,
        story: &Story,
        client: &SemanticClient,
        store: &mut KnowledgeStore,
    ) -> StoreResult<Generalization> {
        let mut mapping = GeneralizationMapping::default();
        let Some(isa) = client.relation_id(RelationKind::IsA) else {
            tracing::warn!(story = %story.id, "is-a relation unavailable; story left concrete");
            return Ok(Generalization {
                story: apply(story, &mapping, store),
                mapping,
            });
        };
        let allow = store.allow_lists_mut();
        let query = RelationQuery::of_type(isa).min_weight(self.min_weight);

        let subjects: Vec<String> = story.subjects().into_iter().map(String::from).collect();
        for value in &subjects {
            let seeded = self.seeded_candidates(value, client, &query);
            let mut accepted = self.first_consistent(story, value, &seeded, client, allow)?;
            if accepted.is_none() {
                let discovered = self.network_candidates(value, client, &query);
                accepted = self.first_consistent(story, value, &discovered, client, allow)?;
            }
            let Some(candidate) = accepted else {
                tracing::debug!(subject = %value, "no consistent generalization");
                continue;
            };
            self.remember(&candidate);
            let category = split_disambiguated(&candidate).0.to_string();
            tracing::info!(story = %story.id, subject = %value, %category, "subject generalized");
            mapping.push(Role::Subject, value, category);
        }
        mapping.disambiguate();

        Ok(Generalization {
            story: apply(story, &mapping, store),
            mapping,
        })
    }

    /// Known-good categories that `value` is-a, heaviest edge first.
    fn seeded_candidates(&self, value: &str, client: &SemanticClient, query: &RelationQuery) -> Vec<(String, f64)> {
        let found = self
            .categories
            .iter()
            .filter_map(|category| {
                let set = client.relations_between(value, category, query);
                set.relations.first().map(|r| (category.clone(), r.w))
            })
            .collect();
        self.top(found)
    }

    /// `value`'s own is-a parents, skipping disambiguated nodes.
    fn network_candidates(&self, value: &str, client: &SemanticClient, query: &RelationQuery) -> Vec<(String, f64)> {
        let found = client
            .relations_from(value, query)
            .targets()
            .into_iter()
            .filter(|(name, _)| !name.contains(DISAMBIGUATION_SEPARATORS))
            .map(|(name, w)| (name.to_string(), w))
            .collect();
        self.top(found)
    }

    fn top(&self, mut candidates: Vec<(String, f64)>) -> Vec<(String, f64)> {
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(self.top_k);
        candidates
    }

    /// First candidate whose substitution keeps the story consistent.
    fn first_consistent(
        &self,
        story: &Story,
        value: &str,
        candidates: &[(String, f64)],
        client: &SemanticClient,
        allow: &mut AllowLists,
    ) -> StoreResult<Option<String>> {
        for (candidate, weight) in candidates {
            let (base, qualifier) = split_disambiguated(candidate);
            if candidate == value || (qualifier.is_some() && base == value) {
                continue;
            }
            let mut trial = story.clone();
            trial.id = format!("{}_trial", story.id);
            for f in &mut trial.factoids {
                if f.subject == value {
                    f.subject = candidate.clone();
                }
            }
            if check_story(&trial, &mut Policy::Ignore, client, allow)?.is_admitted() {
                return Ok(Some(candidate.clone()));
            }
            tracing::debug!(subject = value, %candidate, weight, "candidate breaks consistency");
        }
        Ok(None)
    }
}

/// Build the generalized copy of `story` under `mapping`. Each copied factoid
/// gets a new id from `store`.
fn apply(story: &Story, mapping: &GeneralizationMapping, store: &mut KnowledgeStore) -> Story {
    let id = Story::generalized_id(&story.id);
    let factoids = story
        .factoids
        .iter()
        .map(|f| {
            let mut g = f.clone();
            g.id = store.next_factoid_id();
            g.story_id = id.clone();
            g.stories.clear();
            if let Some(entry) = mapping.get(Role::Subject, &f.subject) {
                g.subject = entry.substituted();
            }
            if let Some(entry) = mapping.get(Role::Subject, &f.object) {
                g.object = entry.substituted();
            }
            g
        })
        .collect();
    Story {
        id,
        domain: story.domain.clone(),
        factoids,
        generalized: true,
    }
}
