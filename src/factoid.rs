//! Factoids and stories.
//!
//! A factoid is an extended subject–predicate–object–location–time tuple
//! extracted from one sentence. A story is an ordered list of factoids; the
//! order is narrative order and the predictor depends on it.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Suffix appended to a story id for its generalized variant.
pub const GENERALIZED_SUFFIX: &str = "_generalized";

/// Per-store factoid identifier.
pub type FactoidId = u64;

/// Normalize a term for comparison: NFC, trimmed, lower-cased.
pub fn normalize_term(term: &str) -> String {
    term.trim().nfc().collect::<String>().to_lowercase()
}

/// The role a term plays inside a factoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subject,
    Predicate,
    Object,
    Location,
    Time,
}

impl Role {
    /// All roles in field order.
    pub const ALL: [Role; 5] = [
        Role::Subject,
        Role::Predicate,
        Role::Object,
        Role::Location,
        Role::Time,
    ];

    /// Bracket tag used in the tagged-text form.
    pub fn tag(self) -> &'static str {
        match self {
            Role::Subject => "sujet",
            Role::Predicate => "predicat",
            Role::Object => "objet",
            Role::Location => "lieu",
            Role::Time => "temps",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.tag() == tag)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Subject => "subject",
            Role::Predicate => "predicate",
            Role::Object => "object",
            Role::Location => "location",
            Role::Time => "time",
        };
        f.write_str(name)
    }
}

/// One extracted fact. Empty strings mean "absent" for the optional roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Factoid {
    pub id: FactoidId,
    pub subject: String,
    pub predicate: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub original_sentence: String,
    #[serde(default)]
    pub story_id: String,
    /// Every story this fact was seen in. Only grows.
    #[serde(default, alias = "stories_id", skip_serializing_if = "Vec::is_empty")]
    pub stories: Vec<String>,
}

/// Normalized identity of a factoid: two factoids are the same fact iff
/// their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub location: String,
    pub time: String,
}

impl FactKey {
    /// Build a key from raw (possibly un-normalized) parts.
    pub fn new(subject: &str, predicate: &str, object: &str, location: &str, time: &str) -> Self {
        Self {
            subject: normalize_term(subject),
            predicate: normalize_term(predicate),
            object: normalize_term(object),
            location: normalize_term(location),
            time: normalize_term(time),
        }
    }
}

impl Factoid {
    /// A factoid with only its five fact fields set.
    pub fn from_parts(subject: &str, predicate: &str, object: &str, location: &str, time: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            location: location.to_string(),
            time: time.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> FactKey {
        FactKey::new(
            &self.subject,
            &self.predicate,
            &self.object,
            &self.location,
            &self.time,
        )
    }

    /// Same-fact equality (normalized on all five fields).
    pub fn same_fact(&self, other: &Factoid) -> bool {
        self.key() == other.key()
    }

    pub fn get(&self, role: Role) -> &str {
        match role {
            Role::Subject => &self.subject,
            Role::Predicate => &self.predicate,
            Role::Object => &self.object,
            Role::Location => &self.location,
            Role::Time => &self.time,
        }
    }

    pub fn set(&mut self, role: Role, value: impl Into<String>) {
        let value = value.into();
        match role {
            Role::Subject => self.subject = value,
            Role::Predicate => self.predicate = value,
            Role::Object => self.object = value,
            Role::Location => self.location = value,
            Role::Time => self.time = value,
        }
    }

    /// Non-empty terms in field order.
    pub fn terms(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, t)| !t.is_empty())
    }

    /// Record a story association; duplicates are skipped.
    pub fn associate(&mut self, story_id: &str) -> bool {
        if self.stories.iter().any(|s| s == story_id) {
            return false;
        }
        self.stories.push(story_id.to_string());
        true
    }

    /// Render back into tagged-text form.
    pub fn render(&self) -> String {
        crate::tagger::render_factoid(self)
    }
}

/// An ordered list of factoids from one narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub domain: String,
    pub factoids: Vec<Factoid>,
    #[serde(default)]
    pub generalized: bool,
}

impl Story {
    /// Id for the `index`-th story of `domain` (1-based).
    pub fn make_id(domain: &str, index: usize) -> String {
        format!("{}_{index}", domain.trim().to_lowercase().replace(' ', "_"))
    }

    /// Id of the generalized variant of `id`.
    pub fn generalized_id(id: &str) -> String {
        format!("{id}{GENERALIZED_SUFFIX}")
    }

    /// Position of the first factoid that is the same fact as `factoid`.
    pub fn position_of(&self, factoid: &Factoid) -> Option<usize> {
        let key = factoid.key();
        self.factoids.iter().position(|f| f.key() == key)
    }

    /// Distinct non-empty subjects in first-seen order.
    pub fn subjects(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for f in &self.factoids {
            if !f.subject.is_empty() && !out.contains(&f.subject.as_str()) {
                out.push(&f.subject);
            }
        }
        out
    }

    /// Tagged-text lines, one per factoid.
    pub fn render_lines(&self) -> Vec<String> {
        self.factoids.iter().map(Factoid::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_fact_ignores_case_and_composition() {
        let a = Factoid::from_parts("Chat", "manger", "croquettes", "", "");
        let mut b = Factoid::from_parts(" chat ", "MANGER", "Croquettes", "", "");
        b.id = 42;
        assert!(a.same_fact(&b));

        // "é" precomposed vs "e" + combining acute
        let c = Factoid::from_parts("employé", "dormir", "", "", "");
        let d = Factoid::from_parts("employe\u{301}", "dormir", "", "", "");
        assert!(c.same_fact(&d));
    }

    #[test]
    fn location_distinguishes_facts() {
        let a = Factoid::from_parts("chat", "dormir", "", "salon", "");
        let b = Factoid::from_parts("chat", "dormir", "", "", "");
        assert!(!a.same_fact(&b));
    }

    #[test]
    fn associate_skips_duplicates() {
        let mut f = Factoid::default();
        assert!(f.associate("repas_1"));
        assert!(!f.associate("repas_1"));
        assert!(f.associate("repas_2"));
        assert_eq!(f.stories, vec!["repas_1", "repas_2"]);
    }

    #[test]
    fn story_ids() {
        assert_eq!(Story::make_id("Au Restaurant", 3), "au_restaurant_3");
        assert_eq!(Story::generalized_id("repas_1"), "repas_1_generalized");
    }

    #[test]
    fn subjects_in_first_seen_order() {
        let story = Story {
            id: "s".into(),
            domain: "d".into(),
            factoids: vec![
                Factoid::from_parts("chat", "manger", "", "", ""),
                Factoid::from_parts("chien", "aboyer", "", "", ""),
                Factoid::from_parts("chat", "dormir", "", "", ""),
            ],
            generalized: false,
        };
        assert_eq!(story.subjects(), vec!["chat", "chien"]);
        let probe = Factoid::from_parts("CHAT", "dormir", "", "", "");
        assert_eq!(story.position_of(&probe), Some(2));
    }

    #[test]
    fn terms_skip_empty_roles() {
        let f = Factoid::from_parts("chat", "dormir", "", "", "nuit");
        let roles: Vec<Role> = f.terms().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![Role::Subject, Role::Predicate, Role::Time]);
    }
}
