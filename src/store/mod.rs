//! Knowledge store: stories, deduplicated factoids and allow-lists.
//!
//! Factoids live in two partitions, original and generalized, that are only
//! merged when a caller asks for the union. Within a partition every fact is
//! stored once; further occurrences only extend its story list.
//!
//! On disk (see [`DataLayout`]):
//!
//! - `stories/<id>.json`: one document per story
//! - `factoids.json`: both partitions, rewritten on every mutation
//! - `valid_terms.json` / `valid_relations.json`: see [`AllowLists`]

pub mod allow;
mod files;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use allow::{AllowLists, TermPair};

use crate::error::{StoreError, StoreResult};
use crate::factoid::{FactKey, Factoid, FactoidId, Story};
use crate::paths::DataLayout;
use files::{read_json, write_json};

/// One partition of stored factoids with a same-fact index.
#[derive(Debug, Default)]
struct Partition {
    factoids: Vec<Factoid>,
    index: HashMap<FactKey, usize>,
}

impl Partition {
    fn from_factoids(factoids: Vec<Factoid>) -> Self {
        let mut partition = Self::default();
        for factoid in factoids {
            match partition.index.get(&factoid.key()) {
                // Merge duplicates left by older files.
                Some(&i) => {
                    for story in &factoid.stories {
                        partition.factoids[i].associate(story);
                    }
                }
                None => partition.push(factoid),
            }
        }
        partition
    }

    fn push(&mut self, factoid: Factoid) {
        self.index.insert(factoid.key(), self.factoids.len());
        self.factoids.push(factoid);
    }

    /// Fold one occurrence of `factoid` seen in `story_id`. Returns `true` if
    /// it created a new record.
    fn fold(&mut self, factoid: &Factoid, story_id: &str) -> bool {
        if let Some(&i) = self.index.get(&factoid.key()) {
            self.factoids[i].associate(story_id);
            return false;
        }
        let mut record = factoid.clone();
        record.stories = vec![story_id.to_string()];
        self.push(record);
        true
    }

    fn get(&self, key: &FactKey) -> Option<&Factoid> {
        self.index.get(key).map(|&i| &self.factoids[i])
    }
}

#[derive(Debug, Default, Deserialize)]
struct FactoidFile {
    #[serde(default)]
    generalized: Vec<Factoid>,
    #[serde(default)]
    not_generalized: Vec<Factoid>,
}

#[derive(Serialize)]
struct FactoidFileRef<'a> {
    generalized: &'a [Factoid],
    not_generalized: &'a [Factoid],
}

/// Stories, factoid partitions and allow-lists of one knowledge base.
#[derive(Debug)]
pub struct KnowledgeStore {
    layout: Option<DataLayout>,
    stories: BTreeMap<String, Story>,
    original: Partition,
    generalized: Partition,
    allow: AllowLists,
    next_id: FactoidId,
}

impl KnowledgeStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            layout: None,
            stories: BTreeMap::new(),
            original: Partition::default(),
            generalized: Partition::default(),
            allow: AllowLists::in_memory(),
            next_id: 1,
        }
    }

    /// Load every persisted index under `layout`. Absent files are empty;
    /// malformed ones are an error.
    pub fn open(layout: DataLayout) -> StoreResult<Self> {
        let mut stories = BTreeMap::new();
        let dir = layout.stories_dir();
        if dir.is_dir() {
            let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();
            for path in paths {
                if let Some(story) = read_json::<Story>(&path)? {
                    stories.insert(story.id.clone(), story);
                }
            }
        }

        let file: FactoidFile = read_json(&layout.factoids_file())?.unwrap_or_default();
        let allow = AllowLists::load(layout.valid_terms_file(), layout.valid_relations_file())?;

        let mut store = Self {
            stories,
            original: Partition::from_factoids(file.not_generalized),
            generalized: Partition::from_factoids(file.generalized),
            allow,
            next_id: 1,
            layout: Some(layout),
        };
        store.next_id = store.max_factoid_id() + 1;
        tracing::info!(
            stories = store.stories.len(),
            factoids = store.original.factoids.len() + store.generalized.factoids.len(),
            valid_terms = store.allow.term_count(),
            "knowledge store loaded"
        );
        Ok(store)
    }

    fn max_factoid_id(&self) -> FactoidId {
        let stored = self
            .original
            .factoids
            .iter()
            .chain(&self.generalized.factoids)
            .map(|f| f.id);
        let in_stories = self.stories.values().flat_map(|s| s.factoids.iter().map(|f| f.id));
        stored.chain(in_stories).max().unwrap_or(0)
    }

    fn partition(&self, generalized: bool) -> &Partition {
        if generalized {
            &self.generalized
        } else {
            &self.original
        }
    }

    /// Persist `story`, then fold its factoids into the matching partition.
    pub fn add_story(&mut self, mut story: Story, generalized: bool) -> StoreResult<()> {
        if story.id.trim().is_empty() {
            return Err(StoreError::MissingStoryId);
        }
        story.generalized = generalized;
        self.save_story(&story)?;

        let partition = if generalized {
            &mut self.generalized
        } else {
            &mut self.original
        };
        let mut created = 0;
        for factoid in &story.factoids {
            if partition.fold(factoid, &story.id) {
                created += 1;
            }
        }
        tracing::info!(
            story = %story.id,
            generalized,
            factoids = story.factoids.len(),
            new = created,
            "story stored"
        );
        self.stories.insert(story.id.clone(), story);
        self.save_factoids()
    }

    pub fn get_story(&self, id: &str) -> Option<&Story> {
        self.stories.get(id)
    }

    /// Story ids in sorted order.
    pub fn list_stories(&self) -> Vec<&str> {
        self.stories.keys().map(String::as_str).collect()
    }

    /// Stored stories, optionally filtered by partition.
    pub fn stories(&self, generalized: Option<bool>) -> impl Iterator<Item = &Story> {
        self.stories
            .values()
            .filter(move |s| generalized.is_none_or(|g| s.generalized == g))
    }

    /// Factoids of one partition, or of both (generalized first) for `None`.
    pub fn list_factoids(&self, generalized: Option<bool>) -> Vec<&Factoid> {
        match generalized {
            Some(g) => self.partition(g).factoids.iter().collect(),
            None => self
                .generalized
                .factoids
                .iter()
                .chain(&self.original.factoids)
                .collect(),
        }
    }

    /// Look up a fact by its five fields; absent optional fields match empty.
    pub fn find_factoid(
        &self,
        subject: &str,
        predicate: &str,
        object: Option<&str>,
        location: Option<&str>,
        time: Option<&str>,
        generalized: Option<bool>,
    ) -> Option<&Factoid> {
        let key = FactKey::new(
            subject,
            predicate,
            object.unwrap_or(""),
            location.unwrap_or(""),
            time.unwrap_or(""),
        );
        match generalized {
            Some(g) => self.partition(g).get(&key),
            None => self
                .generalized
                .get(&key)
                .or_else(|| self.original.get(&key)),
        }
    }

    /// First stored factoid with `id`, searching both partitions.
    pub fn factoid_by_id(&self, id: FactoidId) -> Option<&Factoid> {
        self.generalized
            .factoids
            .iter()
            .chain(&self.original.factoids)
            .find(|f| f.id == id)
    }

    /// Issue a fresh factoid id.
    pub fn next_factoid_id(&mut self) -> FactoidId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn allow_lists(&self) -> &AllowLists {
        &self.allow
    }

    pub fn allow_lists_mut(&mut self) -> &mut AllowLists {
        &mut self.allow
    }

    pub fn story_count(&self, generalized: Option<bool>) -> usize {
        self.stories(generalized).count()
    }

    pub fn factoid_count(&self, generalized: Option<bool>) -> usize {
        match generalized {
            Some(g) => self.partition(g).factoids.len(),
            None => self.original.factoids.len() + self.generalized.factoids.len(),
        }
    }

    pub fn layout(&self) -> Option<&DataLayout> {
        self.layout.as_ref()
    }

    /// Rewrite every persisted index.
    pub fn flush(&self) -> StoreResult<()> {
        for story in self.stories.values() {
            self.save_story(story)?;
        }
        self.save_factoids()?;
        self.allow.save()
    }

    fn save_story(&self, story: &Story) -> StoreResult<()> {
        let Some(layout) = &self.layout else {
            return Ok(());
        };
        let file = format!("{}.json", story.id.replace(['/', '\\'], "_"));
        write_json(&layout.stories_dir().join(file), story)
    }

    fn save_factoids(&self) -> StoreResult<()> {
        let Some(layout) = &self.layout else {
            return Ok(());
        };
        write_json(
            &layout.factoids_file(),
            &FactoidFileRef {
                generalized: &self.generalized.factoids,
                not_generalized: &self.original.factoids,
            },
        )
    }
}
