//! Engine facade: top-level API for fabula.
//!
//! The `Engine` owns the knowledge store, the semantic-network client and the
//! generalizer state, and composes them into the operations the CLI exposes.
//! Components never reach for shared globals; they receive the engine's parts
//! by reference.

use std::path::Path;
use std::time::Duration;

use crate::batch::{BlankedStory, complete, parse_blanked_stories};
use crate::checker::{Policy, Verdict, check_story};
use crate::config::FabulaConfig;
use crate::error::{FabulaResult, StoreError};
use crate::factoid::Story;
use crate::generalize::{Generalization, Generalizer};
use crate::import::{ImportReport, import_stories, read_input};
use crate::network::{HttpTransport, ResponseCache, SemanticClient, Transport};
use crate::paths::DataLayout;
use crate::predict::{Prediction, Predictor};
use crate::store::KnowledgeStore;

/// A batch story with its blanks filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedStory {
    pub title: String,
    pub lines: Vec<String>,
}

/// The fabula knowledge base.
pub struct Engine {
    config: FabulaConfig,
    store: KnowledgeStore,
    client: SemanticClient,
    generalizer: Generalizer,
}

impl Engine {
    /// Open the knowledge base under `layout`, talking to the configured
    /// semantic network over HTTP.
    pub fn open(layout: DataLayout, config: FabulaConfig) -> FabulaResult<Self> {
        let transport = HttpTransport::new(
            &config.network.base_url,
            config.network.timeout_secs.map(Duration::from_secs),
        );
        Self::with_transport(layout, config, Box::new(transport))
    }

    /// Like [`open`](Self::open) over any transport.
    pub fn with_transport(
        layout: DataLayout,
        config: FabulaConfig,
        transport: Box<dyn Transport>,
    ) -> FabulaResult<Self> {
        layout.ensure_dirs()?;
        tracing::info!(root = %layout.root.display(), "opening knowledge base");
        let cache = config.network.use_cache.then(|| {
            ResponseCache::open(
                &layout.cache_dir,
                Duration::from_secs(config.network.max_age_secs),
            )
        });
        let store = KnowledgeStore::open(layout)?;
        let client = SemanticClient::new(transport, config.network.clone(), cache);
        Ok(Self::assemble(config, store, client))
    }

    /// An engine that persists nothing.
    pub fn in_memory(config: FabulaConfig, transport: Box<dyn Transport>) -> Self {
        let client = SemanticClient::new(transport, config.network.clone(), None);
        Self::assemble(config, KnowledgeStore::in_memory(), client)
    }

    fn assemble(config: FabulaConfig, store: KnowledgeStore, client: SemanticClient) -> Self {
        let generalizer = Generalizer::new(&config.generalizer);
        Self {
            config,
            store,
            client,
            generalizer,
        }
    }

    /// Import every story of `text`, checking each under `policy`.
    pub fn import_text(&mut self, text: &str, policy: &mut Policy<'_>) -> FabulaResult<ImportReport> {
        let report = import_stories(text, policy, &mut self.store, &self.client)?;
        tracing::info!(%report, "import finished");
        Ok(report)
    }

    /// Import a story file.
    pub fn import_file(&mut self, path: &Path, policy: &mut Policy<'_>) -> FabulaResult<ImportReport> {
        let text = read_input(path)?;
        self.import_text(&text, policy)
    }

    /// Check one story and store it in the original partition if admitted.
    pub fn admit_story(&mut self, story: Story, policy: &mut Policy<'_>) -> FabulaResult<Verdict> {
        let verdict = check_story(&story, policy, &self.client, self.store.allow_lists_mut())?;
        if verdict.is_admitted() {
            self.store.add_story(story, false)?;
        }
        Ok(verdict)
    }

    /// Generalize a stored story, optionally saving the result. Generalized
    /// stories are not generalized again (`None`).
    pub fn generalize_story(&mut self, id: &str, save: bool) -> FabulaResult<Option<Generalization>> {
        let story = self
            .store
            .get_story(id)
            .cloned()
            .ok_or_else(|| StoreError::StoryNotFound { id: id.to_string() })?;
        if story.generalized {
            return Ok(None);
        }
        let generalization =
            self.generalizer
                .generalize(&story, &self.client, &mut self.store)?;
        if save {
            self.store.add_story(generalization.story.clone(), true)?;
        }
        Ok(Some(generalization))
    }

    /// Generalize and save every original story. Returns the new story ids.
    pub fn generalize_all(&mut self) -> FabulaResult<Vec<String>> {
        let ids: Vec<String> = self
            .store
            .stories(Some(false))
            .map(|s| s.id.clone())
            .collect();
        let mut saved = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(g) = self.generalize_story(&id, true)? {
                saved.push(g.story.id);
            }
        }
        tracing::info!(count = saved.len(), "stories generalized");
        Ok(saved)
    }

    fn predictor(&self, include_generalized: bool) -> Predictor {
        Predictor::new(self.config.predictor.clone()).with_generalized(include_generalized)
    }

    /// Predict every blank of a partial story.
    pub fn predict_missing<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        include_generalized: bool,
    ) -> FabulaResult<Vec<Prediction>> {
        let predictor = self.predictor(include_generalized);
        Ok(predictor.predict_missing(lines, &mut self.store, &self.client)?)
    }

    /// Complete every story of a batch text.
    pub fn complete_batch(&mut self, text: &str, include_generalized: bool) -> FabulaResult<Vec<CompletedStory>> {
        let marker = self.config.predictor.blank_marker.clone();
        let predictor = self.predictor(include_generalized);
        let mut out = Vec::new();
        for BlankedStory { title, lines } in parse_blanked_stories(text, &marker) {
            let predictions = predictor.predict_missing(lines.as_slice(), &mut self.store, &self.client)?;
            out.push(CompletedStory {
                title,
                lines: complete(&lines, &predictions, &marker),
            });
        }
        Ok(out)
    }

    /// Rewrite every persisted index.
    pub fn flush(&self) -> FabulaResult<()> {
        Ok(self.store.flush()?)
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            original_stories: self.store.story_count(Some(false)),
            generalized_stories: self.store.story_count(Some(true)),
            original_factoids: self.store.factoid_count(Some(false)),
            generalized_factoids: self.store.factoid_count(Some(true)),
            valid_terms: self.store.allow_lists().term_count(),
            valid_relations: self.store.allow_lists().relation_count(),
            relation_types: self.client.relation_type_catalog().len(),
            cached_responses: self.client.cache().map(ResponseCache::memory_len),
            persistent: self.store.layout().is_some(),
        }
    }

    pub fn config(&self) -> &FabulaConfig {
        &self.config
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn client(&self) -> &SemanticClient {
        &self.client
    }

    /// Categories known to generalize well, including those found this session.
    pub fn categories(&self) -> &[String] {
        self.generalizer.categories()
    }
}

/// Summary statistics about the knowledge base.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInfo {
    pub original_stories: usize,
    pub generalized_stories: usize,
    pub original_factoids: usize,
    pub generalized_factoids: usize,
    pub valid_terms: usize,
    pub valid_relations: usize,
    pub relation_types: usize,
    /// `None` when caching is disabled.
    pub cached_responses: Option<usize>,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "fabula knowledge base")?;
        writeln!(
            f,
            "  stories:          {} original, {} generalized",
            self.original_stories, self.generalized_stories
        )?;
        writeln!(
            f,
            "  factoids:         {} original, {} generalized",
            self.original_factoids, self.generalized_factoids
        )?;
        writeln!(f, "  valid terms:      {}", self.valid_terms)?;
        writeln!(f, "  valid relations:  {}", self.valid_relations)?;
        writeln!(f, "  relation types:   {}", self.relation_types)?;
        match self.cached_responses {
            Some(n) => writeln!(f, "  cached responses: {n}")?,
            None => writeln!(f, "  cached responses: (cache disabled)")?,
        }
        writeln!(f, "  persistent:       {}", self.persistent)?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("client", &self.client)
            .finish()
    }
}
