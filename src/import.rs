//! Story import from tagged text.
//!
//! Input format: a line without brackets names the domain of the story that
//! follows; each tagged line below it is one factoid.
//!
//! ```text
//! Repas
//! [sujet] chat [predicat] manger [objet] croquettes
//! [sujet] chat [predicat] dormir
//! ```

use std::path::Path;

use crate::checker::{Policy, RejectReason, Verdict, check_story};
use crate::error::{ImportError, StoreResult};
use crate::factoid::Story;
use crate::network::SemanticClient;
use crate::store::KnowledgeStore;
use crate::tagger::{is_tagged_line, tag_sentence};

/// A domain line and the tagged lines under it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryBlock {
    pub domain: String,
    pub lines: Vec<String>,
}

/// Split `text` into story blocks. Blocks without any tagged line, and tagged
/// lines before the first domain, are dropped.
pub fn parse_story_blocks(text: &str) -> Vec<StoryBlock> {
    let mut blocks: Vec<StoryBlock> = Vec::new();
    let mut current: Option<StoryBlock> = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !is_tagged_line(line) {
            blocks.extend(current.take());
            current = Some(StoryBlock {
                domain: line.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(block) = current.as_mut() {
            block.lines.push(line.to_string());
        } else {
            tracing::warn!(line, "tagged line before any domain line; skipped");
        }
    }
    blocks.extend(current);
    blocks.retain(|b| !b.lines.is_empty());
    blocks
}

/// Turn blocks into stories: ids `<domain>_<n>` numbered from 1 across the
/// whole run, factoid ids drawn from `store`.
pub fn build_stories(blocks: &[StoryBlock], store: &mut KnowledgeStore) -> Vec<Story> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let id = Story::make_id(&block.domain, i + 1);
            let factoids = block
                .lines
                .iter()
                .map(|line| {
                    let mut f = tag_sentence(line);
                    f.id = store.next_factoid_id();
                    f.original_sentence = line.to_lowercase();
                    f.story_id = id.clone();
                    f
                })
                .collect();
            Story {
                id,
                domain: block.domain.clone(),
                factoids,
                generalized: false,
            }
        })
        .collect()
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub admitted: Vec<String>,
    pub rejected: Vec<(String, RejectReason)>,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} stories imported, {} rejected",
            self.admitted.len(),
            self.rejected.len()
        )
    }
}

/// Check every story of `text` under `policy` and store the admitted ones in
/// the original partition.
pub fn import_stories(
    text: &str,
    policy: &mut Policy<'_>,
    store: &mut KnowledgeStore,
    client: &SemanticClient,
) -> StoreResult<ImportReport> {
    let blocks = parse_story_blocks(text);
    let stories = build_stories(&blocks, store);
    let mut report = ImportReport::default();
    for story in stories {
        match check_story(&story, policy, client, store.allow_lists_mut())? {
            Verdict::Admitted => {
                report.admitted.push(story.id.clone());
                store.add_story(story, false)?;
            }
            Verdict::Rejected(reason) => {
                tracing::warn!(story = %story.id, ?reason, "story rejected");
                report.rejected.push((story.id, reason));
            }
        }
    }
    Ok(report)
}

/// Read an input file, failing when it holds no story at all.
pub fn read_input(path: &Path) -> Result<String, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ImportError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    if parse_story_blocks(&text).is_empty() {
        return Err(ImportError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "
Repas
[sujet] Chat [predicat] manger [objet] croquettes
[sujet] chat [predicat] dormir

Vide
Au Parc
[sujet] chien [predicat] courir [lieu] parc
";

    #[test]
    fn blocks_follow_domain_lines() {
        let blocks = parse_story_blocks(TEXT);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].domain, "Repas");
        assert_eq!(blocks[0].lines.len(), 2);
        assert_eq!(blocks[1].domain, "Au Parc");
    }

    #[test]
    fn stories_are_numbered_across_the_run() {
        let mut store = KnowledgeStore::in_memory();
        let stories = build_stories(&parse_story_blocks(TEXT), &mut store);
        assert_eq!(stories[0].id, "repas_1");
        assert_eq!(stories[1].id, "au_parc_2");

        let first = &stories[0].factoids[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.subject, "chat");
        assert_eq!(first.story_id, "repas_1");
        assert_eq!(first.original_sentence, "[sujet] chat [predicat] manger [objet] croquettes");
        assert_eq!(stories[1].factoids[0].id, 3);
        assert_eq!(stories[1].factoids[0].location, "parc");
    }

    #[test]
    fn leading_tagged_lines_are_skipped() {
        let blocks = parse_story_blocks("[sujet] chat [predicat] dormir\nRepas\n[sujet] chat [predicat] manger");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["[sujet] chat [predicat] manger"]);
    }

    #[test]
    fn empty_input_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("histoires.txt");
        std::fs::write(&path, "Repas\n\n").unwrap();
        assert!(matches!(read_input(&path), Err(ImportError::Empty { .. })));
        assert!(matches!(
            read_input(&tmp.path().join("absent.txt")),
            Err(ImportError::Read { .. })
        ));
    }
}
