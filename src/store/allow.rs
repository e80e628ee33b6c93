//! Allow-lists of terms and relations already confirmed valid.
//!
//! Once a term or `(relation, term_a, term_b)` triple is recorded here the
//! checker never asks the semantic network about it again. Each new entry is
//! persisted immediately.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::files::{read_json, write_json};
use crate::error::StoreResult;
use crate::factoid::normalize_term;
use crate::network::RelationKind;

/// One confirmed pair for a relation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermPair {
    #[serde(alias = "node1")]
    pub term_a: String,
    #[serde(alias = "node2")]
    pub term_b: String,
}

#[derive(Debug, Clone)]
struct Files {
    terms: PathBuf,
    relations: PathBuf,
}

/// Valid terms and valid relations, optionally backed by two JSON files.
#[derive(Debug, Clone, Default)]
pub struct AllowLists {
    terms: BTreeSet<String>,
    relations: BTreeMap<String, Vec<TermPair>>,
    files: Option<Files>,
}

impl AllowLists {
    /// Lists that live only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load both lists, treating absent files as empty.
    pub fn load(terms_file: PathBuf, relations_file: PathBuf) -> StoreResult<Self> {
        let terms: Vec<String> = read_json(&terms_file)?.unwrap_or_default();
        let mut relations: BTreeMap<String, Vec<TermPair>> =
            read_json(&relations_file)?.unwrap_or_default();
        for pair in relations.values_mut().flatten() {
            pair.term_a = normalize_term(&pair.term_a);
            pair.term_b = normalize_term(&pair.term_b);
        }
        Ok(Self {
            terms: terms.iter().map(|t| normalize_term(t)).collect(),
            relations,
            files: Some(Files {
                terms: terms_file,
                relations: relations_file,
            }),
        })
    }

    pub fn is_valid_term(&self, term: &str) -> bool {
        self.terms.contains(&normalize_term(term))
    }

    /// Record `term` as valid. Returns `true` if it was new.
    pub fn add_term(&mut self, term: &str) -> StoreResult<bool> {
        if !self.terms.insert(normalize_term(term)) {
            return Ok(false);
        }
        if let Some(files) = &self.files {
            write_json(&files.terms, &self.terms)?;
        }
        Ok(true)
    }

    pub fn is_valid_relation(&self, kind: RelationKind, term_a: &str, term_b: &str) -> bool {
        let (a, b) = (normalize_term(term_a), normalize_term(term_b));
        self.relations
            .get(kind.wire_name())
            .is_some_and(|pairs| pairs.iter().any(|p| p.term_a == a && p.term_b == b))
    }

    /// Record `term_a -kind-> term_b` as valid. Returns `true` if it was new.
    pub fn add_relation(&mut self, kind: RelationKind, term_a: &str, term_b: &str) -> StoreResult<bool> {
        if self.is_valid_relation(kind, term_a, term_b) {
            return Ok(false);
        }
        self.relations
            .entry(kind.wire_name().to_string())
            .or_default()
            .push(TermPair {
                term_a: normalize_term(term_a),
                term_b: normalize_term(term_b),
            });
        if let Some(files) = &self.files {
            write_json(&files.relations, &self.relations)?;
        }
        Ok(true)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of recorded triples across all relation types.
    pub fn relation_count(&self) -> usize {
        self.relations.values().map(Vec::len).sum()
    }

    /// Rewrite both files.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(files) = &self.files {
            write_json(&files.terms, &self.terms)?;
            write_json(&files.relations, &self.relations)?;
        }
        Ok(())
    }
}
