//! Consistency checker: may a story enter the store?
//!
//! Every term of every factoid must be a node of the semantic network, and
//! four predicate-centred relations must be attested, either on the local
//! allow-lists or live. What happens to an unattested item is decided by the
//! caller's [`Policy`].

use crate::error::StoreResult;
use crate::factoid::{Factoid, Story};
use crate::network::{RelationKind, SemanticClient};
use crate::store::AllowLists;

/// An item the semantic network could not confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownItem {
    Term(String),
    /// No relation of the group links `source` to `target`.
    Relation {
        group: &'static [RelationKind],
        source: String,
        target: String,
    },
}

impl std::fmt::Display for UnknownItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnknownItem::Term(term) => write!(f, "term \"{term}\" not found in the semantic network"),
            UnknownItem::Relation { group, source, target } => {
                let names: Vec<&str> = group.iter().map(|k| k.wire_name()).collect();
                write!(f, "no {} relation from \"{source}\" to \"{target}\"", names.join("/"))
            }
        }
    }
}

/// Answer to an interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

/// What to do with an unknown term or relation.
pub enum Policy<'a> {
    /// Accept and record it as valid.
    Force,
    /// Reject the whole story.
    Ignore,
    /// Ask; accepted items are recorded.
    Interactive(&'a mut dyn FnMut(&UnknownItem) -> Decision),
}

impl Policy<'_> {
    fn decide(&mut self, item: &UnknownItem) -> Decision {
        match self {
            Policy::Force => Decision::Accept,
            Policy::Ignore => Decision::Reject,
            Policy::Interactive(ask) => ask(item),
        }
    }
}

impl std::fmt::Debug for Policy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Force => f.write_str("Force"),
            Policy::Ignore => f.write_str("Ignore"),
            Policy::Interactive(_) => f.write_str("Interactive"),
        }
    }
}

/// Why a story was turned away.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    UnknownTerm(String),
    MissingRelation {
        relation: RelationKind,
        source: String,
        target: String,
    },
}

/// Outcome of [`check_story`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Admitted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Admitted)
    }
}

/// One of the four relation checks: the relation kinds that satisfy it and
/// the role paired with the predicate.
struct RelationCheck {
    group: &'static [RelationKind],
    target: fn(&Factoid) -> &str,
}

const RELATION_CHECKS: [RelationCheck; 4] = [
    RelationCheck {
        group: &[RelationKind::Agent],
        target: subject,
    },
    RelationCheck {
        group: &[RelationKind::Patient, RelationKind::Instrument],
        target: object,
    },
    RelationCheck {
        group: &[RelationKind::ActionLocation],
        target: location,
    },
    RelationCheck {
        group: &[RelationKind::Time],
        target: time,
    },
];

fn subject(f: &Factoid) -> &str {
    &f.subject
}

fn object(f: &Factoid) -> &str {
    &f.object
}

fn location(f: &Factoid) -> &str {
    &f.location
}

fn time(f: &Factoid) -> &str {
    &f.time
}

/// Validate `story` term by term, then relation by relation, stopping at the
/// first rejected item.
///
/// Terms and relations confirmed live, and unknown ones accepted by the
/// policy, are recorded on `allow` so they are never queried again.
pub fn check_story(
    story: &Story,
    policy: &mut Policy<'_>,
    client: &SemanticClient,
    allow: &mut AllowLists,
) -> StoreResult<Verdict> {
    for factoid in &story.factoids {
        if let Some(reason) = check_terms(factoid, policy, client, allow)? {
            tracing::debug!(story = %story.id, ?reason, "story rejected");
            return Ok(Verdict::Rejected(reason));
        }
        if let Some(reason) = check_relations(factoid, policy, client, allow)? {
            tracing::debug!(story = %story.id, ?reason, "story rejected");
            return Ok(Verdict::Rejected(reason));
        }
    }
    Ok(Verdict::Admitted)
}

fn check_terms(
    factoid: &Factoid,
    policy: &mut Policy<'_>,
    client: &SemanticClient,
    allow: &mut AllowLists,
) -> StoreResult<Option<RejectReason>> {
    for (_, term) in factoid.terms() {
        if allow.is_valid_term(term) {
            continue;
        }
        if client.lookup_node(term).is_some() {
            allow.add_term(term)?;
            continue;
        }
        tracing::info!(term, "term not found in the semantic network");
        match policy.decide(&UnknownItem::Term(term.to_string())) {
            Decision::Accept => {
                allow.add_term(term)?;
            }
            Decision::Reject => return Ok(Some(RejectReason::UnknownTerm(term.to_string()))),
        }
    }
    Ok(None)
}

fn check_relations(
    factoid: &Factoid,
    policy: &mut Policy<'_>,
    client: &SemanticClient,
    allow: &mut AllowLists,
) -> StoreResult<Option<RejectReason>> {
    let source = factoid.predicate.as_str();
    for check in &RELATION_CHECKS {
        let target = (check.target)(factoid);
        if source.is_empty() || target.is_empty() {
            continue;
        }
        if check
            .group
            .iter()
            .any(|&kind| allow.is_valid_relation(kind, source, target))
        {
            continue;
        }
        if let Some(&kind) = check
            .group
            .iter()
            .find(|&&kind| client.has_relation(source, target, kind))
        {
            allow.add_relation(kind, source, target)?;
            continue;
        }

        let first = check.group[0];
        let item = UnknownItem::Relation {
            group: check.group,
            source: source.to_string(),
            target: target.to_string(),
        };
        match policy.decide(&item) {
            Decision::Accept => {
                allow.add_relation(first, source, target)?;
            }
            Decision::Reject => {
                return Ok(Some(RejectReason::MissingRelation {
                    relation: first,
                    source: source.to_string(),
                    target: target.to_string(),
                }));
            }
        }
    }
    Ok(None)
}
