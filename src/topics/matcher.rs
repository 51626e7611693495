//! Resolution of free-text topic labels to canonical syllabus topics.
//!
//! Steps, first success wins (all comparisons on folded text):
//! 1. exact name match
//! 2. containment (name inside label, or label inside name)
//! 3. alias table lookup, retrying 1-2 against the alias target
//! 4. word overlap, only when enabled by [`MatchPolicy::word_overlap`]
//!
//! Several containment candidates are ranked by overlap length, then by
//! normalized Levenshtein similarity, then by catalog order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::alias::{AliasTable, AliasTarget};
use super::normalizer::{fold_topic, significant_words};
use crate::model::{CanonicalTopic, Question, Subject};

/// Optional matcher behaviour. The default is the plain four-step order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchPolicy {
    /// Consult the alias table before containment matching.
    pub prefer_aliases: bool,
    /// Fall back to significant-word overlap when every other step fails.
    pub word_overlap: bool,
}

/// How a canonical topic was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Containment,
    Alias,
    WordOverlap,
}

impl MatchKind {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Containment => "containment",
            Self::Alias => "alias",
            Self::WordOverlap => "word_overlap",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "containment" => Ok(Self::Containment),
            "alias" => Ok(Self::Alias),
            "word_overlap" => Ok(Self::WordOverlap),
            _ => Err(format!("invalid match kind: {s}")),
        }
    }
}

/// Why no canonical topic was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Label missing or blank.
    EmptyTopic,
    /// The catalog has no topics for the subject.
    UnknownSubject,
    /// The label is an alias explicitly marked as not mappable.
    ExcludedByAlias,
    /// No step produced a candidate.
    NoCandidate,
}

impl UnmatchedReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyTopic => "empty_topic",
            Self::UnknownSubject => "unknown_subject",
            Self::ExcludedByAlias => "excluded_by_alias",
            Self::NoCandidate => "no_candidate",
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicMatch<'a> {
    pub topic: &'a CanonicalTopic,
    pub kind: MatchKind,
    /// Alias phrase that led to the match, for [`MatchKind::Alias`].
    pub via_alias: Option<&'a str>,
    /// Match strength in `0.0..=1.0`.
    pub confidence: f64,
}

/// Result of matching one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome<'a> {
    Matched(TopicMatch<'a>),
    Unmatched(UnmatchedReason),
}

impl<'a> MatchOutcome<'a> {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// The matched canonical topic, if any.
    #[must_use]
    pub fn topic(&self) -> Option<&'a CanonicalTopic> {
        match self {
            Self::Matched(found) => Some(found.topic),
            Self::Unmatched(_) => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<MatchKind> {
        match self {
            Self::Matched(found) => Some(found.kind),
            Self::Unmatched(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedTopic {
    topic: CanonicalTopic,
    folded: String,
    folded_chars: usize,
    words: Vec<String>,
}

impl IndexedTopic {
    fn new(topic: CanonicalTopic) -> Self {
        let folded = fold_topic(&topic.name);
        let words = significant_words(&folded).map(String::from).collect();
        Self {
            folded_chars: folded.chars().count(),
            folded,
            words,
            topic,
        }
    }
}

/// Subject-partitioned canonical catalog plus alias table.
///
/// Holds no mutable state; a single matcher can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct TopicMatcher {
    subjects: HashMap<Subject, Vec<IndexedTopic>>,
    aliases: AliasTable,
    policy: MatchPolicy,
}

impl TopicMatcher {
    /// Builds a matcher over a canonical catalog.
    ///
    /// Catalog order is kept per subject (it is the final tie-break). A second
    /// topic whose name folds to an existing one in the same subject is dropped.
    #[must_use]
    pub fn new(topics: impl IntoIterator<Item = CanonicalTopic>, aliases: AliasTable) -> Self {
        let mut subjects: HashMap<Subject, Vec<IndexedTopic>> = HashMap::new();
        let mut seen: HashSet<(Subject, String)> = HashSet::new();

        for topic in topics {
            let indexed = IndexedTopic::new(topic);
            if indexed.folded.is_empty() {
                warn!(id = %indexed.topic.id, "Skipping canonical topic with blank name");
                continue;
            }
            if !seen.insert((indexed.topic.subject, indexed.folded.clone())) {
                warn!(
                    id = %indexed.topic.id,
                    name = %indexed.topic.name,
                    subject = %indexed.topic.subject,
                    "Skipping duplicate canonical topic name"
                );
                continue;
            }
            subjects.entry(indexed.topic.subject).or_default().push(indexed);
        }

        Self {
            subjects,
            aliases,
            policy: MatchPolicy::default(),
        }
    }

    /// Replaces the matching policy.
    #[must_use]
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Returns true when the catalog has at least one topic for `subject`.
    #[must_use]
    pub fn has_subject(&self, subject: Subject) -> bool {
        self.subjects.contains_key(&subject)
    }

    /// Canonical topics of a subject, in catalog order.
    pub fn topics_for(&self, subject: Subject) -> impl Iterator<Item = &CanonicalTopic> {
        self.subjects
            .get(&subject)
            .into_iter()
            .flatten()
            .map(|indexed| &indexed.topic)
    }

    /// Matches a question by its topic label and subject.
    #[must_use]
    pub fn match_question(&self, question: &Question) -> MatchOutcome<'_> {
        self.match_topic(question.topic.as_deref(), question.subject)
    }

    /// Matches a free-text label against the subject's canonical topics.
    #[must_use]
    #[instrument(level = "trace", skip(self))]
    pub fn match_topic(&self, topic: Option<&str>, subject: Subject) -> MatchOutcome<'_> {
        let folded = topic.map(fold_topic).unwrap_or_default();
        if folded.is_empty() {
            return MatchOutcome::Unmatched(UnmatchedReason::EmptyTopic);
        }

        let Some(candidates) = self.subjects.get(&subject) else {
            return MatchOutcome::Unmatched(UnmatchedReason::UnknownSubject);
        };

        if let Some(found) = exact(candidates, &folded) {
            return MatchOutcome::Matched(found);
        }

        if self.policy.prefer_aliases
            && let Some(outcome) = self.alias_step(candidates, subject, &folded)
        {
            return outcome;
        }

        if let Some(found) = containment(candidates, &folded) {
            return MatchOutcome::Matched(found);
        }

        if !self.policy.prefer_aliases
            && let Some(outcome) = self.alias_step(candidates, subject, &folded)
        {
            return outcome;
        }

        if self.policy.word_overlap
            && let Some(found) = word_overlap(candidates, &folded)
        {
            return MatchOutcome::Matched(found);
        }

        MatchOutcome::Unmatched(UnmatchedReason::NoCandidate)
    }

    fn alias_step<'a>(
        &'a self,
        candidates: &'a [IndexedTopic],
        subject: Subject,
        folded: &str,
    ) -> Option<MatchOutcome<'a>> {
        let entry = self.aliases.resolve_folded(subject, folded)?;
        let target = match &entry.target {
            AliasTarget::Excluded => {
                return Some(MatchOutcome::Unmatched(UnmatchedReason::ExcludedByAlias));
            }
            AliasTarget::Canonical(name) => fold_topic(name),
        };

        let retried = exact(candidates, &target).or_else(|| containment(candidates, &target));
        match retried {
            Some(found) => Some(MatchOutcome::Matched(TopicMatch {
                kind: MatchKind::Alias,
                via_alias: Some(entry.phrase.as_str()),
                ..found
            })),
            None => {
                debug!(alias = %entry.phrase, target = %target, %subject, "Alias target not in catalog");
                None
            }
        }
    }
}

fn exact<'a>(candidates: &'a [IndexedTopic], folded: &str) -> Option<TopicMatch<'a>> {
    candidates
        .iter()
        .find(|candidate| candidate.folded == folded)
        .map(|candidate| TopicMatch {
            topic: &candidate.topic,
            kind: MatchKind::Exact,
            via_alias: None,
            confidence: 1.0,
        })
}

#[allow(clippy::cast_precision_loss)]
fn containment<'a>(candidates: &'a [IndexedTopic], folded: &str) -> Option<TopicMatch<'a>> {
    let input_chars = folded.chars().count();
    // (candidate, overlap chars, similarity, confidence)
    let mut best: Option<(&IndexedTopic, usize, f64, f64)> = None;

    for candidate in candidates {
        let overlap = if folded.contains(candidate.folded.as_str()) {
            candidate.folded_chars
        } else if candidate.folded.contains(folded) {
            input_chars
        } else {
            continue;
        };

        let similarity = strsim::normalized_levenshtein(folded, &candidate.folded);
        let is_better = best.is_none_or(|(_, best_overlap, best_similarity, _)| {
            overlap > best_overlap || (overlap == best_overlap && similarity > best_similarity)
        });
        if is_better {
            let confidence = overlap as f64 / input_chars.max(candidate.folded_chars) as f64;
            best = Some((candidate, overlap, similarity, confidence));
        }
    }

    best.map(|(candidate, _, _, confidence)| TopicMatch {
        topic: &candidate.topic,
        kind: MatchKind::Containment,
        via_alias: None,
        confidence,
    })
}

#[allow(clippy::cast_precision_loss)]
fn word_overlap<'a>(candidates: &'a [IndexedTopic], folded: &str) -> Option<TopicMatch<'a>> {
    let input_words: Vec<&str> = significant_words(folded).collect();
    if input_words.is_empty() {
        return None;
    }

    let mut best: Option<(&IndexedTopic, usize)> = None;
    for candidate in candidates {
        let shared = input_words
            .iter()
            .filter(|word| {
                candidate
                    .words
                    .iter()
                    .any(|own| own.contains(*word) || word.contains(own.as_str()))
            })
            .count();
        if shared > 0 && best.is_none_or(|(_, best_shared)| shared > best_shared) {
            best = Some((candidate, shared));
        }
    }

    best.map(|(candidate, shared)| TopicMatch {
        topic: &candidate.topic,
        kind: MatchKind::WordOverlap,
        via_alias: None,
        confidence: shared as f64 / input_words.len() as f64,
    })
}
