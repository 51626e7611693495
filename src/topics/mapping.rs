//! Batch mapping of questions to canonical topics.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::aggregator::aggregate_topics;
use super::matcher::{MatchKind, MatchOutcome, TopicMatcher, UnmatchedReason};
use crate::model::{Question, TopicSummary};

/// A question-to-topic association ready for the mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTopicLink {
    pub question_id: String,
    pub topic_id: String,
    pub kind: MatchKind,
    pub confidence: f64,
}

/// A question the matcher could not place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedQuestion {
    pub question_id: String,
    pub topic: Option<String>,
    pub reason: UnmatchedReason,
}

/// Outcome of one mapping run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub links: Vec<QuestionTopicLink>,
    pub unmatched: Vec<UnmatchedQuestion>,
    /// Questions skipped because they were already mapped.
    pub skipped: usize,
}

impl MappingReport {
    /// Questions examined, including skipped ones.
    #[must_use]
    pub fn total(&self) -> usize {
        self.links.len() + self.unmatched.len() + self.skipped
    }

    /// Number of links per match kind.
    #[must_use]
    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for link in &self.links {
            *counts.entry(link.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of unmatched questions per reason.
    #[must_use]
    pub fn counts_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for question in &self.unmatched {
            *counts.entry(question.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Unmatched questions grouped by raw label, most frequent first.
    #[must_use]
    pub fn unmatched_summary(&self) -> Vec<TopicSummary> {
        aggregate_topics(self.unmatched.iter().map(|question| question.topic.as_deref()))
    }
}

/// Matches every question not in `already_mapped`.
///
/// Pure: the caller persists [`MappingReport::links`].
#[must_use]
#[instrument(skip_all, fields(questions = questions.len(), already_mapped = already_mapped.len()))]
pub fn map_questions(
    matcher: &TopicMatcher,
    questions: &[Question],
    already_mapped: &HashSet<String>,
) -> MappingReport {
    let mut report = MappingReport::default();

    for question in questions {
        if already_mapped.contains(&question.id) {
            report.skipped += 1;
            continue;
        }

        match matcher.match_question(question) {
            MatchOutcome::Matched(found) => report.links.push(QuestionTopicLink {
                question_id: question.id.clone(),
                topic_id: found.topic.id.clone(),
                kind: found.kind,
                confidence: found.confidence,
            }),
            MatchOutcome::Unmatched(reason) => report.unmatched.push(UnmatchedQuestion {
                question_id: question.id.clone(),
                topic: question.topic.clone(),
                reason,
            }),
        }
    }

    info!(
        mapped = report.links.len(),
        unmatched = report.unmatched.len(),
        skipped = report.skipped,
        "Mapping run complete"
    );
    if report
        .unmatched
        .iter()
        .any(|question| question.reason == UnmatchedReason::UnknownSubject)
    {
        warn!("Some questions belong to a subject with no canonical topics; the catalog needs those topics");
    }

    report
}
