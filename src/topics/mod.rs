//! Topic matching and aggregation.
//!
//! This module resolves free-text topic labels attached to questions into
//! canonical syllabus topics ([`TopicMatcher`]) and groups question records
//! by label for reporting ([`aggregate_topics`]). Everything here is pure and
//! synchronous; loading inputs and persisting results belongs to the caller.

mod aggregator;
mod alias;
mod mapping;
mod matcher;
mod normalizer;
mod weightage;

pub use aggregator::{aggregate_scans, aggregate_topics, filter_for_exam};
pub use alias::{AliasEntry, AliasError, AliasTable, AliasTarget};
pub use mapping::{MappingReport, QuestionTopicLink, UnmatchedQuestion, map_questions};
pub use matcher::{MatchKind, MatchOutcome, MatchPolicy, TopicMatch, TopicMatcher, UnmatchedReason};
pub use normalizer::{UNCATEGORIZED, fold_topic, grouping_key};
pub use weightage::{WeightageError, WeightageTable, apply_weightage};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::instrument;

use crate::model::CanonicalTopic;

const BUILTIN_SYLLABUS: &str = include_str!("../../data/syllabus.json");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyllabusFile {
    topics: Vec<CanonicalTopic>,
}

/// Parses a syllabus document (`{"topics": [...]}`) into canonical topics.
///
/// # Errors
/// Returns error if the text is not a valid syllabus document.
pub fn parse_canonical_topics(raw: &str) -> Result<Vec<CanonicalTopic>> {
    let file: SyllabusFile = serde_json::from_str(raw).context("Invalid syllabus document")?;
    Ok(file.topics)
}

/// Returns the syllabus embedded at build time.
///
/// # Errors
/// Returns error if the embedded document is malformed.
pub fn builtin_canonical_topics() -> Result<Vec<CanonicalTopic>> {
    parse_canonical_topics(BUILTIN_SYLLABUS)
}

/// Loads a syllabus document from a file.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
#[instrument]
pub fn load_canonical_topics(path: &Path) -> Result<Vec<CanonicalTopic>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read syllabus file '{}'", path.display()))?;

    parse_canonical_topics(&content)
        .with_context(|| format!("Cannot parse syllabus file '{}'", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Subject;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_syllabus_covers_every_subject() {
        let topics = builtin_canonical_topics().unwrap();
        for subject in Subject::ALL {
            assert!(
                topics.iter().any(|t| t.subject == subject),
                "missing topics for {subject}"
            );
        }
    }

    #[test]
    fn test_builtin_syllabus_names_unique_per_subject() {
        let topics = builtin_canonical_topics().unwrap();
        let mut seen = HashSet::new();
        for topic in &topics {
            assert!(
                seen.insert((topic.subject, fold_topic(&topic.name))),
                "duplicate topic {}",
                topic.name
            );
        }
        let ids: HashSet<_> = topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), topics.len());
    }

    #[test]
    fn test_builtin_aliases_resolve_to_their_own_topic() {
        let topics = builtin_canonical_topics().unwrap();
        let default = TopicMatcher::new(topics.clone(), AliasTable::builtin().unwrap());
        let preferring = TopicMatcher::new(topics, AliasTable::builtin().unwrap()).with_policy(
            MatchPolicy {
                prefer_aliases: true,
                word_overlap: false,
            },
        );

        for matcher in [&default, &preferring] {
            for subject in Subject::ALL {
                let names: Vec<String> = matcher
                    .topics_for(subject)
                    .map(|t| t.name.clone())
                    .collect();
                for name in names {
                    for variation in matcher.aliases().variations_of(subject, &name) {
                        let outcome = matcher.match_topic(Some(variation), subject);
                        assert_eq!(
                            outcome.topic().map(|t| t.name.as_str()),
                            Some(name.as_str()),
                            "'{variation}' ({subject}) should resolve to '{name}'"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_builtin_aliases_have_no_shadowed_entries() {
        // Labels that containment would send to a sibling topic stay out of
        // the built-in table.
        let aliases = AliasTable::builtin().unwrap();
        for (subject, phrase) in [
            (Subject::Math, "Derivatives"),
            (Subject::Math, "Application of Integrals"),
            (Subject::Physics, "Magnetism"),
            (Subject::Physics, "Optics"),
        ] {
            assert!(
                aliases.resolve(subject, phrase).is_none(),
                "'{phrase}' ({subject}) is shadowed by containment"
            );
        }
    }

    #[test]
    fn test_load_canonical_topics_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"topics": [{{"id": "t1", "name": "Vectors", "subject": "Math"}}]}}"#
        )
        .unwrap();

        let topics = load_canonical_topics(file.path()).unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name, "Vectors");
        assert_eq!(topics[0].subject, Subject::Math);
    }

    #[test]
    fn test_load_canonical_topics_nonexistent_file_errors() {
        let result = load_canonical_topics(Path::new("/nonexistent/syllabus.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_canonical_topics_rejects_unknown_fields() {
        let result = parse_canonical_topics(r#"{"topics": [], "extra": 1}"#);
        assert!(result.is_err());
    }
}
