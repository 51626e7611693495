//! Grouping of topic-labelled records into per-topic summaries.

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::normalizer::grouping_key;
use crate::model::{CanonicalTopic, Scan, Subject, TopicLabel, TopicSummary};

/// Groups records by raw topic label and counts each group.
///
/// Every record lands in exactly one group: its label when present and not
/// blank, otherwise [`super::UNCATEGORIZED`]. Groups are sorted by count
/// descending; equal counts keep the order in which the label was first seen.
#[must_use]
#[instrument(skip_all)]
pub fn aggregate_topics<I>(items: I) -> Vec<TopicSummary>
where
    I: IntoIterator,
    I::Item: TopicLabel,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, usize)> = Vec::new();
    let mut total = 0usize;

    for item in items {
        total += 1;
        let key = grouping_key(item.topic_label());
        if let Some(&slot) = slots.get(key) {
            groups[slot].1 += 1;
        } else {
            slots.insert(key.to_string(), groups.len());
            groups.push((key.to_string(), 1));
        }
    }

    // sort_by is stable, so ties keep first-seen order
    groups.sort_by(|a, b| b.1.cmp(&a.1));

    debug!(questions = total, topics = groups.len(), "Aggregated topics");

    groups
        .into_iter()
        .map(|(name, count)| TopicSummary::new(name, count))
        .collect()
}

/// Aggregates the questions embedded in scans for one subject and exam.
///
/// A scan qualifies when its subject matches and its exam context equals
/// `exam_context` or is unset.
#[must_use]
#[instrument(skip(scans), fields(scans = scans.len()))]
pub fn aggregate_scans(scans: &[Scan], subject: Subject, exam_context: &str) -> Vec<TopicSummary> {
    let relevant: Vec<&Scan> = scans
        .iter()
        .filter(|scan| {
            scan.subject == subject
                && scan
                    .exam_context
                    .as_deref()
                    .is_none_or(|context| context == exam_context)
        })
        .collect();

    debug!(relevant = relevant.len(), "Selected scans for aggregation");

    aggregate_topics(relevant.iter().flat_map(|scan| scan.questions.iter()))
}

/// Keeps canonical topics that carry a positive weight for the exam.
#[must_use]
pub fn filter_for_exam<'a>(topics: &'a [CanonicalTopic], exam_context: &str) -> Vec<&'a CanonicalTopic> {
    topics
        .iter()
        .filter(|topic| topic.weight_for(exam_context).is_some_and(|weight| weight > 0.0))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Question, ScanQuestion, StudyStage};
    use crate::topics::UNCATEGORIZED;

    fn question(id: &str, topic: Option<&str>) -> Question {
        Question::new(id, Subject::Math, topic)
    }

    fn scan(id: &str, subject: Subject, exam: Option<&str>, topics: &[&str]) -> Scan {
        Scan {
            id: id.to_string(),
            name: format!("scan {id}"),
            subject,
            exam_context: exam.map(String::from),
            year: None,
            is_system_scan: false,
            user_id: None,
            questions: topics
                .iter()
                .enumerate()
                .map(|(i, topic)| ScanQuestion {
                    id: format!("{id}-{i}"),
                    topic: Some((*topic).to_string()),
                    extra: serde_json::Map::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_aggregate_topics_empty_input_returns_empty() {
        let summaries = aggregate_topics(Vec::<Question>::new());
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_aggregate_topics_reference_scenario() {
        let questions = vec![
            question("1", Some("Vectors")),
            question("2", Some("Vectors")),
            question("3", Some("")),
            question("4", Some("Probability")),
        ];

        let summaries = aggregate_topics(&questions);

        let pairs: Vec<_> = summaries
            .iter()
            .map(|s| (s.topic_name.as_str(), s.total_questions))
            .collect();
        assert_eq!(
            pairs,
            vec![("Vectors", 2), (UNCATEGORIZED, 1), ("Probability", 1)]
        );
    }

    #[test]
    fn test_aggregate_topics_missing_and_blank_topics_share_uncategorized() {
        let questions = vec![
            question("1", None),
            question("2", Some("")),
            question("3", Some("   ")),
        ];

        let summaries = aggregate_topics(&questions);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].topic_name, UNCATEGORIZED);
        assert_eq!(summaries[0].total_questions, 3);
    }

    #[test]
    fn test_aggregate_topics_counts_partition_input() {
        let labels = [
            Some("Matrices"),
            None,
            Some("Determinants"),
            Some("Matrices"),
            Some("Integrals"),
            Some(""),
            Some("Integrals"),
            Some("Integrals"),
        ];
        let questions: Vec<_> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| question(&i.to_string(), *label))
            .collect();

        let summaries = aggregate_topics(&questions);

        let total: usize = summaries.iter().map(|s| s.total_questions).sum();
        assert_eq!(total, questions.len());
        assert!(
            summaries
                .windows(2)
                .all(|pair| pair[0].total_questions >= pair[1].total_questions)
        );
        assert_eq!(summaries[0].topic_name, "Integrals");
    }

    #[test]
    fn test_aggregate_topics_ties_keep_first_seen_order() {
        let questions = vec![
            question("1", Some("Probability")),
            question("2", Some("Matrices")),
            question("3", Some("Vectors")),
            question("4", Some("Matrices")),
            question("5", Some("Probability")),
        ];

        let names: Vec<_> = aggregate_topics(&questions)
            .into_iter()
            .map(|s| s.topic_name)
            .collect();

        assert_eq!(names, vec!["Probability", "Matrices", "Vectors"]);
    }

    #[test]
    fn test_aggregate_topics_keys_are_case_sensitive() {
        let questions = vec![question("1", Some("vectors")), question("2", Some("Vectors"))];
        assert_eq!(aggregate_topics(&questions).len(), 2);
    }

    #[test]
    fn test_aggregate_topics_fills_progress_placeholders() {
        let summaries = aggregate_topics(&[question("1", Some("Vectors"))]);
        assert_eq!(summaries[0].mastery_level, 0);
        assert_eq!(summaries[0].study_stage, StudyStage::NotStarted);
    }

    #[test]
    fn test_aggregate_topics_accepts_plain_labels() {
        let labels = vec![Some("Ecosystem".to_string()), None, Some("Ecosystem".to_string())];
        let summaries = aggregate_topics(&labels);
        assert_eq!(summaries[0].topic_name, "Ecosystem");
        assert_eq!(summaries[0].total_questions, 2);
        assert_eq!(summaries[1].topic_name, UNCATEGORIZED);
    }

    #[test]
    fn test_aggregate_scans_filters_subject_and_exam() {
        let scans = vec![
            scan("a", Subject::Math, Some("KCET"), &["Vectors", "Matrices"]),
            scan("b", Subject::Math, None, &["Vectors"]),
            scan("c", Subject::Math, Some("JEE"), &["Probability"]),
            scan("d", Subject::Physics, Some("KCET"), &["Atoms"]),
        ];

        let summaries = aggregate_scans(&scans, Subject::Math, "KCET");

        let pairs: Vec<_> = summaries
            .iter()
            .map(|s| (s.topic_name.as_str(), s.total_questions))
            .collect();
        assert_eq!(pairs, vec![("Vectors", 2), ("Matrices", 1)]);
    }

    #[test]
    fn test_filter_for_exam_keeps_positive_weights_in_order() {
        let mut integrals = CanonicalTopic::new("1", "Integrals", Subject::Math);
        integrals.exam_weightage.insert("KCET".into(), 8.0);
        let mut vectors = CanonicalTopic::new("2", "Vectors", Subject::Math);
        vectors.exam_weightage.insert("KCET".into(), 0.0);
        let unweighted = CanonicalTopic::new("3", "Matrices", Subject::Math);
        let mut probability = CanonicalTopic::new("4", "Probability", Subject::Math);
        probability.exam_weightage.insert("KCET".into(), 5.0);

        let topics = vec![integrals, vectors, unweighted, probability];
        let names: Vec<_> = filter_for_exam(&topics, "KCET")
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();

        assert_eq!(names, vec!["Integrals", "Probability"]);
    }
}
