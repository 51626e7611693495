//! Typed records shared by the matcher, the aggregator and the store.
//!
//! Records are validated at the boundary (serde for JSON files, explicit
//! column decoding for the database) so the core only ever sees well-formed
//! values with clearly optional fields.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pass-through fields the core never inspects (marks, difficulty, text, ...).
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Subject domain a question or canonical topic belongs to.
///
/// Matching never crosses subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Math,
    Physics,
    Chemistry,
    Biology,
}

impl Subject {
    /// All subjects in display order.
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
    ];

    /// Returns the canonical display/database representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Math => "Math",
            Self::Physics => "Physics",
            Self::Chemistry => "Chemistry",
            Self::Biology => "Biology",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" | "maths" | "mathematics" => Ok(Self::Math),
            "physics" => Ok(Self::Physics),
            "chemistry" => Ok(Self::Chemistry),
            "biology" => Ok(Self::Biology),
            _ => Err(format!(
                "unknown subject: {s} (expected Math, Physics, Chemistry or Biology)"
            )),
        }
    }
}

impl Serialize for Subject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Anything carrying an optional free-text topic label.
pub trait TopicLabel {
    /// Returns the raw topic label, if any.
    fn topic_label(&self) -> Option<&str>;
}

impl<T: TopicLabel + ?Sized> TopicLabel for &T {
    fn topic_label(&self) -> Option<&str> {
        (**self).topic_label()
    }
}

impl TopicLabel for Option<String> {
    fn topic_label(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl TopicLabel for Option<&str> {
    fn topic_label(&self) -> Option<&str> {
        *self
    }
}

/// A question record as supplied by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Question {
    /// Creates a question with no scan and no extra fields.
    #[must_use]
    pub fn new(id: impl Into<String>, subject: Subject, topic: Option<&str>) -> Self {
        Self {
            id: id.into(),
            topic: topic.map(String::from),
            subject,
            scan_id: None,
            extra: ExtraFields::new(),
        }
    }
}

impl TopicLabel for Question {
    fn topic_label(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

/// An entry of the authoritative syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTopic {
    pub id: String,
    pub name: String,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Exam context (e.g. `KCET`) to weight percentage.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exam_weightage: BTreeMap<String, f64>,
}

impl CanonicalTopic {
    /// Creates a canonical topic without domain or weightage.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, subject: Subject) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subject,
            domain: None,
            exam_weightage: BTreeMap::new(),
        }
    }

    /// Returns the weight for an exam context, if configured.
    #[must_use]
    pub fn weight_for(&self, exam_context: &str) -> Option<f64> {
        self.exam_weightage.get(exam_context).copied()
    }
}

/// Study progress placeholder filled in by a progress tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStage {
    #[default]
    NotStarted,
    Studying,
    Reviewing,
    Mastered,
}

/// Per-topic aggregation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    /// Grouping key (raw label, not a canonical id).
    pub topic_name: String,
    pub total_questions: usize,
    pub mastery_level: u8,
    pub study_stage: StudyStage,
}

impl TopicSummary {
    /// Creates a summary with default progress placeholders.
    #[must_use]
    pub fn new(topic_name: impl Into<String>, total_questions: usize) -> Self {
        Self {
            topic_name: topic_name.into(),
            total_questions,
            mastery_level: 0,
            study_stage: StudyStage::NotStarted,
        }
    }
}

/// A question embedded in a scan document; inherits the scan's subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanQuestion {
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl TopicLabel for ScanQuestion {
    fn topic_label(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

/// A digitized exam paper and the questions extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: String,
    pub name: String,
    pub subject: Subject,
    #[serde(default)]
    pub exam_context: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// Published scans are visible to every user.
    #[serde(default)]
    pub is_system_scan: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<ScanQuestion>,
}

impl Scan {
    /// Converts embedded questions into standalone records tied to this scan.
    #[must_use]
    pub fn to_questions(&self) -> Vec<Question> {
        self.questions
            .iter()
            .map(|q| Question {
                id: q.id.clone(),
                topic: q.topic.clone(),
                subject: self.subject,
                scan_id: Some(self.id.clone()),
                extra: q.extra.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parses_case_insensitively() {
        assert_eq!("math".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!("Mathematics".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!(" PHYSICS ".parse::<Subject>().unwrap(), Subject::Physics);
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn test_subject_serde_uses_display_name() {
        let json = serde_json::to_string(&Subject::Biology).unwrap();
        assert_eq!(json, "\"Biology\"");
        let parsed: Subject = serde_json::from_str("\"chemistry\"").unwrap();
        assert_eq!(parsed, Subject::Chemistry);
    }

    #[test]
    fn test_question_keeps_extra_fields() {
        let raw = r#"{"id":"q1","topic":"Vectors","subject":"Math","marks":4,"difficulty":"Hard"}"#;
        let question: Question = serde_json::from_str(raw).unwrap();
        assert_eq!(question.topic.as_deref(), Some("Vectors"));
        assert_eq!(question.extra.get("marks"), Some(&serde_json::json!(4)));
        assert_eq!(
            question.extra.get("difficulty"),
            Some(&serde_json::json!("Hard"))
        );

        let back = serde_json::to_value(&question).unwrap();
        assert_eq!(back["marks"], 4);
    }

    #[test]
    fn test_question_topic_null_is_none() {
        let raw = r#"{"id":"q1","topic":null,"subject":"Math"}"#;
        let question: Question = serde_json::from_str(raw).unwrap();
        assert!(question.topic.is_none());
    }

    #[test]
    fn test_topic_summary_serializes_camel_case() {
        let summary = TopicSummary::new("Vectors", 2);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["topicName"], "Vectors");
        assert_eq!(value["totalQuestions"], 2);
        assert_eq!(value["masteryLevel"], 0);
        assert_eq!(value["studyStage"], "not_started");
    }

    #[test]
    fn test_scan_to_questions_inherits_subject_and_scan_id() {
        let raw = r#"{
            "id": "s1",
            "name": "KCET 2023 Math",
            "subject": "Math",
            "questions": [{"id": "q1", "topic": "Matrices"}, {"id": "q2"}]
        }"#;
        let scan: Scan = serde_json::from_str(raw).unwrap();
        let questions = scan.to_questions();
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.subject == Subject::Math));
        assert!(questions.iter().all(|q| q.scan_id.as_deref() == Some("s1")));
        assert!(questions[1].topic.is_none());
    }

    #[test]
    fn test_canonical_topic_weight_for() {
        let mut topic = CanonicalTopic::new("t1", "Integrals", Subject::Math);
        topic.exam_weightage.insert("KCET".to_string(), 8.0);
        assert_eq!(topic.weight_for("KCET"), Some(8.0));
        assert_eq!(topic.weight_for("NEET"), None);
    }
}
