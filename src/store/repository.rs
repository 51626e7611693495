//! Repository seam for the data the mapping and aggregation commands read
//! and write.
//!
//! Commands depend on this trait rather than on [`TopicStore`] so they can
//! run against any backend holding questions, the canonical catalog and
//! the question-topic links.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{QuestionScope, Result, TopicStore};
use crate::model::{CanonicalTopic, Question, Subject};
use crate::topics::QuestionTopicLink;

/// Data-access contract for topic mapping.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Reads questions of a subject within a scope.
    async fn fetch_questions(&self, subject: Subject, scope: &QuestionScope)
    -> Result<Vec<Question>>;

    /// Reads the canonical catalog of a subject.
    async fn fetch_canonical_topics(&self, subject: Subject) -> Result<Vec<CanonicalTopic>>;

    /// Ids of questions already linked to a canonical topic.
    async fn mapped_question_ids(&self, subject: Subject) -> Result<HashSet<String>>;

    /// Stores links, skipping existing pairs. Returns the inserted count.
    async fn save_links(&self, links: &[QuestionTopicLink]) -> Result<u64>;
}

#[async_trait]
impl TopicRepository for TopicStore {
    async fn fetch_questions(
        &self,
        subject: Subject,
        scope: &QuestionScope,
    ) -> Result<Vec<Question>> {
        TopicStore::fetch_questions(self, subject, scope).await
    }

    async fn fetch_canonical_topics(&self, subject: Subject) -> Result<Vec<CanonicalTopic>> {
        TopicStore::fetch_canonical_topics(self, subject).await
    }

    async fn mapped_question_ids(&self, subject: Subject) -> Result<HashSet<String>> {
        TopicStore::mapped_question_ids(self, subject).await
    }

    async fn save_links(&self, links: &[QuestionTopicLink]) -> Result<u64> {
        TopicStore::save_links(self, links).await
    }
}
