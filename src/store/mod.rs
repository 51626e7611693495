//! SQLite-backed storage for topics, scans, questions and topic links.
//!
//! # Overview
//!
//! - [`TopicStore`] - reads questions and the canonical catalog, writes links
//! - [`TopicRepository`] - the data-access seam the commands depend on
//! - [`QuestionScope`] - which questions of a subject to read
//! - [`Coverage`] - mapping progress for one subject
//! - [`StoreError`] - operation error types
//!
//! # Example
//!
//! ```ignore
//! use topicmap_core::store::{QuestionScope, TopicStore};
//! use topicmap_core::{Database, Subject};
//! use std::path::Path;
//!
//! let db = Database::new(Path::new("topicmap.db")).await?;
//! let store = TopicStore::new(db);
//! let questions = store.fetch_questions(Subject::Math, &QuestionScope::All).await?;
//! ```

mod error;
mod repository;

pub use error::{StoreDbErrorKind, StoreError};
pub use repository::TopicRepository;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info, instrument};

use crate::db::Database;
use crate::model::{CanonicalTopic, ExtraFields, Question, Scan, Subject};
use crate::topics::QuestionTopicLink;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Which questions of a subject to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuestionScope {
    /// Every question of the subject.
    #[default]
    All,
    /// Questions of one scan.
    Scan(String),
    /// Questions of the user's own scans plus published system scans.
    VisibleTo(String),
}

/// Mapping progress for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub subject: Subject,
    pub total_questions: i64,
    /// Questions with a non-blank topic label.
    pub with_topic: i64,
    /// Questions linked to at least one canonical topic.
    pub mapped: i64,
    /// Canonical topic name to linked question count, most linked first.
    pub distribution: Vec<(String, i64)>,
}

impl Coverage {
    /// Share of questions linked to a canonical topic, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mapped_percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.mapped as f64 * 100.0 / self.total_questions as f64
    }
}

/// Topic store backed by the shared [`Database`].
#[derive(Debug, Clone)]
pub struct TopicStore {
    db: Database,
}

impl TopicStore {
    /// Creates a store over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts or replaces a canonical topic by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails, e.g. when another
    /// topic of the same subject already has this name.
    #[instrument(skip(self, topic), fields(id = %topic.id, subject = %topic.subject))]
    pub async fn upsert_topic(&self, topic: &CanonicalTopic) -> Result<()> {
        let weightage = weightage_json(topic)?;
        sqlx::query(UPSERT_TOPIC_SQL)
            .bind(&topic.id)
            .bind(&topic.name)
            .bind(topic.subject.as_str())
            .bind(topic.domain.as_deref())
            .bind(weightage)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Upserts a whole catalog in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any write fails; nothing is kept.
    #[instrument(skip_all, fields(topics = topics.len()))]
    pub async fn upsert_topics(&self, topics: &[CanonicalTopic]) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;
        for topic in topics {
            let weightage = weightage_json(topic)?;
            sqlx::query(UPSERT_TOPIC_SQL)
                .bind(&topic.id)
                .bind(&topic.name)
                .bind(topic.subject.as_str())
                .bind(topic.domain.as_deref())
                .bind(weightage)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!(topics = topics.len(), "Canonical topics stored");
        Ok(topics.len())
    }

    /// Stores a scan together with its questions, atomically.
    ///
    /// Returns the number of questions stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateScan`] if the scan id exists, or
    /// [`StoreError::Database`] if a write fails (e.g. a question id is
    /// already used by another scan).
    #[instrument(skip(self, scan), fields(scan = %scan.id, questions = scan.questions.len()))]
    pub async fn insert_scan(&self, scan: &Scan) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;

        let existing = sqlx::query("SELECT 1 FROM scans WHERE id = ?")
            .bind(&scan.id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(StoreError::DuplicateScan(scan.id.clone()));
        }

        sqlx::query(
            r"INSERT INTO scans (id, name, subject, exam_context, year, is_system_scan, user_id)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&scan.id)
        .bind(&scan.name)
        .bind(scan.subject.as_str())
        .bind(scan.exam_context.as_deref())
        .bind(scan.year.as_deref())
        .bind(scan.is_system_scan)
        .bind(scan.user_id.as_deref())
        .execute(&mut *tx)
        .await?;

        for question in scan.to_questions() {
            let extra = serde_json::to_string(&question.extra)
                .map_err(|e| StoreError::invalid_row("questions", &question.id, e))?;
            sqlx::query(
                r"INSERT INTO questions (id, scan_id, subject, topic, extra)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&question.id)
            .bind(question.scan_id.as_deref())
            .bind(question.subject.as_str())
            .bind(question.topic.as_deref())
            .bind(extra)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Scan stored");
        Ok(scan.questions.len())
    }

    /// Reads questions of a subject, optionally restricted to scans of one
    /// exam context. Scans with no exam context are kept. Rows come back in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails, or
    /// [`StoreError::InvalidRow`] for rows that do not decode.
    #[instrument(skip(self))]
    pub async fn fetch_questions_for_exam(
        &self,
        subject: Subject,
        scope: &QuestionScope,
        exam_context: Option<&str>,
    ) -> Result<Vec<Question>> {
        let (scope_clause, scope_value) = match scope {
            QuestionScope::All => ("", None),
            QuestionScope::Scan(id) => (" AND q.scan_id = ?", Some(id.as_str())),
            QuestionScope::VisibleTo(user) => (
                " AND (s.user_id = ? OR s.is_system_scan = 1)",
                Some(user.as_str()),
            ),
        };
        let exam_clause = if exam_context.is_some() {
            " AND (s.exam_context = ? OR s.exam_context IS NULL)"
        } else {
            ""
        };
        let sql = format!(
            r"SELECT q.id, q.topic, q.subject, q.scan_id, q.extra
              FROM questions q
              LEFT JOIN scans s ON s.id = q.scan_id
              WHERE q.subject = ?{scope_clause}{exam_clause}
              ORDER BY q.rowid"
        );

        let mut query = sqlx::query(&sql).bind(subject.as_str());
        if let Some(value) = scope_value {
            query = query.bind(value);
        }
        if let Some(exam) = exam_context {
            query = query.bind(exam);
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        let questions = rows
            .iter()
            .map(question_from_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(count = questions.len(), "Fetched questions");
        Ok(questions)
    }

    /// Reads every question of a subject within `scope`.
    ///
    /// # Errors
    ///
    /// See [`TopicStore::fetch_questions_for_exam`].
    pub async fn fetch_questions(
        &self,
        subject: Subject,
        scope: &QuestionScope,
    ) -> Result<Vec<Question>> {
        self.fetch_questions_for_exam(subject, scope, None).await
    }

    /// Reads the canonical catalog of one subject, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails, or
    /// [`StoreError::InvalidRow`] for rows that do not decode.
    #[instrument(skip(self))]
    pub async fn fetch_canonical_topics(&self, subject: Subject) -> Result<Vec<CanonicalTopic>> {
        let rows = sqlx::query(
            r"SELECT id, name, subject, domain, exam_weightage
              FROM topics
              WHERE subject = ?
              ORDER BY rowid",
        )
        .bind(subject.as_str())
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(topic_from_row).collect()
    }

    /// Ids of questions of a subject that already have a topic link.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn mapped_question_ids(&self, subject: Subject) -> Result<HashSet<String>> {
        let ids: Vec<(String,)> = sqlx::query_as(
            r"SELECT DISTINCT m.question_id
              FROM topic_question_mapping m
              JOIN questions q ON q.id = m.question_id
              WHERE q.subject = ?",
        )
        .bind(subject.as_str())
        .fetch_all(self.db.pool())
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Persists links in one transaction, skipping pairs already stored.
    ///
    /// Returns the number of links actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownLinkTarget`] if a link names a question or
    /// topic that is not stored, or [`StoreError::Database`] if a write fails.
    /// Nothing is kept in either case.
    #[instrument(skip_all, fields(links = links.len()))]
    pub async fn save_links(&self, links: &[QuestionTopicLink]) -> Result<u64> {
        let mut tx = self.db.pool().begin().await?;
        let mut inserted = 0;

        for link in links {
            let result = sqlx::query(
                r"INSERT OR IGNORE INTO topic_question_mapping
                    (question_id, topic_id, match_kind, confidence)
                  VALUES (?, ?, ?, ?)",
            )
            .bind(&link.question_id)
            .bind(&link.topic_id)
            .bind(link.kind.as_str())
            .bind(link.confidence)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                let err = StoreError::from(err);
                if err.database_kind() == Some(StoreDbErrorKind::MissingReference) {
                    StoreError::UnknownLinkTarget {
                        question_id: link.question_id.clone(),
                        topic_id: link.topic_id.clone(),
                    }
                } else {
                    err
                }
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        info!(
            inserted,
            skipped = links.len() as u64 - inserted,
            "Topic links stored"
        );
        Ok(inserted)
    }

    /// Computes mapping coverage for one subject.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a query fails.
    #[instrument(skip(self))]
    pub async fn coverage(&self, subject: Subject) -> Result<Coverage> {
        let (total_questions, with_topic): (i64, i64) = sqlx::query_as(
            r"SELECT COUNT(*),
                     COALESCE(SUM(CASE WHEN TRIM(COALESCE(topic, '')) <> '' THEN 1 ELSE 0 END), 0)
              FROM questions
              WHERE subject = ?",
        )
        .bind(subject.as_str())
        .fetch_one(self.db.pool())
        .await?;

        let (mapped,): (i64,) = sqlx::query_as(
            r"SELECT COUNT(DISTINCT m.question_id)
              FROM topic_question_mapping m
              JOIN questions q ON q.id = m.question_id
              WHERE q.subject = ?",
        )
        .bind(subject.as_str())
        .fetch_one(self.db.pool())
        .await?;

        let distribution: Vec<(String, i64)> = sqlx::query_as(
            r"SELECT t.name, COUNT(*) AS linked
              FROM topic_question_mapping m
              JOIN topics t ON t.id = m.topic_id
              JOIN questions q ON q.id = m.question_id
              WHERE q.subject = ?
              GROUP BY t.id, t.name
              ORDER BY linked DESC, t.name ASC",
        )
        .bind(subject.as_str())
        .fetch_all(self.db.pool())
        .await?;

        Ok(Coverage {
            subject,
            total_questions,
            with_topic,
            mapped,
            distribution,
        })
    }
}

const UPSERT_TOPIC_SQL: &str = r"INSERT INTO topics (id, name, subject, domain, exam_weightage)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        subject = excluded.subject,
        domain = excluded.domain,
        exam_weightage = excluded.exam_weightage,
        updated_at = datetime('now')";

fn weightage_json(topic: &CanonicalTopic) -> Result<String> {
    serde_json::to_string(&topic.exam_weightage)
        .map_err(|e| StoreError::invalid_row("topics", &topic.id, e))
}

fn parse_subject(table: &'static str, id: &str, raw: &str) -> Result<Subject> {
    raw.parse()
        .map_err(|reason: String| StoreError::invalid_row(table, id, reason))
}

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let id: String = row.try_get("id")?;
    let subject: String = row.try_get("subject")?;
    let extra: String = row.try_get("extra")?;

    Ok(Question {
        subject: parse_subject("questions", &id, &subject)?,
        extra: serde_json::from_str::<ExtraFields>(&extra)
            .map_err(|e| StoreError::invalid_row("questions", &id, e))?,
        topic: row.try_get("topic")?,
        scan_id: row.try_get("scan_id")?,
        id,
    })
}

fn topic_from_row(row: &SqliteRow) -> Result<CanonicalTopic> {
    let id: String = row.try_get("id")?;
    let subject: String = row.try_get("subject")?;
    let weightage: String = row.try_get("exam_weightage")?;

    Ok(CanonicalTopic {
        subject: parse_subject("topics", &id, &subject)?,
        exam_weightage: serde_json::from_str::<BTreeMap<String, f64>>(&weightage)
            .map_err(|e| StoreError::invalid_row("topics", &id, e))?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        id,
    })
}
