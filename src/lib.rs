//! topicmap core library
//!
//! Resolves the free-text topic labels that exam-question extraction
//! produces into a fixed syllabus, and aggregates questions into per-topic
//! counts for progress reporting.
//!
//! # Architecture
//!
//! - [`topics`] - pure matching and aggregation (no IO beyond loading data files)
//! - [`scan`] - year and exam context recovered from scan names
//! - [`store`] - SQLite persistence behind the [`store::TopicRepository`] seam
//! - [`db`] - database connection and schema management
//! - [`config`] - config file loading for the binary

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod model;
pub mod scan;
pub mod store;
pub mod topics;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use model::{CanonicalTopic, Question, Scan, ScanQuestion, StudyStage, Subject, TopicSummary};
pub use store::{Coverage, QuestionScope, StoreError, TopicRepository, TopicStore};
pub use topics::{
    AliasTable, MatchKind, MatchOutcome, MatchPolicy, MappingReport, TopicMatcher,
    aggregate_topics, map_questions,
};
