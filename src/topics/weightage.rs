//! Exam weightage tables supplied as external configuration.
//!
//! Shape: `{"Math": {"Integrals": {"KCET": 6.0, "PUCII": 6.0}}}`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::normalizer::fold_topic;
use crate::model::{CanonicalTopic, Subject};

/// Errors produced while loading a weightage table.
#[derive(Debug, Error)]
pub enum WeightageError {
    #[error("cannot read weightage table '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid weightage table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid weightage table: negative weight {weight} for '{topic}' ({exam})")]
    NegativeWeight {
        topic: String,
        exam: String,
        weight: f64,
    },
}

/// Subject → topic name → exam context → weight percentage.
#[derive(Debug, Clone, Default)]
pub struct WeightageTable {
    entries: BTreeMap<Subject, BTreeMap<String, BTreeMap<String, f64>>>,
}

impl WeightageTable {
    /// Parses a table from JSON text.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or negative weights.
    pub fn from_json(raw: &str) -> Result<Self, WeightageError> {
        let entries: BTreeMap<Subject, BTreeMap<String, BTreeMap<String, f64>>> =
            serde_json::from_str(raw)?;

        for topics in entries.values() {
            for (topic, weights) in topics {
                if let Some((exam, weight)) = weights.iter().find(|(_, weight)| **weight < 0.0) {
                    return Err(WeightageError::NegativeWeight {
                        topic: topic.clone(),
                        exam: exam.clone(),
                        weight: *weight,
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    /// Loads a table from a JSON file.
    ///
    /// # Errors
    /// Returns [`WeightageError::Io`] if the file cannot be read, or any parse error.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, WeightageError> {
        let raw = std::fs::read_to_string(path).map_err(|source| WeightageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&raw)?;
        debug!(topics = table.len(), "Loaded weightage table");
        Ok(table)
    }

    /// Number of weighted topics across subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merges table weights into the catalog.
///
/// Exam keys already on a topic and absent from the table are kept. Topic
/// names compare case-insensitively within a subject. Returns the
/// `(subject, name)` pairs the table mentions that the catalog lacks.
#[instrument(skip_all, fields(topics = topics.len(), weighted = table.len()))]
pub fn apply_weightage(topics: &mut [CanonicalTopic], table: &WeightageTable) -> Vec<(Subject, String)> {
    let mut positions: HashMap<(Subject, String), usize> = HashMap::new();
    for (index, topic) in topics.iter().enumerate() {
        positions
            .entry((topic.subject, fold_topic(&topic.name)))
            .or_insert(index);
    }

    let mut missing = Vec::new();
    for (subject, named) in &table.entries {
        for (name, weights) in named {
            match positions.get(&(*subject, fold_topic(name))) {
                Some(&index) => {
                    let target = &mut topics[index].exam_weightage;
                    for (exam, weight) in weights {
                        target.insert(exam.clone(), *weight);
                    }
                }
                None => {
                    warn!(%subject, topic = %name, "Weightage given for topic missing from catalog");
                    missing.push((*subject, name.clone()));
                }
            }
        }
    }

    missing
}
