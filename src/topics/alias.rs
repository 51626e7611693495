//! Versioned alias table mapping informal topic phrasings to canonical names.
//!
//! The table is the single source of alias data for the matcher. A built-in
//! copy is embedded from `data/aliases.json`; deployments can point the
//! configuration at another file with the same shape:
//!
//! ```json
//! {"version": 2, "subjects": {"Math": {"LPP": "Linear Programming", "General": null}}}
//! ```
//!
//! A `null` target marks a phrase that must stay unmatched (too generic to
//! assign automatically). To change the built-in table, edit
//! `data/aliases.json`, bump `version` and run the test suite.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use super::normalizer::fold_topic;
use crate::model::Subject;

const BUILTIN_ALIASES: &str = include_str!("../../data/aliases.json");

/// Errors produced while loading an alias table.
#[derive(Debug, Error)]
pub enum AliasError {
    /// The alias file could not be read.
    #[error("cannot read alias table '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The alias file is not valid JSON of the expected shape.
    #[error("invalid alias table: {0}")]
    Parse(#[from] serde_json::Error),

    /// A subject key is not a known subject.
    #[error("invalid alias table: {0}")]
    UnknownSubject(String),

    /// An alias phrase is empty after normalization.
    #[error("invalid alias table: blank alias phrase under {0}")]
    BlankPhrase(Subject),

    /// Two phrases that compare equal point at different targets.
    #[error(
        "conflicting aliases for '{phrase}' under {subject}\n  Suggestion: Keep a single entry per phrase (aliases compare case-insensitively)"
    )]
    Conflict { subject: Subject, phrase: String },
}

/// What an alias phrase resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// Resolve to this canonical topic name.
    Canonical(String),
    /// Known phrase that must not be mapped automatically.
    Excluded,
}

/// One alias phrase and its target, as written in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub phrase: String,
    pub target: AliasTarget,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAliasTable {
    version: u32,
    #[serde(default)]
    subjects: BTreeMap<String, BTreeMap<String, Option<String>>>,
}

/// Per-subject alias lookup keyed by folded phrase.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    version: u32,
    subjects: HashMap<Subject, HashMap<String, AliasEntry>>,
}

impl AliasTable {
    /// Creates an empty table (version 0).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the table embedded at build time.
    ///
    /// # Errors
    /// Returns an error if the embedded JSON is malformed.
    pub fn builtin() -> Result<Self, AliasError> {
        Self::from_json(BUILTIN_ALIASES)
    }

    /// Parses a table from JSON text.
    ///
    /// # Errors
    /// Returns an error for malformed JSON, unknown subjects, blank phrases
    /// or conflicting entries.
    pub fn from_json(raw: &str) -> Result<Self, AliasError> {
        let parsed: RawAliasTable = serde_json::from_str(raw)?;
        let mut table = Self {
            version: parsed.version,
            subjects: HashMap::new(),
        };

        for (subject_key, entries) in parsed.subjects {
            let subject: Subject = subject_key.parse().map_err(AliasError::UnknownSubject)?;
            for (phrase, target) in entries {
                let target = target.map_or(AliasTarget::Excluded, AliasTarget::Canonical);
                table.insert(subject, &phrase, target)?;
            }
        }

        Ok(table)
    }

    /// Loads a table from a JSON file.
    ///
    /// # Errors
    /// Returns [`AliasError::Io`] if the file cannot be read, or any parse error.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, AliasError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AliasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&raw)?;
        debug!(version = table.version, aliases = table.len(), "Loaded alias table");
        Ok(table)
    }

    /// Adds an alias. Re-adding an equal phrase with the same target is a no-op.
    ///
    /// # Errors
    /// Returns [`AliasError::BlankPhrase`] or [`AliasError::Conflict`].
    pub fn insert(
        &mut self,
        subject: Subject,
        phrase: &str,
        target: AliasTarget,
    ) -> Result<(), AliasError> {
        let key = fold_topic(phrase);
        if key.is_empty() {
            return Err(AliasError::BlankPhrase(subject));
        }

        let entries = self.subjects.entry(subject).or_default();
        if let Some(existing) = entries.get(&key) {
            if existing.target == target {
                return Ok(());
            }
            return Err(AliasError::Conflict {
                subject,
                phrase: phrase.to_string(),
            });
        }

        entries.insert(
            key,
            AliasEntry {
                phrase: phrase.trim().to_string(),
                target,
            },
        );
        Ok(())
    }

    /// Table version as declared in the source file.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Total number of aliases across subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a phrase (case-insensitive, whitespace-collapsed).
    #[must_use]
    pub fn resolve(&self, subject: Subject, phrase: &str) -> Option<&AliasEntry> {
        self.resolve_folded(subject, &fold_topic(phrase))
    }

    pub(crate) fn resolve_folded(&self, subject: Subject, folded: &str) -> Option<&AliasEntry> {
        self.subjects.get(&subject)?.get(folded)
    }

    /// Lists `canonical_name` followed by every phrase resolving to it, sorted.
    #[must_use]
    pub fn variations_of<'a>(&'a self, subject: Subject, canonical_name: &'a str) -> Vec<&'a str> {
        let wanted = fold_topic(canonical_name);
        let mut phrases: Vec<&str> = self
            .subjects
            .get(&subject)
            .into_iter()
            .flat_map(HashMap::values)
            .filter(|entry| match &entry.target {
                AliasTarget::Canonical(name) => fold_topic(name) == wanted,
                AliasTarget::Excluded => false,
            })
            .map(|entry| entry.phrase.as_str())
            .collect();
        phrases.sort_unstable();

        let mut variations = vec![canonical_name];
        variations.extend(phrases);
        variations
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_table_parses() {
        let table = AliasTable::builtin().unwrap();
        assert!(table.version() >= 1);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_builtin_table_maps_definite_integration() {
        let table = AliasTable::builtin().unwrap();
        let entry = table.resolve(Subject::Math, "definite integration").unwrap();
        assert_eq!(entry.target, AliasTarget::Canonical("Integrals".to_string()));
    }

    #[test]
    fn test_builtin_table_excludes_generic_phrases() {
        let table = AliasTable::builtin().unwrap();
        let entry = table.resolve(Subject::Math, "General").unwrap();
        assert_eq!(entry.target, AliasTarget::Excluded);
    }

    #[test]
    fn test_resolve_is_subject_scoped() {
        let table = AliasTable::builtin().unwrap();
        assert!(table.resolve(Subject::Physics, "LPP").is_none());
        assert!(table.resolve(Subject::Math, "LPP").is_some());
    }

    #[test]
    fn test_resolve_ignores_case_and_spacing() {
        let table = AliasTable::from_json(
            r#"{"version": 1, "subjects": {"Math": {"3D Geometry": "Three Dimensional Geometry"}}}"#,
        )
        .unwrap();
        assert!(table.resolve(Subject::Math, "  3d   GEOMETRY ").is_some());
    }

    #[test]
    fn test_from_json_rejects_unknown_subject() {
        let result = AliasTable::from_json(r#"{"version": 1, "subjects": {"History": {}}}"#);
        assert!(matches!(result, Err(AliasError::UnknownSubject(_))));
    }

    #[test]
    fn test_from_json_rejects_case_conflicts() {
        let result = AliasTable::from_json(
            r#"{"version": 1, "subjects": {"Math": {"Vector": "Vectors", "VECTOR": "Matrices"}}}"#,
        );
        assert!(matches!(result, Err(AliasError::Conflict { .. })));
    }

    #[test]
    fn test_from_json_accepts_duplicate_with_same_target() {
        let table = AliasTable::from_json(
            r#"{"version": 1, "subjects": {"Math": {"Vector": "Vectors", "vector": "Vectors"}}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let result = AliasTable::from_json(r#"{"version": 1, "aliases": {}}"#);
        assert!(matches!(result, Err(AliasError::Parse(_))));
    }

    #[test]
    fn test_insert_rejects_blank_phrase() {
        let mut table = AliasTable::empty();
        let result = table.insert(Subject::Math, "   ", AliasTarget::Excluded);
        assert!(matches!(result, Err(AliasError::BlankPhrase(Subject::Math))));
    }

    #[test]
    fn test_variations_of_lists_canonical_first() {
        let table = AliasTable::from_json(
            r#"{"version": 1, "subjects": {"Math": {
                "Vector Algebra": "Vectors",
                "Vector": "Vectors",
                "Matrix": "Matrices",
                "General": null
            }}}"#,
        )
        .unwrap();

        let variations = table.variations_of(Subject::Math, "Vectors");
        assert_eq!(variations, vec!["Vectors", "Vector", "Vector Algebra"]);
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": 7, "subjects": {{"Physics": {{"Optics": "Ray Optics and Optical Instruments"}}}}}}"#
        )
        .unwrap();

        let table = AliasTable::load(file.path()).unwrap();
        assert_eq!(table.version(), 7);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_nonexistent_file_errors() {
        let result = AliasTable::load(Path::new("/nonexistent/aliases.json"));
        assert!(matches!(result, Err(AliasError::Io { .. })));
    }
}
