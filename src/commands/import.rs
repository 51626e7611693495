//! Import command handler: store scans with their questions.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use topicmap_core::scan::backfill_metadata;
use topicmap_core::{Scan, StoreError};

use super::RunContext;
use crate::cli::ImportArgs;

/// Reads a JSON array of scans.
pub fn read_scans(path: &Path) -> Result<Vec<Scan>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read scans file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Cannot parse scans file '{}'", path.display()))
}

/// Fills missing year and exam context from scan names; returns how many
/// scans changed.
fn backfill_scans(scans: &mut [Scan]) -> usize {
    scans
        .iter_mut()
        .map(backfill_metadata)
        .filter(|changed| *changed)
        .count()
}

pub async fn run_import_command(args: &ImportArgs, ctx: &RunContext) -> Result<()> {
    let mut scans = read_scans(&args.file)?;
    let backfilled = backfill_scans(&mut scans);

    let store = ctx.open_store().await?;
    let mut imported = 0usize;
    let mut questions = 0usize;
    let mut duplicates = 0usize;

    for scan in &scans {
        match store.insert_scan(scan).await {
            Ok(count) => {
                imported += 1;
                questions += count;
            }
            Err(StoreError::DuplicateScan(id)) => {
                warn!(scan = %id, "Scan already imported, skipping");
                duplicates += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Cannot import scan '{}'", scan.id));
            }
        }
    }

    info!(imported, questions, duplicates, backfilled, "Import complete");
    println!(
        "Imported {imported} scans ({questions} questions); {duplicates} already present, {backfilled} backfilled from scan names"
    );

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use tempfile::TempDir;
    use topicmap_core::{QuestionScope, Subject};

    const SCANS: &str = r#"[
        {"id": "s1", "name": "KCET 2023 Math", "subject": "Math",
         "questions": [{"id": "q1", "topic": "Vectors", "marks": 1},
                       {"id": "q2", "topic": "Definite Integration"}]},
        {"id": "s2", "name": "Practice", "subject": "Biology", "is_system_scan": true,
         "questions": [{"id": "q3"}]}
    ]"#;

    fn write_scans(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("scans.json");
        std::fs::write(&path, SCANS).unwrap();
        path
    }

    #[test]
    fn test_read_scans_keeps_extra_fields() {
        let dir = TempDir::new().unwrap();
        let scans = read_scans(&write_scans(&dir)).unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].questions[0].extra.get("marks"), Some(&serde_json::json!(1)));
        assert!(scans[1].is_system_scan);
    }

    #[test]
    fn test_backfill_scans_counts_changed_scans() {
        let dir = TempDir::new().unwrap();
        let mut scans = read_scans(&write_scans(&dir)).unwrap();

        assert_eq!(backfill_scans(&mut scans), 2);
        assert_eq!(scans[0].year.as_deref(), Some("2023"));
        assert_eq!(scans[0].exam_context.as_deref(), Some("KCET"));

        // Already filled in, nothing left to change.
        assert_eq!(backfill_scans(&mut scans), 0);
    }

    #[tokio::test]
    async fn test_import_stores_and_skips_duplicates() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let args = ImportArgs {
            file: write_scans(&dir),
        };

        run_import_command(&args, &ctx).await.unwrap();
        run_import_command(&args, &ctx).await.unwrap();

        let store = ctx.open_store().await.unwrap();
        let math = store
            .fetch_questions(Subject::Math, &QuestionScope::All)
            .await
            .unwrap();
        assert_eq!(math.len(), 2);
        assert_eq!(math[0].extra.get("marks"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn test_import_backfills_exam_context() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        run_import_command(
            &ImportArgs {
                file: write_scans(&dir),
            },
            &ctx,
        )
        .await
        .unwrap();

        let store = ctx.open_store().await.unwrap();
        let kcet = store
            .fetch_questions_for_exam(Subject::Math, &QuestionScope::All, Some("KCET"))
            .await
            .unwrap();
        assert_eq!(kcet.len(), 2);
        let neet = store
            .fetch_questions_for_exam(Subject::Biology, &QuestionScope::All, Some("NEET"))
            .await
            .unwrap();
        assert_eq!(neet.len(), 1);
    }

    #[tokio::test]
    async fn test_import_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let args = ImportArgs {
            file: dir.path().join("missing.json"),
        };
        let err = run_import_command(&args, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("Cannot read scans file"));
    }
}
