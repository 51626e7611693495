//! Seed command handler: store the canonical syllabus.

use anyhow::Result;
use tracing::{info, warn};

use topicmap_core::Subject;
use topicmap_core::topics::{apply_weightage, builtin_canonical_topics, load_canonical_topics};

use super::RunContext;
use crate::cli::SeedArgs;

pub async fn run_seed_command(args: &SeedArgs, ctx: &RunContext) -> Result<()> {
    let mut topics = match &args.file {
        Some(path) => load_canonical_topics(path)?,
        None => builtin_canonical_topics()?,
    };

    if let Some(table) = ctx.load_weightage()? {
        let missing = apply_weightage(&mut topics, &table);
        if !missing.is_empty() {
            warn!(
                missing = missing.len(),
                "Weightage table names topics absent from the syllabus"
            );
        }
    }

    let store = ctx.open_store().await?;
    let stored = store.upsert_topics(&topics).await?;
    info!(stored, "Syllabus seeded");

    for subject in Subject::ALL {
        let count = topics.iter().filter(|t| t.subject == subject).count();
        println!("{subject:<10} {count:>4} topics");
    }
    println!("Stored {stored} canonical topics in {}", ctx.database_path.display());

    Ok(())
}
