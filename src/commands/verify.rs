//! Verify command handler: mapping coverage for one subject.

use anyhow::Result;

use topicmap_core::Coverage;
use topicmap_core::topics::filter_for_exam;

use super::RunContext;
use crate::cli::VerifyArgs;

pub async fn run_verify_command(args: &VerifyArgs, ctx: &RunContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let coverage = store.coverage(args.subject).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&coverage)?);
        return Ok(());
    }

    print!("{}", render_coverage(&coverage));

    if let Some(exam) = args.exam.as_deref() {
        let topics = store.fetch_canonical_topics(args.subject).await?;
        let weighted = filter_for_exam(&topics, exam);
        let uncovered: Vec<&str> = weighted
            .iter()
            .filter(|topic| !coverage.distribution.iter().any(|(name, _)| *name == topic.name))
            .map(|topic| topic.name.as_str())
            .collect();

        println!(
            "{exam}: {} weighted topics, {} without linked questions",
            weighted.len(),
            uncovered.len()
        );
        for name in uncovered {
            println!("  {name}");
        }
    }

    Ok(())
}

fn render_coverage(coverage: &Coverage) -> String {
    let mut out = format!(
        "{}: {} questions, {} with topic label, {} mapped ({:.1}%)\n",
        coverage.subject,
        coverage.total_questions,
        coverage.with_topic,
        coverage.mapped,
        coverage.mapped_percent()
    );
    if coverage.distribution.is_empty() {
        out.push_str("No questions linked to canonical topics yet.\n");
        return out;
    }

    out.push_str("Topic distribution:\n");
    for (name, count) in &coverage.distribution {
        out.push_str(&format!("  {count:>5}  {name}\n"));
    }
    out
}
