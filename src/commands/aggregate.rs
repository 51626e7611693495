//! Aggregate command handler: per-topic question counts.

use anyhow::Result;

use topicmap_core::topics::aggregate_scans;
use topicmap_core::{QuestionScope, TopicSummary, aggregate_topics};

use super::RunContext;
use super::import::read_scans;
use crate::cli::AggregateArgs;

pub async fn run_aggregate_command(args: &AggregateArgs, ctx: &RunContext) -> Result<()> {
    let summaries = collect_summaries(args, ctx).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No {} questions matched the current filters.", args.subject);
        return Ok(());
    }
    print!("{}", render_table(&summaries));
    Ok(())
}

async fn collect_summaries(args: &AggregateArgs, ctx: &RunContext) -> Result<Vec<TopicSummary>> {
    if let Some(input) = &args.input {
        let mut scans = read_scans(input)?;
        for scan in &mut scans {
            topicmap_core::scan::backfill_metadata(scan);
        }
        // clap enforces --exam alongside --input
        let exam = args.exam.as_deref().unwrap_or_default();
        return Ok(aggregate_scans(&scans, args.subject, exam));
    }

    let scope = match (&args.scan, &args.user) {
        (Some(scan), _) => QuestionScope::Scan(scan.clone()),
        (None, Some(user)) => QuestionScope::VisibleTo(user.clone()),
        (None, None) => QuestionScope::All,
    };

    let store = ctx.open_store().await?;
    let questions = store
        .fetch_questions_for_exam(args.subject, &scope, args.exam.as_deref())
        .await?;
    Ok(aggregate_topics(&questions))
}

fn render_table(summaries: &[TopicSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.topic_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Topic".len());
    let total: usize = summaries.iter().map(|s| s.total_questions).sum();

    let mut out = format!("{:<width$}  {:>9}\n", "Topic", "Questions");
    for summary in summaries {
        out.push_str(&format!(
            "{:<width$}  {:>9}\n",
            summary.topic_name, summary.total_questions
        ));
    }
    out.push_str(&format!("{:<width$}  {:>9}\n", "Total", total));
    out
}
