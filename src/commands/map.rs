//! Map command handler: link unmapped questions to canonical topics.

use anyhow::Result;
use tracing::{info, warn};

use topicmap_core::topics::{AliasTable, MappingReport, TopicMatcher, map_questions};
use topicmap_core::{MatchPolicy, QuestionScope, Subject, TopicRepository};

use super::RunContext;
use crate::cli::MapArgs;

/// One mapping pass over a repository.
#[derive(Debug)]
pub struct MapRun {
    pub report: MappingReport,
    /// Links actually written (zero for dry runs).
    pub stored: u64,
}

/// Matches every unmapped question of `subject` and, unless `dry_run`,
/// stores the resulting links.
pub async fn map_subject(
    repo: &dyn TopicRepository,
    subject: Subject,
    aliases: AliasTable,
    policy: MatchPolicy,
    dry_run: bool,
) -> Result<MapRun> {
    let topics = repo.fetch_canonical_topics(subject).await?;
    if topics.is_empty() {
        warn!(%subject, "No canonical topics stored for subject; run `topicmap seed` first");
    }

    let matcher = TopicMatcher::new(topics, aliases).with_policy(policy);
    let questions = repo.fetch_questions(subject, &QuestionScope::All).await?;
    let already_mapped = repo.mapped_question_ids(subject).await?;

    let report = map_questions(&matcher, &questions, &already_mapped);
    let stored = if dry_run || report.links.is_empty() {
        0
    } else {
        repo.save_links(&report.links).await?
    };

    info!(%subject, dry_run, stored, "Mapping finished");
    Ok(MapRun { report, stored })
}

pub async fn run_map_command(args: &MapArgs, ctx: &RunContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let run = map_subject(
        &store,
        args.subject,
        ctx.load_aliases()?,
        ctx.policy,
        args.dry_run,
    )
    .await?;

    print!("{}", render_report(&run, args));
    Ok(())
}

fn render_report(run: &MapRun, args: &MapArgs) -> String {
    let report = &run.report;
    let mut out = format!(
        "{}: {} questions, {} matched, {} unmatched, {} already mapped\n",
        args.subject,
        report.total(),
        report.links.len(),
        report.unmatched.len(),
        report.skipped
    );

    for (kind, count) in report.counts_by_kind() {
        out.push_str(&format!("  {kind:<14} {count:>6}\n"));
    }
    if args.dry_run {
        out.push_str("Dry run: no links stored\n");
    } else {
        out.push_str(&format!("Stored {} new links\n", run.stored));
    }

    if report.unmatched.is_empty() {
        return out;
    }

    out.push_str("Unmatched by reason:\n");
    for (reason, count) in report.counts_by_reason() {
        out.push_str(&format!("  {reason:<18} {count:>6}\n"));
    }

    let summary = report.unmatched_summary();
    out.push_str(&format!(
        "Top unmatched labels ({} of {}):\n",
        summary.len().min(args.top),
        summary.len()
    ));
    for entry in summary.iter().take(args.top) {
        out.push_str(&format!(
            "  {:>5}  {}\n",
            entry.total_questions, entry.topic_name
        ));
    }
    out
}
