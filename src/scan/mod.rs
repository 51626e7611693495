//! Metadata recovered from scan names.
//!
//! Scans uploaded before year and exam fields existed only carry that
//! information in their names, e.g. `"KCET 2023 Math"` or `"20-05-2023"`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{Scan, Subject};

/// Earliest year accepted from a scan name.
pub const MIN_SCAN_YEAR: u16 = 2010;
/// Latest year accepted from a scan name.
pub const MAX_SCAN_YEAR: u16 = 2030;

/// Exam names recognised in scan names, in priority order.
const NAMED_EXAMS: [&str; 3] = ["NEET", "JEE", "KCET"];

#[allow(clippy::expect_used)]
static BARE_YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(20\d{2})\b").expect("bare year regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DAY_FIRST_DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{2}-\d{2}-(20\d{2})\b").expect("day-first date regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static YEAR_FIRST_DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(20\d{2})-\d{2}-\d{2}\b").expect("year-first date regex is valid") // Static pattern, safe to panic
});

/// Extracts the exam year from a scan name or filename.
///
/// Patterns are tried in order: a standalone `20xx`, then `DD-MM-20xx`, then
/// `20xx-MM-DD`. Only the first occurrence of each pattern is considered, and
/// only years in [`MIN_SCAN_YEAR`]`..=`[`MAX_SCAN_YEAR`] are accepted.
///
/// # Examples
///
/// ```
/// use topicmap_core::scan::extract_year;
///
/// assert_eq!(extract_year("KCET 2023 Math"), Some(2023));
/// assert_eq!(extract_year("Mock paper 2005"), None);
/// assert_eq!(extract_year("Practice set"), None);
/// ```
#[must_use]
pub fn extract_year(name: &str) -> Option<u16> {
    [
        &*BARE_YEAR_PATTERN,
        &*DAY_FIRST_DATE_PATTERN,
        &*YEAR_FIRST_DATE_PATTERN,
    ]
    .into_iter()
    .filter_map(|pattern| pattern.captures(name))
    .filter_map(|captures| captures.get(1)?.as_str().parse::<u16>().ok())
    .find(|year| (MIN_SCAN_YEAR..=MAX_SCAN_YEAR).contains(year))
}

/// Decides which exam a scan belongs to.
///
/// An explicit, non-blank `exam_context` wins. Otherwise the upper-cased name
/// is searched for `NEET`, `JEE`, `KCET` (first hit wins), then `CBSE` or
/// `BOARD` (giving `CBSE`). Names without a hint fall back to `NEET` for
/// Biology and `KCET` for the other subjects.
#[must_use]
pub fn infer_exam_context(scan: &Scan) -> String {
    if let Some(explicit) = scan.exam_context.as_deref()
        && !explicit.trim().is_empty()
    {
        return explicit.trim().to_string();
    }

    let name = scan.name.to_uppercase();
    if let Some(exam) = NAMED_EXAMS.iter().find(|exam| name.contains(*exam)) {
        return (*exam).to_string();
    }
    if name.contains("CBSE") || name.contains("BOARD") {
        return "CBSE".to_string();
    }

    match scan.subject {
        Subject::Biology => "NEET".to_string(),
        _ => "KCET".to_string(),
    }
}

/// Fills a scan's missing `year` and `exam_context` from its name.
///
/// Returns `true` if anything changed.
pub fn backfill_metadata(scan: &mut Scan) -> bool {
    let mut changed = false;

    if scan.year.as_deref().is_none_or(|year| year.trim().is_empty())
        && let Some(year) = extract_year(&scan.name)
    {
        scan.year = Some(year.to_string());
        changed = true;
    }

    if scan
        .exam_context
        .as_deref()
        .is_none_or(|exam| exam.trim().is_empty())
    {
        scan.exam_context = Some(infer_exam_context(scan));
        changed = true;
    }

    if changed {
        debug!(
            scan = %scan.id,
            year = scan.year.as_deref().unwrap_or("-"),
            exam = scan.exam_context.as_deref().unwrap_or("-"),
            "Backfilled scan metadata"
        );
    }
    changed
}
