//! Topic label normalization shared by matching and aggregation.

/// Grouping key for questions with no usable topic label.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Minimum length (in chars) of a word considered for word-overlap matching.
/// Shorter words are mostly connectives ("and", "of", "the").
const SIGNIFICANT_WORD_MIN_CHARS: usize = 5;

/// Returns the aggregation key for a raw label.
///
/// Missing, empty or whitespace-only labels map to [`UNCATEGORIZED`];
/// anything else is used verbatim.
#[must_use]
pub fn grouping_key(label: Option<&str>) -> &str {
    match label {
        Some(value) if !value.trim().is_empty() => value,
        _ => UNCATEGORIZED,
    }
}

/// Folds a label for comparison: collapse whitespace and lowercase.
///
/// Returns an empty string for blank input.
#[must_use]
pub fn fold_topic(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Splits an already-folded label into words long enough to be meaningful.
pub fn significant_words(folded: &str) -> impl Iterator<Item = &str> {
    folded
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| word.chars().count() >= SIGNIFICANT_WORD_MIN_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_key_blank_labels_are_uncategorized() {
        assert_eq!(grouping_key(None), UNCATEGORIZED);
        assert_eq!(grouping_key(Some("")), UNCATEGORIZED);
        assert_eq!(grouping_key(Some("   \t")), UNCATEGORIZED);
    }

    #[test]
    fn test_grouping_key_keeps_label_verbatim() {
        assert_eq!(grouping_key(Some("Vectors")), "Vectors");
        assert_eq!(grouping_key(Some(" Vectors ")), " Vectors ");
    }

    #[test]
    fn test_fold_topic_lowercases_and_collapses_whitespace() {
        assert_eq!(fold_topic("  Three   Dimensional\tGeometry "), "three dimensional geometry");
        assert_eq!(fold_topic("LPP"), "lpp");
        assert!(fold_topic("  ").is_empty());
    }

    #[test]
    fn test_fold_topic_is_idempotent() {
        let once = fold_topic("  Relations  AND Functions ");
        assert_eq!(fold_topic(&once), once);
    }

    #[test]
    fn test_significant_words_skips_short_words() {
        let words: Vec<_> = significant_words("alcohols phenols and ethers").collect();
        assert_eq!(words, vec!["alcohols", "phenols", "ethers"]);
    }

    #[test]
    fn test_significant_words_splits_on_punctuation() {
        let words: Vec<_> = significant_words("three-dimensional geometry").collect();
        assert_eq!(words, vec!["three", "dimensional", "geometry"]);
    }
}
