use std::cmp::Ordering;

use crate::models::{NormalizedScoreEntry, ScoreEntry};

/// Score given to every entry of a candidate set whose raw scores are all equal
pub const TIED_SCORE: f64 = 0.5;

/// Min-max normalizes raw scores to [0, 1] over this candidate set only
///
/// The range comes from the entries passed in, so truncating a provider's
/// result before calling this changes the normalized values.
pub fn min_max_normalize(entries: Vec<ScoreEntry>) -> Vec<NormalizedScoreEntry> {
    let (min, max) = entries
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.score), hi.max(e.score))
        });

    entries
        .into_iter()
        .map(|entry| {
            let score = if max > min {
                (entry.score - min) / (max - min)
            } else {
                TIED_SCORE
            };
            NormalizedScoreEntry::new(entry.title, score)
        })
        .collect()
}

/// Descending by score, then ascending by title
pub fn by_score_then_title(a_score: f64, a_title: &str, b_score: f64, b_title: &str) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_title.cmp(b_title))
}

/// Rounds to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, f64)]) -> Vec<ScoreEntry> {
        pairs.iter().map(|(t, s)| ScoreEntry::new(*t, *s)).collect()
    }

    #[test]
    fn test_normalize_maps_extremes_to_unit_range() {
        let normalized = min_max_normalize(raw(&[("a", 12.0), ("b", 7.0), ("c", 2.0)]));

        assert_eq!(normalized[0], NormalizedScoreEntry::new("a", 1.0));
        assert_eq!(normalized[1], NormalizedScoreEntry::new("b", 0.5));
        assert_eq!(normalized[2], NormalizedScoreEntry::new("c", 0.0));
        assert!(normalized.iter().all(|e| (0.0..=1.0).contains(&e.score)));
    }

    #[test]
    fn test_normalize_preserves_order_and_titles() {
        let normalized = min_max_normalize(raw(&[("x", 0.3), ("y", 0.9), ("z", 0.6)]));
        let titles: Vec<&str> = normalized.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["x", "y", "z"]);
        assert_eq!(normalized[1].score, 1.0);
    }

    #[test]
    fn test_normalize_all_tied_gives_half() {
        let normalized = min_max_normalize(raw(&[("a", 3.0), ("b", 3.0), ("c", 3.0)]));
        assert!(normalized.iter().all(|e| e.score == 0.5));

        let single = min_max_normalize(raw(&[("only", 42.0)]));
        assert_eq!(single, vec![NormalizedScoreEntry::new("only", 0.5)]);
    }

    #[test]
    fn test_normalize_all_zero_gives_half() {
        let normalized = min_max_normalize(raw(&[("a", 0.0), ("b", 0.0)]));
        assert!(normalized.iter().all(|e| e.score == 0.5));
    }

    #[test]
    fn test_normalize_negative_scores() {
        let normalized = min_max_normalize(raw(&[("a", 0.2), ("b", -0.2)]));
        assert_eq!(normalized[0].score, 1.0);
        assert_eq!(normalized[1].score, 0.0);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(min_max_normalize(Vec::new()).is_empty());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn test_ordering_breaks_ties_by_title() {
        let mut items = vec![("b", 0.5), ("a", 0.5), ("c", 0.9)];
        items.sort_by(|x, y| by_score_then_title(x.1, x.0, y.1, y.0));
        assert_eq!(items, vec![("c", 0.9), ("a", 0.5), ("b", 0.5)]);
    }
}
