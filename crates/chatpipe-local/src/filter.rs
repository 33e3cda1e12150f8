//! Result filtering: keep only results close enough to the best one.
//!
//! Invariants (also property-tested):
//! - never returns a non-empty set when the best score is negative
//! - never returns an empty set when the input was non-empty and the best
//!   score was ≥ 0

use chatpipe_core::ScoredResult;
use tracing::debug;

/// Margin below the best score that still survives filtering. The most
/// permissive observed tuning; callers may tighten it.
pub const DEFAULT_SCORE_MARGIN: i32 = 3;

/// Sort descending (stable: ties keep provider order), then apply a dynamic
/// threshold of `max(best − margin, 0)`. A negative best score means no
/// result is trustworthy enough: return empty. If thresholding would empty a
/// set whose best is ≥ 0, keep exactly the best result.
pub fn filter_results(mut scored: Vec<ScoredResult>, margin: i32) -> Vec<ScoredResult> {
    if scored.is_empty() {
        return scored;
    }
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    let best = scored[0].score;
    if best < 0 {
        debug!(candidates = scored.len(), best, "all results below zero, dropping the lot");
        return Vec::new();
    }

    let threshold = (best - margin).max(0);
    let kept: Vec<ScoredResult> = scored
        .iter()
        .filter(|r| r.score >= threshold)
        .cloned()
        .collect();

    debug!(
        candidates = scored.len(),
        kept = kept.len(),
        best,
        threshold,
        "filtered search results"
    );

    if kept.is_empty() {
        // Fail-safe: never discard the only plausible candidate.
        return vec![scored.remove(0)];
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpipe_core::SearchResult;
    use proptest::prelude::*;

    fn scored(pairs: &[(&str, i32)]) -> Vec<ScoredResult> {
        pairs
            .iter()
            .map(|(url, score)| ScoredResult {
                result: SearchResult {
                    url: url.to_string(),
                    title: None,
                    snippet: None,
                    source: "test".to_string(),
                },
                score: *score,
            })
            .collect()
    }

    #[test]
    fn negative_best_score_yields_empty() {
        let out = filter_results(scored(&[("a", -2), ("b", -7)]), DEFAULT_SCORE_MARGIN);
        assert!(out.is_empty());
    }

    #[test]
    fn keeps_results_within_the_margin_of_the_best() {
        let out = filter_results(
            scored(&[("a", 10), ("b", 8), ("c", 6), ("d", 1)]),
            DEFAULT_SCORE_MARGIN,
        );
        let urls: Vec<&str> = out.iter().map(|r| r.result.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
        // threshold = 10 - 3 = 7, so c (6) and d (1) are dropped.
    }

    #[test]
    fn threshold_is_clamped_at_zero() {
        // best = 1, margin = 3 → threshold 0, not -2: a weakly-negative
        // straggler must not ride along.
        let out = filter_results(scored(&[("a", 1), ("b", -1)]), DEFAULT_SCORE_MARGIN);
        let urls: Vec<&str> = out.iter().map(|r| r.result.url.as_str()).collect();
        assert_eq!(urls, vec!["a"]);
    }

    #[test]
    fn ties_keep_provider_order() {
        let out = filter_results(scored(&[("first", 5), ("second", 5)]), DEFAULT_SCORE_MARGIN);
        let urls: Vec<&str> = out.iter().map(|r| r.result.url.as_str()).collect();
        assert_eq!(urls, vec!["first", "second"]);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(filter_results(Vec::new(), DEFAULT_SCORE_MARGIN).is_empty());
    }

    proptest! {
        #[test]
        fn filter_invariants_hold_for_arbitrary_scores(
            scores in prop::collection::vec(-50i32..50, 0..20),
            margin in 0i32..10,
        ) {
            let input: Vec<ScoredResult> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| ScoredResult {
                    result: SearchResult {
                        url: format!("https://example.com/{i}"),
                        title: None,
                        snippet: None,
                        source: "prop".to_string(),
                    },
                    score: *s,
                })
                .collect();
            let best = scores.iter().max().copied();
            let out = filter_results(input, margin);

            match best {
                None => prop_assert!(out.is_empty()),
                Some(b) if b < 0 => prop_assert!(out.is_empty()),
                Some(_) => {
                    prop_assert!(!out.is_empty(), "non-empty input with best >= 0 must keep something");
                    prop_assert!(out.iter().all(|r| r.score >= 0));
                    // Sorted descending.
                    prop_assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
                }
            }
        }
    }
}
