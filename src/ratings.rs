//! Community rating aggregation and ranking.
//!
//! Aggregates live in the `preprints_with_ratings` view and are recomputed
//! on every read; this module holds the score bounds, the same dampening
//! formula for in-process sorting, and the sort-mode vocabularies.

use std::cmp::Ordering;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

// Dampening prior: pseudo ratings pulling the average toward the midpoint.
// Must match the `preprints_with_ratings` view.
const PRIOR_MEAN: f64 = 3.0;
const PRIOR_WEIGHT: f64 = 3.0;

pub fn score_in_range(score: i16) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// Ranking statistic: the raw average pulled toward the prior. Unrated
/// submissions score zero so they sink below anything the community has
/// touched. At equal averages, more ratings never rank lower.
pub fn weighted_score(sum: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum as f64 + PRIOR_WEIGHT * PRIOR_MEAN) / (count as f64 + PRIOR_WEIGHT)
}

/// Sort modes on the public preprint pool. Unknown input falls back to
/// newest, as the portal does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprintSort {
    Newest,
    HighestRated,
    MostRated,
}

impl PreprintSort {
    pub fn parse(s: &str) -> PreprintSort {
        match s {
            "highest_rated" => PreprintSort::HighestRated,
            "most_rated" => PreprintSort::MostRated,
            _ => PreprintSort::Newest,
        }
    }
}

/// Sort modes on the screening queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreeningSort {
    Newest,
    Oldest,
    HighestRated,
    MostRated,
}

impl ScreeningSort {
    pub fn parse(s: &str) -> ScreeningSort {
        match s {
            "oldest" => ScreeningSort::Oldest,
            "highest_rated" => ScreeningSort::HighestRated,
            "most_rated" => ScreeningSort::MostRated,
            _ => ScreeningSort::Newest,
        }
    }
}

/// Descending order by weighted score, ties broken by rating count.
/// Arguments are (weighted_score, rating_count) pairs.
pub fn cmp_highest_rated(a: (f64, i64), b: (f64, i64)) -> Ordering {
    b.0.total_cmp(&a.0).then(b.1.cmp(&a.1))
}

/// Descending order by rating count, ties broken by weighted score.
pub fn cmp_most_rated(a: (f64, i64), b: (f64, i64)) -> Ordering {
    b.1.cmp(&a.1).then(b.0.total_cmp(&a.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() {
        assert!(!score_in_range(0));
        assert!(score_in_range(1));
        assert!(score_in_range(5));
        assert!(!score_in_range(6));
        assert!(!score_in_range(-3));
    }

    #[test]
    fn four_mixed_ratings_outrank_a_single_five() {
        // [5, 5, 5, 1] vs [5]: same or lower raw average, but the dampening
        // rewards the larger sample.
        let four = weighted_score(16, 4);
        let one = weighted_score(5, 1);
        assert!(four > one, "{four} vs {one}");
        assert!((four - 25.0 / 7.0).abs() < 1e-9);
        assert!((one - 3.5).abs() < 1e-9);
    }

    #[test]
    fn more_ratings_at_equal_average_never_rank_lower() {
        let mut prev = 0.0;
        for count in 1..=50i64 {
            let w = weighted_score(4 * count, count);
            assert!(w >= prev, "count {count}: {w} < {prev}");
            prev = w;
        }
    }

    #[test]
    fn unrated_sinks_to_zero() {
        assert_eq!(weighted_score(0, 0), 0.0);
        assert!(weighted_score(1, 1) > 0.0);
    }

    #[test]
    fn highest_rated_orders_by_weight_then_count() {
        let four = (weighted_score(16, 4), 4);
        let one = (weighted_score(5, 1), 1);
        assert_eq!(cmp_highest_rated(four, one), Ordering::Less);
        // Equal weight: the better-sampled entry first.
        assert_eq!(cmp_highest_rated((3.5, 7), (3.5, 2)), Ordering::Less);
    }

    #[test]
    fn most_rated_orders_by_count_regardless_of_average() {
        // Count 4 beats count 1 even though the singleton has the perfect
        // average.
        let four = (weighted_score(16, 4), 4);
        let one = (weighted_score(5, 1), 1);
        assert_eq!(cmp_most_rated(four, one), Ordering::Less);
        assert_eq!(cmp_most_rated(one, four), Ordering::Greater);
        // Ties fall back to weighted score.
        assert_eq!(cmp_most_rated((4.0, 3), (3.0, 3)), Ordering::Less);
    }

    #[test]
    fn sort_modes_fall_back_to_newest() {
        assert_eq!(PreprintSort::parse("highest_rated"), PreprintSort::HighestRated);
        assert_eq!(PreprintSort::parse("most_rated"), PreprintSort::MostRated);
        assert_eq!(PreprintSort::parse("bogus"), PreprintSort::Newest);
        assert_eq!(ScreeningSort::parse("oldest"), ScreeningSort::Oldest);
        assert_eq!(ScreeningSort::parse(""), ScreeningSort::Newest);
    }
}
