//! Final ordering of scored strategies.

use std::cmp::Ordering;

use super::composite::ScoredStrategy;

/// Composite score descending, then name ascending.
pub fn compare(a: &ScoredStrategy, b: &ScoredStrategy) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.name().cmp(b.name()))
}

/// Sort and assign 1-based ranks.
pub fn rank(mut scored: Vec<ScoredStrategy>) -> Vec<ScoredStrategy> {
    scored.sort_by(compare);
    for (i, s) in scored.iter_mut().enumerate() {
        s.rank = i + 1;
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::data::Side;
    use crate::scoring::composite::tests::evaluated;
    use crate::scoring::CompositeScorer;
    use crate::strategy::StrategyKind;

    #[test]
    fn test_rank_by_score_descending() {
        let scored = CompositeScorer::new(&ScoringConfig::default()).score(vec![
            evaluated(StrategyKind::LongCall, Side::Buy, 10.0),
            evaluated(StrategyKind::LongPut, Side::Buy, 30.0),
            evaluated(StrategyKind::LongStraddle, Side::Buy, 20.0),
        ]);
        let ranked = rank(scored);
        let names: Vec<_> = ranked.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["long_put", "long_straddle", "long_call"]);
        assert_eq!(ranked.iter().map(|s| s.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_broken_by_name() {
        let scored = CompositeScorer::new(&ScoringConfig::default()).score(vec![
            evaluated(StrategyKind::LongStraddle, Side::Buy, 10.0),
            evaluated(StrategyKind::Calendar, Side::Buy, 10.0),
            evaluated(StrategyKind::LongCall, Side::Buy, 10.0),
        ]);
        let ranked = rank(scored);
        let names: Vec<_> = ranked.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["calendar", "long_call", "long_straddle"]);
    }
}
