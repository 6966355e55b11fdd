//! Realized earnings moves from price history.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::data::PriceBar;
use crate::error::{EngineError, EngineResult};

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(sorted[lo] + weight * (sorted[hi] - sorted[lo]))
}

/// Absolute close-to-close moves across each earnings date.
///
/// The event day is the first bar on or after the earnings date and the
/// reference is the bar before it. Dates with no bar on either side are
/// skipped. `history` must be sorted by date.
pub fn earnings_moves(history: &[PriceBar], earnings_dates: &[NaiveDate]) -> Vec<f64> {
    earnings_dates
        .iter()
        .filter_map(|date| {
            let idx = history.partition_point(|bar| bar.date < *date);
            if idx == 0 || idx >= history.len() {
                debug!(%date, "earnings date outside price history");
                return None;
            }
            let prev = history[idx - 1].close;
            let event = history[idx].close;
            (prev > 0.0).then(|| (event / prev - 1.0).abs())
        })
        .collect()
}

/// 75th percentile of absolute earnings moves.
pub fn earnings_move_p75(history: &[PriceBar], earnings_dates: &[NaiveDate]) -> EngineResult<f64> {
    if history.is_empty() {
        return Err(EngineError::data("no price history available"));
    }
    if earnings_dates.is_empty() {
        return Err(EngineError::data("no earnings dates available"));
    }
    let moves = earnings_moves(history, earnings_dates);
    if moves.len() < 2 {
        return Err(EngineError::data(format!(
            "insufficient earnings moves for P75: {}",
            moves.len()
        )));
    }
    let p75 = percentile(&moves, 75.0)
        .ok_or_else(|| EngineError::data("no earnings moves"))?;
    info!(samples = moves.len(), p75, "historical earnings move");
    Ok(p75)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_percentile_linear() {
        assert_relative_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 75.0).unwrap(), 3.25);
        assert_relative_eq!(percentile(&[5.0], 75.0).unwrap(), 5.0);
        assert!(percentile(&[], 75.0).is_none());
    }

    #[test]
    fn test_moves_use_next_trading_day() {
        let history = vec![
            PriceBar { date: d(3, 6), close: 100.0 },
            PriceBar { date: d(3, 7), close: 110.0 },
            PriceBar { date: d(3, 10), close: 99.0 },
        ];
        // Sat 3/8 maps to Mon 3/10 vs Fri 3/7
        let moves = earnings_moves(&history, &[d(3, 7), d(3, 8)]);
        assert_eq!(moves.len(), 2);
        assert_relative_eq!(moves[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(moves[1], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_p75_requires_two_moves() {
        let history = vec![
            PriceBar { date: d(3, 6), close: 100.0 },
            PriceBar { date: d(3, 7), close: 104.0 },
        ];
        assert!(earnings_move_p75(&history, &[d(3, 7)]).is_err());
        assert!(earnings_move_p75(&[], &[d(3, 7)]).is_err());
        assert!(earnings_move_p75(&history, &[]).is_err());
    }

    #[test]
    fn test_p75_value() {
        let history = vec![
            PriceBar { date: d(1, 2), close: 100.0 },
            PriceBar { date: d(1, 3), close: 102.0 },
            PriceBar { date: d(4, 1), close: 100.0 },
            PriceBar { date: d(4, 2), close: 96.0 },
            PriceBar { date: d(7, 1), close: 100.0 },
            PriceBar { date: d(7, 2), close: 108.0 },
        ];
        let p75 = earnings_move_p75(&history, &[d(1, 3), d(4, 2), d(7, 2)]).unwrap();
        // moves 0.02, 0.04, 0.08 -> rank 1.5 -> 0.06
        assert_relative_eq!(p75, 0.06, epsilon = 1e-12);
    }
}
