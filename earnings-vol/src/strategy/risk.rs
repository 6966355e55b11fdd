//! Defined/undefined risk classification.
//!
//! Each short unit must be paired with a long unit of the same option
//! type at an equal or more protective strike (call: long strike >= short,
//! put: long strike <= short). Longs at any expiry qualify, so a calendar's
//! back-month long covers its front-month short. Matching is greedy per
//! option type: every short takes the nearest remaining protective long.

use serde::Serialize;

use crate::data::OptionType;

use super::leg::OptionLeg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Defined,
    Undefined,
}

/// One short unit matched to one long unit (indices into the leg list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub short_leg: usize,
    pub long_leg: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub class: RiskClass,
    pub coverage: Vec<Coverage>,
    /// Short legs with at least one unmatched unit.
    pub uncovered: Vec<usize>,
}

struct Unit {
    leg: usize,
    strike: f64,
}

fn units(legs: &[OptionLeg], option_type: OptionType, short: bool) -> Vec<Unit> {
    legs.iter()
        .enumerate()
        .filter(|(_, l)| l.option_type == option_type && l.is_short() == short)
        .flat_map(|(idx, l)| {
            (0..l.quantity).map(move |_| Unit {
                leg: idx,
                strike: l.strike_f64(),
            })
        })
        .collect()
}

fn is_protective(option_type: OptionType, short_strike: f64, long_strike: f64) -> bool {
    match option_type {
        OptionType::Call => long_strike >= short_strike,
        OptionType::Put => long_strike <= short_strike,
    }
}

pub fn classify(legs: &[OptionLeg]) -> RiskAssessment {
    let mut coverage = Vec::new();
    let mut uncovered = Vec::new();

    for option_type in [OptionType::Call, OptionType::Put] {
        let shorts = units(legs, option_type, true);
        let mut longs: Vec<Option<Unit>> =
            units(legs, option_type, false).into_iter().map(Some).collect();

        for short in shorts {
            let pick = longs
                .iter()
                .enumerate()
                .filter_map(|(i, u)| u.as_ref().map(|u| (i, u)))
                .filter(|(_, u)| is_protective(option_type, short.strike, u.strike))
                .min_by(|(_, a), (_, b)| {
                    (a.strike - short.strike)
                        .abs()
                        .total_cmp(&(b.strike - short.strike).abs())
                })
                .map(|(i, _)| i);

            match pick {
                Some(i) => {
                    if let Some(long) = longs[i].take() {
                        coverage.push(Coverage {
                            short_leg: short.leg,
                            long_leg: long.leg,
                        });
                    }
                }
                None => {
                    if !uncovered.contains(&short.leg) {
                        uncovered.push(short.leg);
                    }
                }
            }
        }
    }

    let class = if uncovered.is_empty() {
        RiskClass::Defined
    } else {
        RiskClass::Undefined
    };
    RiskAssessment {
        class,
        coverage,
        uncovered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Side;
    use crate::pricing::PriceGreeks;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn leg(t: OptionType, side: Side, strike: i64, day: u32, qty: u32) -> OptionLeg {
        OptionLeg {
            side,
            option_type: t,
            strike: Decimal::from(strike),
            expiry: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            quantity: qty,
            entry_price: 1.0,
            entry_iv: 0.5,
            bid: 0.95,
            ask: 1.05,
            spread: 0.10,
            entry_execution_price: 1.0,
            greeks: PriceGreeks::default(),
            model_price: 1.0,
        }
    }

    #[test]
    fn test_naked_short_call_is_undefined() {
        let r = classify(&[leg(OptionType::Call, Side::Sell, 100, 9, 1)]);
        assert_eq!(r.class, RiskClass::Undefined);
        assert_eq!(r.uncovered, vec![0]);
    }

    #[test]
    fn test_calendar_is_defined_across_expiries() {
        let r = classify(&[
            leg(OptionType::Call, Side::Sell, 100, 9, 1),
            leg(OptionType::Call, Side::Buy, 100, 16, 1),
        ]);
        assert_eq!(r.class, RiskClass::Defined);
        assert_eq!(r.coverage, vec![Coverage { short_leg: 0, long_leg: 1 }]);
    }

    #[test]
    fn test_iron_condor_is_defined() {
        let legs = [
            leg(OptionType::Call, Side::Sell, 110, 9, 1),
            leg(OptionType::Call, Side::Buy, 115, 9, 1),
            leg(OptionType::Put, Side::Sell, 90, 9, 1),
            leg(OptionType::Put, Side::Buy, 85, 9, 1),
        ];
        let r = classify(&legs);
        assert_eq!(r.class, RiskClass::Defined);
        assert_eq!(r.coverage.len(), 2);
    }

    #[test]
    fn test_put_does_not_cover_call() {
        let r = classify(&[
            leg(OptionType::Call, Side::Sell, 100, 9, 1),
            leg(OptionType::Put, Side::Buy, 100, 9, 1),
        ]);
        assert_eq!(r.class, RiskClass::Undefined);
    }

    #[test]
    fn test_quantity_must_be_matched() {
        let r = classify(&[
            leg(OptionType::Call, Side::Sell, 100, 9, 2),
            leg(OptionType::Call, Side::Buy, 105, 9, 1),
        ]);
        assert_eq!(r.class, RiskClass::Undefined);
    }

    #[test]
    fn test_vertical_spread_with_long_inside_is_undefined() {
        let call_spread = classify(&[
            leg(OptionType::Call, Side::Buy, 100, 9, 1),
            leg(OptionType::Call, Side::Sell, 110, 9, 1),
        ]);
        assert_eq!(call_spread.class, RiskClass::Undefined);
        assert_eq!(call_spread.uncovered, vec![1]);

        let put_spread = classify(&[
            leg(OptionType::Put, Side::Buy, 100, 9, 1),
            leg(OptionType::Put, Side::Sell, 90, 9, 1),
        ]);
        assert_eq!(put_spread.class, RiskClass::Undefined);
    }

    #[test]
    fn test_equal_strike_long_covers() {
        let r = classify(&[
            leg(OptionType::Put, Side::Sell, 95, 9, 1),
            leg(OptionType::Put, Side::Buy, 95, 9, 1),
        ]);
        assert_eq!(r.class, RiskClass::Defined);
    }

    #[test]
    fn test_protective_wing_matched_nearest() {
        // The 115 wing goes to the 110 short; the 100 long protects nothing.
        let legs = [
            leg(OptionType::Call, Side::Sell, 110, 9, 1),
            leg(OptionType::Call, Side::Sell, 105, 9, 1),
            leg(OptionType::Call, Side::Buy, 115, 9, 1),
            leg(OptionType::Call, Side::Buy, 100, 9, 1),
        ];
        let r = classify(&legs);
        assert_eq!(r.class, RiskClass::Undefined);
        assert_eq!(r.coverage, vec![Coverage { short_leg: 0, long_leg: 2 }]);
        assert_eq!(r.uncovered, vec![1]);

        let mut covered = legs.to_vec();
        covered[3] = leg(OptionType::Call, Side::Buy, 120, 9, 1);
        let r = classify(&covered);
        assert_eq!(r.class, RiskClass::Defined);
        assert!(r.coverage.contains(&Coverage { short_leg: 0, long_leg: 2 }));
        assert!(r.coverage.contains(&Coverage { short_leg: 1, long_leg: 3 }));
    }
}
