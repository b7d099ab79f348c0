//! Multi-horizon compound annual growth rates over a statement line item.

use crate::core::company::FinancialSeries;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Horizon {
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::OneYear,
        Horizon::ThreeYears,
        Horizon::FiveYears,
        Horizon::TenYears,
    ];

    pub fn years(&self) -> u32 {
        match self {
            Horizon::OneYear => 1,
            Horizon::ThreeYears => 3,
            Horizon::FiveYears => 5,
            Horizon::TenYears => 10,
        }
    }
}

impl Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Y", self.years())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeClass {
    Positive,
    Negative,
}

/// Computed CAGRs keyed by horizon, kept in horizon order. Horizons whose
/// rate is undefined are simply absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrowthBadges {
    entries: Vec<(Horizon, f64)>,
}

impl GrowthBadges {
    pub fn get(&self, horizon: Horizon) -> Option<f64> {
        self.entries
            .iter()
            .find(|(h, _)| *h == horizon)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Horizon, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `(end / start)^(1 / years) - 1`, defined only for a positive start and a
/// non-zero period.
///
/// A zero end value is a total loss. A negative end value only has a real
/// root for a one-year period, where the rate is the ratio itself.
pub fn calculate_cagr(start: f64, end: f64, years: u32) -> Option<f64> {
    if start.is_nan() || end.is_nan() || start <= 0.0 || years == 0 {
        return None;
    }
    if end == 0.0 {
        return Some(-1.0);
    }
    if end < 0.0 {
        return (years == 1).then(|| end / start - 1.0);
    }

    let begin_bal = Decimal::from_f64(start)?;
    let end_bal = Decimal::from_f64(end)?;
    let rate = cagr(begin_bal, end_bal, Decimal::from(years)).to_f64()?;
    rate.is_finite().then_some(rate)
}

/// Growth badges for the most recent value of `series` against the value
/// `h` periods earlier, for every horizon `h`.
///
/// When the series is shorter than `h + 1` points the oldest point stands in
/// as the start, while the exponent still uses `h`.
pub fn compute_growth_badges(series: &FinancialSeries) -> GrowthBadges {
    let values = series.valid_values();
    let n = values.len();
    if n < 2 {
        return GrowthBadges::default();
    }
    let current = values[n - 1];

    let entries = Horizon::ALL
        .iter()
        .filter_map(|horizon| {
            let years = horizon.years();
            let lookback = (years as usize + 1).min(n);
            let start = values[n - lookback];
            let cagr = calculate_cagr(start, current, years);
            if cagr.is_none() {
                debug!("No {} CAGR for start {} and end {}", horizon, start, current);
            }
            cagr.map(|rate| (*horizon, rate))
        })
        .collect();

    GrowthBadges { entries }
}

pub fn classify_badge(cagr: f64) -> BadgeClass {
    if cagr >= 0.0 {
        BadgeClass::Positive
    } else {
        BadgeClass::Negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn annual(values: &[Option<f64>]) -> FinancialSeries {
        FinancialSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    (
                        NaiveDate::from_ymd_opt(2014 + i as i32, 12, 31).unwrap(),
                        *v,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn doubling_series_has_100_percent_one_year_growth() {
        let badges = compute_growth_badges(&annual(&[Some(50.0), Some(100.0), Some(200.0)]));
        assert!((badges.get(Horizon::OneYear).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_valid_point_yields_no_badges() {
        assert!(compute_growth_badges(&annual(&[Some(100.0)])).is_empty());
        assert!(compute_growth_badges(&annual(&[None, Some(100.0), None])).is_empty());
        assert!(compute_growth_badges(&annual(&[])).is_empty());
    }

    #[test]
    fn revenue_scenario() {
        let badges = compute_growth_badges(&annual(&[
            Some(100.0),
            Some(150.0),
            Some(200.0),
            Some(300.0),
        ]));

        assert!((badges.get(Horizon::OneYear).unwrap() - 0.5).abs() < 1e-9);
        assert!((badges.get(Horizon::ThreeYears).unwrap() - 0.44225).abs() < 1e-4);
        // Short series: the oldest point is the start for 5Y and 10Y as well.
        let five = 3f64.powf(1.0 / 5.0) - 1.0;
        let ten = 3f64.powf(1.0 / 10.0) - 1.0;
        assert!((badges.get(Horizon::FiveYears).unwrap() - five).abs() < 1e-12);
        assert!((badges.get(Horizon::TenYears).unwrap() - ten).abs() < 1e-12);
    }

    #[test]
    fn badges_iterate_in_horizon_order() {
        let badges = compute_growth_badges(&annual(&[Some(1.0); 12]));
        let order: Vec<String> = badges.iter().map(|(h, _)| h.to_string()).collect();
        assert_eq!(order, vec!["1Y", "3Y", "5Y", "10Y"]);
        assert!(badges.iter().all(|(_, v)| v.abs() < 1e-12));
    }

    #[test]
    fn long_series_uses_exact_lookback() {
        let values: Vec<Option<f64>> = (0..11).map(|i| Some(100.0 * 1.1f64.powi(i))).collect();
        let badges = compute_growth_badges(&annual(&values));
        for horizon in Horizon::ALL {
            assert!(
                (badges.get(horizon).unwrap() - 0.1).abs() < 1e-9,
                "{horizon} was {:?}",
                badges.get(horizon)
            );
        }
    }

    #[test]
    fn missing_values_are_dropped_before_lookback() {
        let badges = compute_growth_badges(&annual(&[Some(100.0), None, Some(200.0)]));
        assert!((badges.get(Horizon::OneYear).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_start_omits_horizon() {
        // 1Y compares 150 -> 300; longer horizons fall back to the zero start.
        let badges = compute_growth_badges(&annual(&[Some(0.0), Some(150.0), Some(300.0)]));
        assert!(badges.get(Horizon::OneYear).is_some());
        assert!(badges.get(Horizon::ThreeYears).is_none());
        assert!(badges.get(Horizon::TenYears).is_none());

        let negative = compute_growth_badges(&annual(&[Some(-5.0), Some(10.0)]));
        assert!(negative.is_empty());
    }

    #[test]
    fn negative_current_value_with_fractional_power_is_omitted() {
        let badges = compute_growth_badges(&annual(&[Some(100.0), Some(50.0), Some(-20.0)]));
        // One-year exponent is 1, so the ratio passes through unchanged.
        assert!((badges.get(Horizon::OneYear).unwrap() - (-1.4)).abs() < 1e-12);
        assert!(badges.get(Horizon::ThreeYears).is_none());
    }

    #[test]
    fn computing_twice_gives_identical_results() {
        let series = annual(&[Some(3.0), Some(4.5), None, Some(7.25), Some(9.0)]);
        assert_eq!(compute_growth_badges(&series), compute_growth_badges(&series));
    }

    #[test]
    fn cagr_helper() {
        assert_eq!(calculate_cagr(100.0, 200.0, 0), None);
        assert_eq!(calculate_cagr(0.0, 200.0, 1), None);
        assert_eq!(calculate_cagr(100.0, 0.0, 3), Some(-1.0));
        assert_eq!(calculate_cagr(f64::NAN, 1.0, 1), None);
    }

    #[test]
    fn cagr_matches_closed_form() {
        for (start, end, years) in [
            (200.0_f64, 300.0_f64, 1),
            (100.0, 300.0, 3),
            (100.0, 300.0, 5),
            (100.0, 300.0, 10),
            (50.0, 100.0, 1),
            (1000.0, 500.0, 5),
        ] {
            let expected = (end / start).powf(1.0 / f64::from(years)) - 1.0;
            let rate = calculate_cagr(start, end, years).unwrap();
            assert!(
                (rate - expected).abs() < 1e-12,
                "({start}, {end}, {years}) gave {rate}, expected {expected}"
            );
        }
    }

    #[test]
    fn negative_end_value_outside_one_year_is_undefined() {
        assert!((calculate_cagr(50.0, -20.0, 1).unwrap() - (-1.4)).abs() < 1e-12);
        assert_eq!(calculate_cagr(50.0, -20.0, 3), None);
        assert_eq!(calculate_cagr(50.0, -20.0, 10), None);
    }

    #[test]
    fn classify_zero_as_positive() {
        assert_eq!(classify_badge(0.0), BadgeClass::Positive);
        assert_eq!(classify_badge(0.12), BadgeClass::Positive);
        assert_eq!(classify_badge(-0.0001), BadgeClass::Negative);
    }
}
