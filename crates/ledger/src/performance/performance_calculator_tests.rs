#[cfg(test)]
mod tests {
    use crate::errors::{Error, PerformanceError};
    use crate::performance::{
        calculate_sharpe, calculate_twr, calculate_xirr, PerformanceSettings, ValuationPoint,
    };
    use crate::transactions::{CashFlow, FlowDirection};
    use crate::utils::CancelToken;
    use chrono::NaiveDate;
    use num_traits::ToPrimitive;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(d: NaiveDate, value: Decimal) -> ValuationPoint {
        ValuationPoint {
            date: d,
            total_value: value,
        }
    }

    fn flow(d: NaiveDate, amount: Decimal, direction: FlowDirection) -> CashFlow {
        CashFlow {
            portfolio_id: "P1".to_string(),
            date: d,
            amount,
            direction,
        }
    }

    #[test]
    fn twr_isolates_deposit_timing() {
        // 1000 grows to 1100, then a 1000 deposit lands, then the 2100
        // grows to 2310. Both sub-periods return 10%.
        let series = vec![
            point(date(2024, 1, 1), dec!(1000)),
            point(date(2024, 2, 1), dec!(2100)),
            point(date(2024, 3, 1), dec!(2310)),
        ];
        let flows = vec![flow(date(2024, 2, 1), dec!(1000), FlowDirection::In)];

        let result = calculate_twr(&series, &flows, &CancelToken::new()).unwrap();
        assert_eq!(result.sub_period_returns, vec![dec!(0.1), dec!(0.1)]);
        assert_eq!(result.twr, dec!(0.21));
    }

    #[test]
    fn twr_with_single_point_is_zero() {
        let series = vec![point(date(2024, 1, 1), dec!(1000))];
        let result = calculate_twr(&series, &[], &CancelToken::new()).unwrap();
        assert_eq!(result.twr, Decimal::ZERO);
        assert!(result.sub_period_returns.is_empty());
    }

    #[test]
    fn twr_and_xirr_match_simple_holding_period_return() {
        // Single buy, single terminal value, exactly one year apart:
        // TWR == XIRR == 10% within 1e-6.
        let series = vec![
            point(date(2023, 1, 1), dec!(1000)),
            point(date(2024, 1, 1), dec!(1100)),
        ];
        let twr = calculate_twr(&series, &[], &CancelToken::new())
            .unwrap()
            .twr;

        let xirr = calculate_xirr(
            &[
                (date(2023, 1, 1), dec!(-1000)),
                (date(2024, 1, 1), dec!(1100)),
            ],
            &CancelToken::new(),
        )
        .unwrap();

        let tolerance = dec!(0.000001);
        assert!((twr - dec!(0.1)).abs() <= tolerance);
        assert!((xirr - dec!(0.1)).abs() <= tolerance);
        assert!((twr - xirr).abs() <= tolerance);
    }

    #[test]
    fn xirr_solution_zeroes_the_npv() {
        let flows = vec![
            (date(2024, 1, 1), dec!(-1000)),
            (date(2024, 7, 1), dec!(500)),
            (date(2025, 1, 1), dec!(600)),
        ];
        let rate = calculate_xirr(&flows, &CancelToken::new())
            .unwrap()
            .to_f64()
            .unwrap();

        let t0 = date(2024, 1, 1);
        let npv: f64 = flows
            .iter()
            .map(|(d, a)| {
                let t = (*d - t0).num_days() as f64 / 365.0;
                a.to_f64().unwrap() / (1.0 + rate).powf(t)
            })
            .sum();
        assert!(npv.abs() < 1e-4, "npv at solution was {}", npv);
    }

    #[test]
    fn xirr_without_sign_change_does_not_fabricate_a_rate() {
        let err = calculate_xirr(
            &[
                (date(2024, 1, 1), dec!(100)),
                (date(2024, 6, 1), dec!(200)),
            ],
            &CancelToken::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Performance(PerformanceError::XirrDidNotConverge { .. })
        ));
    }

    #[test]
    fn xirr_respects_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let err = calculate_xirr(
            &[
                (date(2024, 1, 1), dec!(-1000)),
                (date(2025, 1, 1), dec!(1100)),
            ],
            &token,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn sharpe_needs_at_least_two_periods() {
        let settings = PerformanceSettings::default();
        assert_eq!(calculate_sharpe(&[dec!(0.1)], &settings), None);
        assert_eq!(calculate_sharpe(&[], &settings), None);
    }

    #[test]
    fn sharpe_is_none_for_constant_returns() {
        let settings = PerformanceSettings::default();
        assert_eq!(
            calculate_sharpe(&[dec!(0.1), dec!(0.1), dec!(0.1)], &settings),
            None
        );
    }

    #[test]
    fn sharpe_annualizes_by_sqrt_periods() {
        let settings = PerformanceSettings {
            risk_free_rate: Decimal::ZERO,
            periods_per_year: 4,
        };
        // mean 0.05, sample stdev sqrt(0.005) -> sharpe = sqrt(2) after
        // annualizing by sqrt(4).
        let sharpe = calculate_sharpe(&[dec!(0.0), dec!(0.1)], &settings).unwrap();
        assert!((sharpe - dec!(1.414214)).abs() <= dec!(0.000001));
    }
}
