#[cfg(test)]
mod tests {
    use crate::errors::{CalculatorError, Error};
    use crate::fx::{CurrencyConverter, FxRate};
    use crate::lots::FifoMatcher;
    use crate::transactions::{Transaction, TransactionType};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(
        id: &str,
        kind: TransactionType,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        trade_date: NaiveDate,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "ACC1".to_string(),
            instrument_id: Some("SBER".to_string()),
            kind,
            quantity,
            price,
            currency: "RUB".to_string(),
            trade_date,
            settlement_date: trade_date,
            fee,
            external_ref: None,
        }
    }

    fn rub_matcher() -> (CurrencyConverter, &'static str) {
        (CurrencyConverter::new(vec![]), "RUB")
    }

    #[test]
    fn buy_then_sell_realizes_expected_event() {
        // 10 @ 100 RUB (fee 5) bought 2024-01-01, 10 @ 150 RUB (fee 5)
        // sold 2024-06-01.
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let outcome = matcher
            .match_transactions(&[
                tx("t1", TransactionType::Buy, dec!(10), dec!(100), dec!(5), date(2024, 1, 1)),
                tx("t2", TransactionType::Sell, dec!(-10), dec!(150), dec!(5), date(2024, 6, 1)),
            ])
            .unwrap();

        assert_eq!(outcome.realized.len(), 1);
        let event = &outcome.realized[0];
        assert_eq!(event.quantity, dec!(10));
        assert_eq!(event.proceeds, dec!(1495));
        assert_eq!(event.cost_basis, dec!(1005));
        assert_eq!(event.realized_pnl, dec!(490));
        assert_eq!(event.holding_period_days, 152);

        // The consumed lot is retained for audit but no longer open.
        assert_eq!(outcome.lots.len(), 1);
        assert!(!outcome.lots[0].is_open());
        assert_eq!(outcome.open_lots().count(), 0);
    }

    #[test]
    fn sell_consumes_oldest_lots_first() {
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let outcome = matcher
            .match_transactions(&[
                tx("t1", TransactionType::Buy, dec!(10), dec!(100), dec!(0), date(2024, 1, 1)),
                tx("t2", TransactionType::Buy, dec!(10), dec!(200), dec!(0), date(2024, 2, 1)),
                tx("t3", TransactionType::Sell, dec!(-15), dec!(300), dec!(0), date(2024, 3, 1)),
            ])
            .unwrap();

        // 10 units from the 100-cost lot plus 5 from the 200-cost lot.
        let event = &outcome.realized[0];
        assert_eq!(event.cost_basis, dec!(2000));
        assert_eq!(event.realized_pnl, dec!(4500) - dec!(2000));

        let open: Vec<_> = outcome.open_lots().collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].quantity_remaining, dec!(5));
        assert_eq!(open[0].unit_cost, dec!(200));
        // Holding period measured from the youngest consumed lot.
        assert_eq!(event.holding_period_days, (date(2024, 3, 1) - date(2024, 2, 1)).num_days());
    }

    #[test]
    fn overselling_fails_with_shortfall_context() {
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let err = matcher
            .match_transactions(&[
                tx("t1", TransactionType::Buy, dec!(10), dec!(100), dec!(0), date(2024, 1, 1)),
                tx("t2", TransactionType::Sell, dec!(-12), dec!(100), dec!(0), date(2024, 2, 1)),
            ])
            .unwrap_err();

        match err {
            Error::Calculation(CalculatorError::InsufficientLots {
                account_id,
                instrument_id,
                date: d,
                shortfall,
            }) => {
                assert_eq!(account_id, "ACC1");
                assert_eq!(instrument_id, "SBER");
                assert_eq!(d, date(2024, 2, 1));
                assert_eq!(shortfall, dec!(2));
            }
            other => panic!("Expected InsufficientLots, got {:?}", other),
        }
    }

    #[test]
    fn split_rescales_open_lots_without_realizing() {
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let outcome = matcher
            .match_transactions(&[
                tx("t1", TransactionType::Buy, dec!(10), dec!(100), dec!(0), date(2024, 1, 1)),
                tx("t2", TransactionType::Split, dec!(2), Decimal::ZERO, dec!(0), date(2024, 2, 1)),
            ])
            .unwrap();

        assert!(outcome.realized.is_empty());
        let open: Vec<_> = outcome.open_lots().collect();
        assert_eq!(open[0].quantity_remaining, dec!(20));
        assert_eq!(open[0].unit_cost, dec!(50));
        // Cost basis is unchanged by the split.
        assert_eq!(open[0].cost_basis_remaining(), dec!(1000));
    }

    #[test]
    fn acquisition_cost_converts_at_trade_date() {
        let converter = CurrencyConverter::new(vec![
            FxRate::new("USD", "RUB", date(2024, 1, 1), dec!(90)),
            FxRate::new("USD", "RUB", date(2024, 6, 1), dec!(100)),
        ]);
        let matcher = FifoMatcher::new(&converter, "RUB");

        let mut buy = tx("t1", TransactionType::Buy, dec!(2), dec!(10), dec!(1), date(2024, 1, 1));
        buy.currency = "USD".to_string();
        let mut sell =
            tx("t2", TransactionType::Sell, dec!(-2), dec!(15), dec!(0), date(2024, 6, 1));
        sell.currency = "USD".to_string();

        let outcome = matcher.match_transactions(&[buy, sell]).unwrap();
        let event = &outcome.realized[0];
        // Cost: (2*10 + 1) USD at 90 = 1890 RUB; proceeds: 30 USD at 100.
        assert_eq!(event.cost_basis, dec!(1890));
        assert_eq!(event.proceeds, dec!(3000));
        assert_eq!(event.realized_pnl, dec!(1110));
    }

    #[test]
    fn replay_is_deterministic_regardless_of_input_order() {
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let txs = vec![
            tx("t1", TransactionType::Buy, dec!(10), dec!(100), dec!(1), date(2024, 1, 1)),
            tx("t2", TransactionType::Buy, dec!(5), dec!(110), dec!(1), date(2024, 1, 1)),
            tx("t3", TransactionType::Sell, dec!(-12), dec!(120), dec!(1), date(2024, 2, 1)),
        ];
        let mut shuffled = txs.clone();
        shuffled.reverse();

        let a = matcher.match_transactions(&txs).unwrap();
        let b = matcher.match_transactions(&shuffled).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn in_kind_deposit_and_withdrawal_move_lots() {
        let (converter, base) = rub_matcher();
        let matcher = FifoMatcher::new(&converter, base);

        let outcome = matcher
            .match_transactions(&[
                tx("t1", TransactionType::Deposit, dec!(10), dec!(100), dec!(0), date(2024, 1, 1)),
                tx(
                    "t2",
                    TransactionType::Withdrawal,
                    dec!(-4),
                    dec!(100),
                    dec!(0),
                    date(2024, 2, 1),
                ),
            ])
            .unwrap();

        assert_eq!(outcome.realized.len(), 1);
        let open: Vec<_> = outcome.open_lots().collect();
        assert_eq!(open[0].quantity_remaining, dec!(6));
    }

    // Property: after replaying any sequence of buys, capped sells and
    // splits, the open quantity matches the split-adjusted replay, every
    // disposal is accounted for, and no lot ever goes negative.
    proptest! {
        #[test]
        fn fifo_conserves_quantity(ops in proptest::collection::vec((0u8..3, 1u32..50), 1..40)) {
            let (converter, base) = rub_matcher();
            let matcher = FifoMatcher::new(&converter, base);

            let mut txs = Vec::new();
            let mut held = Decimal::ZERO;
            let mut day = date(2024, 1, 1);
            for (i, (op, raw_qty)) in ops.iter().enumerate() {
                let qty = Decimal::from(*raw_qty);
                day += chrono::Duration::days(1);
                match op {
                    0 => {
                        txs.push(tx(
                            &format!("t{}", i),
                            TransactionType::Buy,
                            qty,
                            dec!(100),
                            dec!(1),
                            day,
                        ));
                        held += qty;
                    }
                    1 => {
                        // Cap sells at the held quantity to stay long-only.
                        let sell_qty = qty.min(held);
                        if sell_qty.is_zero() {
                            continue;
                        }
                        txs.push(tx(
                            &format!("t{}", i),
                            TransactionType::Sell,
                            -sell_qty,
                            dec!(120),
                            dec!(1),
                            day,
                        ));
                        held -= sell_qty;
                    }
                    _ => {
                        // 2:1 through 4:1 splits.
                        let ratio = Decimal::from(raw_qty % 3 + 2);
                        txs.push(tx(
                            &format!("t{}", i),
                            TransactionType::Split,
                            ratio,
                            Decimal::ZERO,
                            dec!(0),
                            day,
                        ));
                        held *= ratio;
                    }
                }
            }

            let outcome = matcher.match_transactions(&txs).unwrap();

            let open_quantity: Decimal = outcome.open_lots().map(|l| l.quantity_remaining).sum();
            let realized_quantity: Decimal =
                outcome.realized.iter().map(|e| e.quantity).sum();
            let total_sold: Decimal = txs
                .iter()
                .filter(|t| t.kind == TransactionType::Sell)
                .map(|t| -t.quantity)
                .sum();

            // Conservation: open quantity matches the split-adjusted
            // replay, and every disposal produced a realized event for
            // exactly its quantity.
            prop_assert_eq!(open_quantity, held);
            prop_assert_eq!(realized_quantity, total_sold);
            prop_assert!(outcome.lots.iter().all(|l| !l.quantity_remaining.is_sign_negative()));
        }
    }
}
