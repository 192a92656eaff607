//! Property tests for the price parser
//!
//! For every supported currency, formatting an amount and parsing it back
//! must return the same `(amount, currency)` pair.

use proptest::prelude::*;

use shopscrape::normalize::{format_price, parse_price};

const CURRENCIES: &[&str] = &["INR", "USD", "EUR", "GBP", "CAD", "AUD"];

proptest! {
    #[test]
    fn format_then_parse_round_trips(
        cents in 0u64..100_000_000u64,
        currency_idx in 0usize..CURRENCIES.len(),
    ) {
        let amount = cents as f64 / 100.0;
        let currency = CURRENCIES[currency_idx];

        let rendered = format_price(amount, currency);
        let (parsed_amount, parsed_currency) = parse_price(Some(&rendered));

        prop_assert_eq!(parsed_currency, Some(currency));
        let parsed = parsed_amount.expect("formatted price must parse back");
        prop_assert!(
            (parsed - amount).abs() < 1e-6,
            "{} -> {} -> {}", amount, rendered, parsed
        );
    }

    #[test]
    fn parser_never_panics_on_arbitrary_text(input in ".{0,120}") {
        let _ = parse_price(Some(&input));
    }

    #[test]
    fn parsed_amounts_are_non_negative(input in ".{0,120}") {
        if let (Some(amount), _) = parse_price(Some(&input)) {
            prop_assert!(amount >= 0.0);
        }
    }
}
