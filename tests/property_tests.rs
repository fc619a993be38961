use asymptote::{classify, classify_str, ClassifyError, RelationSymbol};
use proptest::prelude::*;

mod strategies;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_reflexive(f in strategies::arb_growth(), symbol in strategies::arb_symbol()) {
        prop_assert!(classify(&f, &f, symbol).unwrap());
    }

    #[test]
    fn test_theta_implies_big_o_and_omega(f in strategies::arb_growth(), g in strategies::arb_growth()) {
        let theta = classify(&f, &g, RelationSymbol::TightBound);
        prop_assume!(theta.is_ok());
        if theta.unwrap() {
            prop_assert!(classify(&f, &g, RelationSymbol::UpperBound).unwrap());
            prop_assert!(classify(&f, &g, RelationSymbol::LowerBound).unwrap());
        }
    }

    #[test]
    fn test_big_o_and_omega_are_converse(f in strategies::arb_growth(), g in strategies::arb_growth()) {
        let forward = classify(&f, &g, RelationSymbol::UpperBound);
        let backward = classify(&g, &f, RelationSymbol::LowerBound);
        prop_assume!(forward.is_ok() && backward.is_ok());
        prop_assert_eq!(forward.unwrap(), backward.unwrap());
    }

    #[test]
    fn test_log_spellings_agree(
        f in strategies::arb_growth(),
        g in strategies::arb_growth(),
        symbol in strategies::arb_symbol(),
    ) {
        let reference = classify(&f, &g, symbol);
        prop_assume!(reference.is_ok());
        let reference = reference.unwrap();
        prop_assert_eq!(classify(&f.replace("log", "ln"), &g, symbol).unwrap(), reference);
        prop_assert_eq!(classify(&f, &g.replace("log", "lg"), symbol).unwrap(), reference);
    }

    #[test]
    fn test_zero_against_anything(g in strategies::arb_growth()) {
        prop_assert!(classify("0", &g, RelationSymbol::UpperBound).unwrap());
        prop_assert!(!classify("0", &g, RelationSymbol::TightBound).unwrap());
        prop_assert!(classify(&g, "0", RelationSymbol::LowerBound).unwrap());
        prop_assert!(!classify(&g, "0", RelationSymbol::UpperBound).unwrap());
    }

    #[test]
    fn test_unknown_symbols_are_rejected(symbol in "\\PC{0,4}", f in strategies::arb_growth()) {
        prop_assume!(!matches!(symbol.as_str(), "O" | "Θ" | "Ω"));
        let is_invalid_symbol = matches!(classify_str(&f, &f, &symbol), Err(ClassifyError::InvalidSymbol(_)));
        prop_assert!(is_invalid_symbol);
    }
}
