use proptest::prelude::*;

/// Textual growth functions that stay positive for large `n`.
pub fn arb_growth() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (1i64..10).prop_map(|k| k.to_string()),
        Just("n".to_string()),
        Just("log(n)".to_string()),
        Just("sqrt(n)".to_string()),
        (2i64..4).prop_map(|k| format!("n^{}", k)),
        Just("2^n".to_string()),
    ];

    leaf.prop_recursive(
        3,  // levels deep
        24, // max size
        2,  // items per collection
        |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({} + {})", l, r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({})*({})", l, r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({})/({})", l, r)),
                inner.clone().prop_map(|e| format!("log({} + 1)", e)),
            ]
        },
    )
}
