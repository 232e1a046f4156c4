use std::collections::BTreeMap;

use proptest::prelude::*;
use spread_analysis::compute_grid_divergence;
use spread_analysis::point::{pairwise_from_values, spread_of};
use spread_core::types::{Field, FieldSet, ModelFields, ModelId, Variable};

fn arb_model_values() -> impl Strategy<Value = BTreeMap<ModelId, f64>> {
    prop::sample::subsequence(ModelId::ALL.to_vec(), 0..=ModelId::ALL.len()).prop_flat_map(
        |models| {
            let n = models.len();
            prop::collection::vec(-1.0e4f64..1.0e4, n)
                .prop_map(move |values| models.iter().copied().zip(values).collect())
        },
    )
}

// ── Spread is non-negative and translation invariant ─────────────────────

proptest! {
    #[test]
    fn spread_translation_invariant(
        values in prop::collection::vec(-1.0e3f64..1.0e3, 0..8),
        shift in -1.0e3f64..1.0e3,
    ) {
        let base = spread_of(values.iter().copied());
        let shifted = spread_of(values.iter().map(|v| v + shift));
        prop_assert!(base >= 0.0);
        prop_assert!((base - shifted).abs() < 1e-6, "{} vs {}", base, shifted);
    }
}

// ── Pair count and rmse/bias relation ────────────────────────────────────

proptest! {
    #[test]
    fn pairwise_covers_every_pair(values in arb_model_values()) {
        let n = values.len();
        let pairs = pairwise_from_values(&values);
        prop_assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
        for p in &pairs {
            prop_assert!(p.model_a < p.model_b);
            prop_assert_eq!(p.rmse, p.bias.abs());
            prop_assert_eq!(p.bias, values[&p.model_a] - values[&p.model_b]);
        }
    }
}

// ── Identical models never diverge ───────────────────────────────────────

proptest! {
    #[test]
    fn identical_fields_have_zero_divergence(
        values in prop::collection::vec(-50.0f64..50.0, 16),
        copies in 2usize..5,
    ) {
        let field = Field::on_axes(
            vec![10.0, 11.0, 12.0, 13.0],
            vec![20.0, 21.0, 22.0, 23.0],
            values,
        ).unwrap();
        let models: ModelFields = ModelId::ALL
            .iter()
            .take(copies)
            .map(|m| (*m, FieldSet::new().with(Variable::Mslp, field.clone())))
            .collect();
        let grid = compute_grid_divergence(&models, Variable::Mslp, 1.0).unwrap();
        prop_assert_eq!(grid.shape(), (3, 3));
        prop_assert!(grid.values.iter().all(|v| v.abs() < 1e-9));
    }
}
