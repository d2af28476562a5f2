//! Cost depends only on the running totals, never on how deltas arrive.

use folio::usage::{ModelTier, UsageStats, UsageTracker};
use proptest::prelude::*;

fn tier_strategy() -> impl Strategy<Value = ModelTier> {
    prop_oneof![
        Just(ModelTier::Flash25),
        Just(ModelTier::Flash3),
        Just(ModelTier::Pro3),
    ]
}

proptest! {
    #[test]
    fn cost_is_independent_of_chunking(
        deltas in proptest::collection::vec((0u64..50_000, 0u64..50_000), 0..20),
        tier in tier_strategy(),
    ) {
        let mut chunked = UsageTracker::new();
        let mut last = UsageStats::default();
        for (input, output) in &deltas {
            last = chunked.record(*input, *output, tier);
        }

        let total_in: u64 = deltas.iter().map(|(i, _)| i).sum();
        let total_out: u64 = deltas.iter().map(|(_, o)| o).sum();
        let mut single = UsageTracker::new();
        let whole = single.record(total_in, total_out, tier);

        prop_assert_eq!(chunked.snapshot(tier), whole);
        if !deltas.is_empty() {
            prop_assert_eq!(last, whole);
        }

        let pricing = tier.pricing();
        let expected = (total_in as f64 / 1e6) * pricing.input_per_million
            + (total_out as f64 / 1e6) * pricing.output_per_million;
        prop_assert!((whole.total_cost - expected).abs() < 1e-9);
    }
}
