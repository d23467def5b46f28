#[cfg(test)]
mod tests {
    use crate::slots::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn any_start() -> impl Strategy<Value = Slot> {
        (0u16..48).prop_map(|i| Slot::from_minutes(i * SLOT_MINUTES).unwrap())
    }

    fn any_boundary() -> impl Strategy<Value = Slot> {
        (0u16..=48).prop_map(|i| Slot::from_minutes(i * SLOT_MINUTES).unwrap())
    }

    proptest! {
        // Expanding the merged ranges gives back exactly the input set
        #[test]
        fn test_ranges_cover_exactly_the_input(slots in prop::collection::vec(any_start(), 0..60)) {
            let ranges = slots_to_ranges(&slots);
            let expanded: BTreeSet<Slot> = ranges
                .iter()
                .flat_map(|r| expand_range(r.from, r.to))
                .collect();
            let input: BTreeSet<Slot> = slots.into_iter().collect();
            prop_assert_eq!(expanded, input);
        }

        // No two output ranges touch, and each one is non-empty
        #[test]
        fn test_ranges_are_minimal(slots in prop::collection::vec(any_start(), 0..60)) {
            let ranges = slots_to_ranges(&slots);
            for r in &ranges {
                prop_assert!(r.to > r.from);
            }
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].to < pair[1].from);
            }
        }

        #[test]
        fn test_expand_is_empty_when_end_not_after_start(a in any_boundary(), b in any_boundary()) {
            let expanded = expand_range(a, b);
            if b <= a {
                prop_assert!(expanded.is_empty());
            } else {
                prop_assert_eq!(expanded.len() as u16, (b.minutes() - a.minutes()) / SLOT_MINUTES);
            }
        }

        // Clamping always yields a valid range that starts no later than 23:30
        #[test]
        fn test_clamped_is_always_valid(a in any_boundary(), b in any_boundary()) {
            let r = SlotRange { from: a, to: b }.clamped();
            prop_assert!(r.to > r.from);
            prop_assert!(r.from <= Slot::LAST_START);
            prop_assert!(SlotRange::new(r.from, r.to).is_ok());
        }

        #[test]
        fn test_normalize_is_idempotent(
            raw in prop::collection::vec((any_boundary(), any_boundary()), 0..10)
        ) {
            let ranges: Vec<SlotRange> = raw
                .into_iter()
                .map(|(from, to)| SlotRange { from, to })
                .collect();
            let once = normalize_ranges(&ranges);
            prop_assert_eq!(normalize_ranges(&once), once);
        }
    }
}
