//! Balance engine - net position of every contributor across a sheet's items.
//!
//! The engine is a pure function over a snapshot: it never touches the database and
//! allocates a fresh map per call. Positive balances mean the contributor will
//! receive money, negative balances mean they owe.
//!
//! Per item, the payer is credited the full amount and each consumer is debited a
//! share. Consumers come from the item's consumer-weight rows; an id that matches no
//! contributor is booked under `unknown-{id}` so credits and debits still cancel.
//! Items without weight rows fall back to the caller's consumer list, and items
//! without any consumer only credit the payer.

use crate::{
    core::numeric::{round2, sanitize_weight, weights_are_equal},
    entities::{contributor, item, item_consumer},
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Net balance per contributor name.
pub type Balances = BTreeMap<String, f64>;

/// One item together with everything the engine needs to split it.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    /// The expense itself (amount and payer)
    pub item: item::Model,
    /// Stored consumer weights for the item
    pub weights: Vec<item_consumer::Model>,
    /// Consumer names to split equally between when `weights` is empty
    pub fallback_consumers: Vec<String>,
}

impl ItemSnapshot {
    /// Snapshot with stored weights and no fallback consumers.
    #[must_use]
    pub const fn new(item: item::Model, weights: Vec<item_consumer::Model>) -> Self {
        Self {
            item,
            weights,
            fallback_consumers: Vec::new(),
        }
    }
}

/// How an item's amount was divided between its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Every consumer pays `amount / n`
    Equal,
    /// Each consumer pays `weight / sum(weights) * amount`
    Weighted,
}

/// Name used for a contributor id that matches no contributor of the sheet.
#[must_use]
pub fn unknown_contributor_label(contributor_id: i64) -> String {
    format!("unknown-{contributor_id}")
}

/// `true` when `name` has the shape of [`unknown_contributor_label`], ignoring case.
#[must_use]
pub fn is_unknown_contributor_label(name: &str) -> bool {
    name.to_lowercase()
        .strip_prefix("unknown-")
        .is_some_and(|id| id.parse::<i64>().is_ok())
}

/// Chooses the split mode for a set of consumer weights.
///
/// Weights within 0.01 of each other, or a single consumer, split equally.
#[must_use]
pub fn split_mode(weights: &[item_consumer::Model]) -> SplitMode {
    if weights.len() <= 1 || weights_are_equal(weights.iter().map(|w| sanitize_weight(w.weight))) {
        SplitMode::Equal
    } else {
        SplitMode::Weighted
    }
}

/// Computes each consumer's debit for one item.
///
/// Returns an empty list when the item has no consumers at all.
#[must_use]
pub fn consumer_shares(
    names: &HashMap<i64, &str>,
    snapshot: &ItemSnapshot,
) -> Vec<(String, f64)> {
    let amount = snapshot.item.amount;

    if snapshot.weights.is_empty() {
        let count = snapshot.fallback_consumers.len();
        if count == 0 {
            return Vec::new();
        }
        #[allow(clippy::cast_precision_loss)]
        let share = amount / count as f64;
        return snapshot
            .fallback_consumers
            .iter()
            .map(|name| (name.clone(), share))
            .collect();
    }

    let resolve = |contributor_id: i64| {
        names
            .get(&contributor_id)
            .map_or_else(|| unknown_contributor_label(contributor_id), |n| (*n).to_string())
    };

    match split_mode(&snapshot.weights) {
        SplitMode::Equal => {
            #[allow(clippy::cast_precision_loss)]
            let share = amount / snapshot.weights.len() as f64;
            snapshot
                .weights
                .iter()
                .map(|w| (resolve(w.contributor_id), share))
                .collect()
        }
        SplitMode::Weighted => {
            let sum: f64 = snapshot.weights.iter().map(|w| sanitize_weight(w.weight)).sum();
            snapshot
                .weights
                .iter()
                .map(|w| (resolve(w.contributor_id), sanitize_weight(w.weight) / sum * amount))
                .collect()
        }
    }
}

/// Accumulates unrounded balances.
///
/// Every contributor starts at zero so people without items still appear.
#[must_use]
pub fn accumulate_balances(contributors: &[contributor::Model], items: &[ItemSnapshot]) -> Balances {
    let names: HashMap<i64, &str> = contributors.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut balances: Balances = contributors.iter().map(|c| (c.name.clone(), 0.0)).collect();

    for snapshot in items {
        let item = &snapshot.item;
        if !item.amount.is_finite() || item.amount <= 0.0 {
            debug!("Item '{}': skipped, amount {}", item.name, item.amount);
            continue;
        }

        let payer = names
            .get(&item.payer_id)
            .map_or_else(|| unknown_contributor_label(item.payer_id), |n| (*n).to_string());

        let shares = consumer_shares(&names, snapshot);
        if shares.is_empty() {
            debug!("Item '{}': no consumers, credited {payer} {}", item.name, item.amount);
        }
        for (name, share) in shares {
            *balances.entry(name).or_insert(0.0) -= share;
        }

        *balances.entry(payer).or_insert(0.0) += item.amount;
    }

    balances
}

/// Computes every contributor's net balance, rounded to cents.
///
/// Accumulation runs at full precision; only the final values are rounded.
#[must_use]
pub fn compute_balances(contributors: &[contributor::Model], items: &[ItemSnapshot]) -> Balances {
    let balances: Balances = accumulate_balances(contributors, items)
        .into_iter()
        .map(|(name, value)| (name, round2(value)))
        .collect();
    debug!("Final balances (pos=receive, neg=owe): {balances:?}");
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn contributor(id: i64, name: &str) -> contributor::Model {
        contributor::Model {
            id,
            name: name.to_string(),
            sheet_id: 1,
        }
    }

    fn item(id: i64, amount: f64, payer_id: i64) -> item::Model {
        let now = Utc::now();
        item::Model {
            id,
            sheet_id: 1,
            name: format!("item {id}"),
            amount,
            payer_id,
            created_at: now,
            modified_at: now,
            notes: None,
        }
    }

    fn weights(item_id: i64, pairs: &[(i64, f64)]) -> Vec<item_consumer::Model> {
        pairs
            .iter()
            .map(|&(contributor_id, weight)| item_consumer::Model {
                item_id,
                contributor_id,
                weight,
            })
            .collect()
    }

    fn abc() -> Vec<contributor::Model> {
        vec![
            contributor(1, "Alice"),
            contributor(2, "Bob"),
            contributor(3, "Carol"),
        ]
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_equal_split_three_ways() {
        let contributors = abc();
        let items = vec![ItemSnapshot::new(
            item(1, 90.0, 1),
            weights(1, &[(1, 33.33), (2, 33.33), (3, 33.33)]),
        )];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Alice"], 60.0);
        assert_close(balances["Bob"], -30.0);
        assert_close(balances["Carol"], -30.0);
    }

    #[test]
    fn test_weighted_split_is_scale_independent() {
        let contributors = abc();
        for (a, b) in [(25.0, 75.0), (1.0, 3.0), (0.25, 0.75)] {
            let items = vec![ItemSnapshot::new(
                item(1, 100.0, 3),
                weights(1, &[(1, a), (2, b)]),
            )];
            let balances = compute_balances(&contributors, &items);
            assert_close(balances["Alice"], -25.0);
            assert_close(balances["Bob"], -75.0);
            assert_close(balances["Carol"], 100.0);
        }
    }

    #[test]
    fn test_zero_consumer_fallback_credits_payer_only() {
        let contributors = abc();
        let items = vec![ItemSnapshot::new(item(1, 50.0, 1), Vec::new())];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Alice"], 50.0);
        assert_close(balances["Bob"], 0.0);
        assert_close(balances["Carol"], 0.0);
    }

    #[test]
    fn test_fallback_consumers_split_equally() {
        let contributors = abc();
        let items = vec![ItemSnapshot {
            item: item(1, 40.0, 2),
            weights: Vec::new(),
            fallback_consumers: vec!["Alice".to_string(), "Bob".to_string()],
        }];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Alice"], -20.0);
        assert_close(balances["Bob"], 20.0);
        assert_close(balances["Carol"], 0.0);
    }

    #[test]
    fn test_unknown_consumer_is_kept_under_synthetic_label() {
        let contributors = abc();
        let items = vec![ItemSnapshot::new(
            item(1, 60.0, 1),
            weights(1, &[(2, 50.0), (99, 50.0)]),
        )];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Alice"], 60.0);
        assert_close(balances["Bob"], -30.0);
        assert_close(balances["unknown-99"], -30.0);
        assert_close(balances.values().sum::<f64>(), 0.0);
    }

    #[test]
    fn test_non_positive_amounts_are_skipped() {
        let contributors = abc();
        let items = vec![
            ItemSnapshot::new(item(1, 0.0, 1), weights(1, &[(2, 100.0)])),
            ItemSnapshot::new(item(2, -15.0, 1), weights(2, &[(2, 100.0)])),
            ItemSnapshot::new(item(3, f64::NAN, 1), weights(3, &[(2, 100.0)])),
        ];

        let balances = compute_balances(&contributors, &items);
        assert!(balances.values().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_zero_weights_degrade_to_equal_split() {
        let contributors = abc();
        let items = vec![ItemSnapshot::new(
            item(1, 10.0, 1),
            weights(1, &[(2, 0.0), (3, 0.0)]),
        )];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Bob"], -5.0);
        assert_close(balances["Carol"], -5.0);
    }

    #[test]
    fn test_negative_weight_contributes_nothing() {
        let contributors = abc();
        let items = vec![ItemSnapshot::new(
            item(1, 10.0, 1),
            weights(1, &[(2, -40.0), (3, 100.0)]),
        )];

        let balances = compute_balances(&contributors, &items);
        assert_close(balances["Bob"], 0.0);
        assert_close(balances["Carol"], -10.0);
    }

    #[test]
    fn test_contributors_without_items_appear_with_zero() {
        let balances = compute_balances(&abc(), &[]);
        assert_eq!(balances.len(), 3);
        assert!(balances.values().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_unknown_label_detection() {
        assert!(is_unknown_contributor_label(&unknown_contributor_label(7)));
        assert!(is_unknown_contributor_label("Unknown-42"));
        assert!(is_unknown_contributor_label("unknown--3"));
        assert!(!is_unknown_contributor_label("unknown-"));
        assert!(!is_unknown_contributor_label("unknown-bob"));
        assert!(!is_unknown_contributor_label("unknown"));
        assert!(!is_unknown_contributor_label("Alice"));
    }

    #[test]
    fn test_split_mode_detection() {
        assert_eq!(split_mode(&weights(1, &[(1, 60.0)])), SplitMode::Equal);
        assert_eq!(
            split_mode(&weights(1, &[(1, 50.0), (2, 50.005)])),
            SplitMode::Equal
        );
        assert_eq!(
            split_mode(&weights(1, &[(1, 50.0), (2, 50.02)])),
            SplitMode::Weighted
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let contributors = abc();
        let item1 = ItemSnapshot::new(
            item(1, 30.0, 1),
            weights(1, &[(1, 33.33), (2, 33.33), (3, 33.33)]),
        );

        let after_first = compute_balances(&contributors, std::slice::from_ref(&item1));
        assert_close(after_first["Alice"], 20.0);
        assert_close(after_first["Bob"], -10.0);
        assert_close(after_first["Carol"], -10.0);

        let item2 = ItemSnapshot::new(item(2, 60.0, 2), weights(2, &[(1, 25.0), (2, 75.0)]));
        let balances = compute_balances(&contributors, &[item1, item2]);
        assert_close(balances["Alice"], 5.0);
        assert_close(balances["Bob"], 5.0);
        assert_close(balances["Carol"], -10.0);
        assert_close(balances.values().sum::<f64>(), 0.0);
    }

    #[test]
    fn test_rounding_happens_after_accumulation() {
        let contributors = abc();
        // Each share is 3.333...; rounding per item would leave Bob at -9.99.
        let items: Vec<ItemSnapshot> = (1..=3)
            .map(|id| {
                ItemSnapshot::new(
                    item(id, 10.0, 1),
                    weights(id, &[(1, 1.0), (2, 1.0), (3, 1.0)]),
                )
            })
            .collect();

        let raw = accumulate_balances(&contributors, &items);
        let rounded = compute_balances(&contributors, &items);
        assert_close(raw["Bob"], -10.0);
        assert_close(rounded["Bob"], -10.0);
        assert_close(rounded["Alice"], 20.0);
    }

    proptest! {
        #[test]
        fn balances_sum_to_zero(
            entries in prop::collection::vec(
                (
                    1u32..=100_000,
                    0usize..4,
                    prop::collection::vec((0usize..5, 0u32..=100), 1..=4),
                ),
                0..=25,
            ),
        ) {
            let contributors = vec![
                contributor(1, "Alice"),
                contributor(2, "Bob"),
                contributor(3, "Carol"),
                contributor(4, "Dan"),
            ];

            let mut items = Vec::with_capacity(entries.len());
            for (idx, (cents, payer_idx, consumers)) in entries.into_iter().enumerate() {
                let item_id = i64::try_from(idx).unwrap_or(0) + 1;
                let mut rows: Vec<item_consumer::Model> = Vec::new();
                for (consumer_idx, weight) in consumers {
                    // Index 4 is not a known contributor
                    let contributor_id = i64::try_from(consumer_idx).unwrap_or(0) + 1;
                    if rows.iter().all(|r| r.contributor_id != contributor_id) {
                        rows.push(item_consumer::Model {
                            item_id,
                            contributor_id,
                            weight: f64::from(weight),
                        });
                    }
                }
                items.push(ItemSnapshot::new(
                    item(item_id, f64::from(cents) / 100.0, i64::try_from(payer_idx).unwrap_or(0) + 1),
                    rows,
                ));
            }

            let raw = accumulate_balances(&contributors, &items);
            let total: f64 = raw.values().sum();
            prop_assert!(total.abs() < 1e-6, "raw balances sum to {}", total);

            let rounded = compute_balances(&contributors, &items);
            #[allow(clippy::cast_precision_loss)]
            let bound = 0.005 * rounded.len() as f64 + 1e-6;
            let rounded_total: f64 = rounded.values().sum();
            prop_assert!(rounded_total.abs() <= bound);
        }
    }
}
