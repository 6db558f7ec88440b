//! Co-occurrence product recommendations.
//!
//! Two items are affine when at least one customer has bought both. The
//! engine counts such customers per unordered item pair, then scores a
//! candidate item for a customer by summing its affinity to everything the
//! customer already owns. No ratings and no model, just purchase overlap.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{CustomerId, ItemId};
use crate::features::EngineeredRecord;

/// Fallback recommendation list length when the caller gives none.
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

/// Pair expansion is quadratic per customer, so histories longer than this
/// only contribute their most frequently bought items to the pair counts.
/// Scoring still uses the full history.
const AFFINITY_HISTORY_CAP: usize = 512;

/// One recommended item with its co-occurrence score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemAffinity {
    pub item_id: ItemId,
    pub score: f64,
}

pub type RecommendationSet = Vec<ItemAffinity>;

/// Customer-to-customer purchase overlap, queryable per customer.
#[derive(Clone, Debug, Default)]
pub struct RecommendationEngine {
    /// Vocabulary in lexicographic order; codes index into it.
    items: Vec<ItemId>,
    item_codes: BTreeMap<ItemId, usize>,
    /// Keyed by (low code, high code).
    affinity: HashMap<(usize, usize), u64>,
    /// Distinct owned item codes per customer.
    histories: BTreeMap<CustomerId, Vec<usize>>,
}

impl RecommendationEngine {
    pub fn from_records(records: &[EngineeredRecord]) -> Self {
        let items: Vec<ItemId> = records
            .iter()
            .map(|record| record.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let item_codes: BTreeMap<ItemId, usize> = items
            .iter()
            .cloned()
            .enumerate()
            .map(|(code, item)| (item, code))
            .collect();

        let mut counts: BTreeMap<CustomerId, BTreeMap<usize, u64>> = BTreeMap::new();
        for record in records {
            let code = item_codes[&record.item_id];
            *counts.entry(record.customer_id).or_default().entry(code).or_insert(0) += 1;
        }

        let mut affinity: HashMap<(usize, usize), u64> = HashMap::new();
        let mut histories: BTreeMap<CustomerId, Vec<usize>> = BTreeMap::new();
        for (customer_id, owned) in counts {
            let expanded = capped_history(&owned, AFFINITY_HISTORY_CAP);
            for (left, &a) in expanded.iter().enumerate() {
                for &b in &expanded[left + 1..] {
                    let key = if a < b { (a, b) } else { (b, a) };
                    *affinity.entry(key).or_insert(0) += 1;
                }
            }
            histories.insert(customer_id, owned.into_keys().collect());
        }

        Self { items, item_codes, affinity, histories }
    }

    /// Top `limit` items the customer does not own yet, by summed affinity
    /// to their history. Score ties resolve to the lexicographically
    /// smaller item. Unknown customers get an empty list.
    pub fn recommend_for(&self, customer_id: CustomerId, limit: usize) -> RecommendationSet {
        let Some(history) = self.histories.get(&customer_id) else {
            return Vec::new();
        };
        let owned: BTreeSet<usize> = history.iter().copied().collect();

        let mut scored: Vec<(usize, f64)> = (0..self.items.len())
            .filter(|code| !owned.contains(code))
            .filter_map(|candidate| {
                let score: u64 = history
                    .iter()
                    .map(|&code| {
                        let key =
                            if candidate < code { (candidate, code) } else { (code, candidate) };
                        self.affinity.get(&key).copied().unwrap_or(0)
                    })
                    .sum();
                (score > 0).then_some((candidate, score as f64))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
            .into_iter()
            .map(|(code, score)| ItemAffinity { item_id: self.items[code].clone(), score })
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn customer_count(&self) -> usize {
        self.histories.len()
    }
}

/// Distinct item codes ordered by purchase count descending then code, cut
/// to `cap` entries.
fn capped_history(owned: &BTreeMap<usize, u64>, cap: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, u64)> =
        owned.iter().map(|(&code, &count)| (code, count)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(cap);
    ranked.into_iter().map(|(code, _)| code).collect()
}
