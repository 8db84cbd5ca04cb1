//! Pre-format selection: fit candidate items into a tier's char budget.
//!
//! Every item is scored by its relevance plus a small bonus for the
//! priority of its source, then admitted greedily in score order. An item
//! that does not fit is skipped and the scan continues, so cheaper or
//! lower-ranked items from other sources can still fill the remaining space.
//! Costs are estimates; the rendered text is re-checked by
//! [`enforce`](crate::enforce::enforce).

use crate::sources::source_priority;
use briefing_core::item::DEFAULT_RELEVANCE;
use briefing_core::{ContextItem, ItemsBySource, Tier};
use std::collections::HashSet;

/// Estimated rendered size of one item line.
pub const BASE_ITEM_COST: usize = 80;
/// Additional estimate when an item carries an excerpt.
pub const EXCERPT_COST: usize = 60;
/// One-time estimate for the header of a source's section.
pub const SECTION_HEADER_COST: usize = 30;
/// Score bonus per point of source priority.
pub const PRIORITY_WEIGHT: f32 = 0.05;

/// `relevance + priority(source) * 0.05`.
pub fn item_score(item: &ContextItem) -> f32 {
    let relevance = if item.relevance.is_finite() {
        item.relevance
    } else {
        DEFAULT_RELEVANCE
    };
    relevance + f32::from(source_priority(&item.source)) * PRIORITY_WEIGHT
}

pub fn item_cost(item: &ContextItem) -> usize {
    if item.has_excerpt() {
        BASE_ITEM_COST + EXCERPT_COST
    } else {
        BASE_ITEM_COST
    }
}

/// Select the items that fit `tier` once `reserved_chars` are spent on
/// text rendered ahead of them. The result is grouped by source in
/// selection order.
pub fn select_items(items: &ItemsBySource, tier: Tier, reserved_chars: usize) -> ItemsBySource {
    let usable = tier.usable_chars(reserved_chars);
    let mut selected = ItemsBySource::new();
    if usable == 0 || items.is_empty() {
        return selected;
    }

    let mut candidates: Vec<(f32, &ContextItem)> = items
        .iter()
        .flat_map(|(_, group)| group.iter())
        .map(|item| (item_score(item), item))
        .collect();
    // Stable: equal scores keep adapter order
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut spent = 0usize;
    let mut seen: HashSet<&str> = HashSet::new();
    for (_, item) in candidates {
        let header = if seen.contains(item.source.as_str()) {
            0
        } else {
            SECTION_HEADER_COST
        };
        let cost = item_cost(item) + header;
        if spent + cost > usable {
            continue;
        }
        spent += cost;
        seen.insert(item.source.as_str());
        selected.push(item.clone());
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, title: &str, relevance: f32) -> ContextItem {
        ContextItem::new(source, title)
            .with_summary("summary")
            .with_relevance(relevance)
    }

    fn many_with_excerpts(count: usize) -> ItemsBySource {
        (0..count)
            .map(|i| {
                item("search", &format!("hit {i}"), 0.5).with_excerpt("fn main() {}")
            })
            .collect()
    }

    #[test]
    fn empty_input_selects_nothing() {
        for tier in Tier::ALL {
            assert!(select_items(&ItemsBySource::new(), tier, 0).is_empty());
        }
    }

    #[test]
    fn reserved_chars_shrink_the_selection() {
        let items = many_with_excerpts(40);
        let roomy = select_items(&items, Tier::Slow, 0);
        let tight = select_items(&items, Tier::Slow, 2000);
        // 30 + 26 * 140 = 3670 <= 3800
        assert_eq!(roomy.item_count(), 26);
        // 30 + 12 * 140 = 1710 <= 1800
        assert_eq!(tight.item_count(), 12);
        assert!(tight.item_count() < roomy.item_count());
    }

    #[test]
    fn reserved_beyond_budget_selects_nothing() {
        let items = many_with_excerpts(3);
        assert!(select_items(&items, Tier::Hot, 10_000).is_empty());
    }

    #[test]
    fn relevant_high_priority_item_wins() {
        let items: ItemsBySource = [item("delegation", "ask the crew", 0.1), item("mem", "decision log", 0.95)]
            .into_iter()
            .collect();
        for tier in Tier::ALL {
            let picked = select_items(&items, tier, 0);
            let first = picked.iter().next().map(|(source, _)| source);
            assert_eq!(first, Some("mem"), "tier {tier}");
        }
        // Hot has room for only one section
        let hot = select_items(&items, Tier::Hot, 0);
        assert_eq!(hot.item_count(), 1);
    }

    #[test]
    fn skipped_items_leave_room_for_smaller_ones() {
        // usable 200: the mem item with an excerpt takes 170, neither of the
        // others fits in the remaining 30
        let items: ItemsBySource = [
            item("mem", "big", 0.9).with_excerpt("long excerpt"),
            item("search", "b", 0.8),
            item("mem", "small", 0.1),
        ]
        .into_iter()
        .collect();
        let picked = select_items(&items, Tier::Hot, 0);
        assert_eq!(picked.item_count(), 1);

        // The big one alone is over budget; the smaller one still fits
        let items: ItemsBySource = [
            item("mem", "big", 0.9).with_excerpt("long excerpt"),
            item("mem", "small", 0.1),
        ]
        .into_iter()
        .collect();
        let picked = select_items(&items, Tier::Hot, 40);
        assert_eq!(picked.item_count(), 1);
        assert_eq!(picked.get("mem").map(|g| g[0].title.as_str()), Some("small"));
    }

    #[test]
    fn unknown_sources_rank_by_relevance_alone() {
        let known = item("mem", "a", 0.0);
        let unknown = item("jira", "b", 0.45);
        assert!(item_score(&known) > item_score(&unknown));
        assert_eq!(item_score(&item("jira", "c", f32::NAN)), DEFAULT_RELEVANCE);
    }
}
