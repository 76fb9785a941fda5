//! Aggregators that find the first printing with given characteristics.

use crate::aggregators::{insert_link, row, Aggregator, ColumnDef, Row};
use crate::cards::{generalize_mana_cost, sort_key};
use crate::models::{Card, Printing};
use serde_json::json;
use std::collections::BTreeMap;

/// Keeps the earliest printing per key.
pub(crate) fn keep_earliest<K: Ord>(store: &mut BTreeMap<K, Printing>, key: K, card: &Card) {
    let is_earlier = store
        .get(&key)
        .map_or(true, |existing| sort_key(card) < existing.sort_key);
    if is_earlier {
        store.insert(key, Printing::from_card(card));
    }
}

/// Entries ordered by their printing's sort key.
pub(crate) fn by_printing_order<K>(store: &BTreeMap<K, Printing>) -> Vec<(&K, &Printing)> {
    let mut entries: Vec<_> = store.iter().collect();
    entries.sort_by(|a, b| a.1.sort_key.cmp(&b.1.sort_key));
    entries
}

/// First card printed for each power/toughness combination.
#[derive(Default)]
pub struct FirstCardByPowerToughnessAggregator {
    firsts: BTreeMap<(String, String), Printing>,
}

impl FirstCardByPowerToughnessAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for FirstCardByPowerToughnessAggregator {
    fn name(&self) -> &str {
        "first_card_by_power_toughness"
    }

    fn display_name(&self) -> &str {
        "First Cards by Power and Toughness"
    }

    fn description(&self) -> &str {
        "Earliest printing of each power/toughness combination"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("power", "Power").width(90),
            ColumnDef::new("toughness", "Toughness").width(110),
            ColumnDef::new("name", "Name").width(200).card_link(),
            ColumnDef::new("set", "Set").width(80),
            ColumnDef::new("releaseDate", "Release Date").width(120),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let power = card.power.as_deref().unwrap_or("");
        let toughness = card.toughness.as_deref().unwrap_or("");
        if power.is_empty() || toughness.is_empty() {
            return;
        }

        keep_earliest(
            &mut self.firsts,
            (power.to_string(), toughness.to_string()),
            card,
        );
    }

    fn sorted_rows(&self) -> Vec<Row> {
        by_printing_order(&self.firsts)
            .into_iter()
            .map(|((power, toughness), printing)| {
                let mut row = row(json!({
                    "power": power,
                    "toughness": toughness,
                    "name": printing.name,
                    "set": printing.set,
                    "releaseDate": printing.release_date,
                }));
                insert_link(&mut row, &printing.scryfall_uri, &printing.image_uri);
                row
            })
            .collect()
    }
}

/// First card printed for each generalized mana cost.
#[derive(Default)]
pub struct FirstCardByGeneralizedManaCostAggregator {
    firsts: BTreeMap<String, Printing>,
    counts: BTreeMap<String, u64>,
}

impl FirstCardByGeneralizedManaCostAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for FirstCardByGeneralizedManaCostAggregator {
    fn name(&self) -> &str {
        "first_card_by_generalized_mana_cost"
    }

    fn display_name(&self) -> &str {
        "First Cards by Generalized Mana Cost"
    }

    fn description(&self) -> &str {
        "Earliest printing of each mana cost shape, with colors abstracted"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("generalizedManaCost", "Generalized Mana Cost").width(200),
            ColumnDef::new("name", "Name").width(200).card_link(),
            ColumnDef::new("set", "Set").width(80),
            ColumnDef::new("releaseDate", "Release Date").width(120),
            ColumnDef::new("originalManaCost", "Original Mana Cost").width(180),
            ColumnDef::new("count", "Count").width(100).numeric(),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let Some(mana_cost) = card.mana_cost.as_deref().filter(|c| !c.is_empty()) else {
            return;
        };

        let generalized = generalize_mana_cost(mana_cost);
        *self.counts.entry(generalized.clone()).or_insert(0) += 1;
        keep_earliest(&mut self.firsts, generalized, card);
    }

    fn sorted_rows(&self) -> Vec<Row> {
        by_printing_order(&self.firsts)
            .into_iter()
            .map(|(generalized, printing)| {
                let mut row = row(json!({
                    "generalizedManaCost": generalized,
                    "name": printing.name,
                    "set": printing.set,
                    "releaseDate": printing.release_date,
                    "originalManaCost": printing.mana_cost,
                    "count": self.counts.get(generalized).copied().unwrap_or(0),
                }));
                insert_link(&mut row, &printing.scryfall_uri, &printing.image_uri);
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn creature(name: &str, pt: (&str, &str), released_at: &str, set: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            power: Some(pt.0.to_string()),
            toughness: Some(pt.1.to_string()),
            released_at: NaiveDate::parse_from_str(released_at, "%Y-%m-%d").ok(),
            set: Some(set.to_string()),
            collector_number: Some("1".to_string()),
            ..Default::default()
        }
    }

    fn spell(name: &str, mana_cost: &str, released_at: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            mana_cost: Some(mana_cost.to_string()),
            released_at: NaiveDate::parse_from_str(released_at, "%Y-%m-%d").ok(),
            set: Some("set".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_power_toughness_keeps_earliest() {
        let mut agg = FirstCardByPowerToughnessAggregator::new();
        agg.process_card(&creature("Runeclaw Bear", ("2", "2"), "2009-07-17", "m10"));
        agg.process_card(&creature("Grizzly Bears", ("2", "2"), "1993-08-05", "lea"));
        agg.process_card(&creature("Bear Cub", ("2", "2"), "2001-01-01", "inv"));

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Grizzly Bears");
        assert_eq!(rows[0]["releaseDate"], "1993-08-05");
    }

    #[test]
    fn test_power_toughness_skips_noncreatures() {
        let mut agg = FirstCardByPowerToughnessAggregator::new();
        agg.process_card(&spell("Lightning Bolt", "{R}", "1993-08-05"));
        agg.process_card(&creature("Odd", ("1", ""), "1993-08-05", "lea"));
        assert!(agg.sorted_rows().is_empty());
    }

    #[test]
    fn test_power_toughness_rows_in_printing_order() {
        let mut agg = FirstCardByPowerToughnessAggregator::new();
        agg.process_card(&creature("Tarmogoyf", ("*", "1+*"), "2007-02-02", "fut"));
        agg.process_card(&creature("Grizzly Bears", ("2", "2"), "1993-08-05", "lea"));

        let rows = agg.sorted_rows();
        assert_eq!(rows[0]["power"], "2");
        assert_eq!(rows[1]["power"], "*");
        assert_eq!(rows[1]["toughness"], "1+*");
    }

    #[test]
    fn test_generalized_mana_cost_groups_colors() {
        let mut agg = FirstCardByGeneralizedManaCostAggregator::new();
        agg.process_card(&spell("Shock", "{R}", "2000-01-01"));
        agg.process_card(&spell("Lightning Bolt", "{R}", "1993-08-05"));
        agg.process_card(&spell("Healing Salve", "{W}", "1993-08-05"));
        agg.process_card(&spell("Ornithopter", "{0}", "1994-01-01"));
        agg.process_card(&spell("Land", "", "1993-08-05"));

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 2);

        let mono = &rows[0];
        assert_eq!(mono["generalizedManaCost"], "{M}");
        assert_eq!(mono["count"], 3);
        assert_eq!(mono["originalManaCost"], "{R}");
        assert_eq!(mono["name"], "Lightning Bolt");

        assert_eq!(rows[1]["generalizedManaCost"], "{0}");
        assert_eq!(rows[1]["count"], 1);
    }
}
