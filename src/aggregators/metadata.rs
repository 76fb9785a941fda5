//! Aggregators over printing metadata: illustrations, promos and foils.

use crate::aggregators::{insert_link, row, Aggregator, ColumnDef, Row};
use crate::cards::card_image_uri;
use crate::cards::constants::{modern_foil_cutoff, special_foil_label, FOIL_PROMO_TYPES};
use crate::models::Card;
use serde_json::json;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Link data from the first printing seen for a key.
type Links<K> = BTreeMap<K, (String, String)>;

fn remember_link<K: Ord>(links: &mut Links<K>, key: K, card: &Card) {
    links.entry(key).or_insert_with(|| {
        (
            card.scryfall_uri.clone().unwrap_or_default(),
            card_image_uri(card, "normal"),
        )
    });
}

fn with_link<K: Ord>(mut row: Row, links: &Links<K>, key: &K) -> Row {
    let (scryfall_uri, image_uri) = links.get(key).cloned().unwrap_or_default();
    insert_link(&mut row, &scryfall_uri, &image_uri);
    row
}

/// Sets ordered by size (largest first), ties by key.
fn by_size_desc<K, V>(groups: &BTreeMap<K, BTreeSet<V>>) -> Vec<(&K, &BTreeSet<V>)> {
    let mut entries: Vec<_> = groups.iter().collect();
    entries.sort_by_key(|(_, values)| Reverse(values.len()));
    entries
}

fn join_sorted(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Number of distinct illustrations of each card within each set.
#[derive(Default)]
pub struct CountCardIllustrationsBySetAggregator {
    illustrations: BTreeMap<(String, String), BTreeSet<String>>,
    links: Links<(String, String)>,
}

impl CountCardIllustrationsBySetAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for CountCardIllustrationsBySetAggregator {
    fn name(&self) -> &str {
        "count_card_illustrations_by_set"
    }

    fn display_name(&self) -> &str {
        "Card Illustrations Count by Set"
    }

    fn description(&self) -> &str {
        "Distinct illustrations of each card within a set"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("set", "Set"),
            ColumnDef::new("name", "Name").card_link(),
            ColumnDef::new("count", "Count").numeric().sort_desc(),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let (Some(set), Some(name), Some(illustration)) =
            (&card.set, &card.name, &card.illustration_id)
        else {
            return;
        };

        let key = (set.clone(), name.clone());
        self.illustrations
            .entry(key.clone())
            .or_default()
            .insert(illustration.clone());
        remember_link(&mut self.links, key, card);
    }

    fn sorted_rows(&self) -> Vec<Row> {
        by_size_desc(&self.illustrations)
            .into_iter()
            .map(|(key, illustrations)| {
                let (set, name) = key;
                let row = row(json!({
                    "set": set,
                    "name": name,
                    "count": illustrations.len(),
                }));
                with_link(row, &self.links, key)
            })
            .collect()
    }
}

/// Every promo type each card has been printed with.
#[derive(Default)]
pub struct PromoTypesAggregator {
    promo_types: BTreeMap<String, BTreeSet<String>>,
    links: Links<String>,
}

impl PromoTypesAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for PromoTypesAggregator {
    fn name(&self) -> &str {
        "promo_types_by_name"
    }

    fn display_name(&self) -> &str {
        "Promo Types by Card Name"
    }

    fn description(&self) -> &str {
        "All promo types each card has been printed with"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "Name").width(160).card_link(),
            ColumnDef::new("promoTypes", "Promo Types").width(320),
            ColumnDef::new("count", "Count").numeric().sort_desc(),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let Some(name) = &card.name else {
            return;
        };
        if card.promo_types.is_empty() {
            return;
        }

        self.promo_types
            .entry(name.clone())
            .or_default()
            .extend(card.promo_types.iter().cloned());
        remember_link(&mut self.links, name.clone(), card);
    }

    fn sorted_rows(&self) -> Vec<Row> {
        by_size_desc(&self.promo_types)
            .into_iter()
            .map(|(name, promo_types)| {
                let row = row(json!({
                    "name": name,
                    "promoTypes": join_sorted(promo_types),
                    "count": promo_types.len(),
                }));
                with_link(row, &self.links, name)
            })
            .collect()
    }
}

/// Every foiling treatment each card has been printed with.
#[derive(Default)]
pub struct FoilTypesAggregator {
    foil_types: BTreeMap<String, BTreeSet<String>>,
    links: Links<String>,
}

impl FoilTypesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Foil treatments carried by a single printing.
    fn printing_foil_types(card: &Card) -> BTreeSet<String> {
        let mut types = BTreeSet::new();

        if let Some(label) = card.set.as_deref().and_then(special_foil_label) {
            types.insert(label.to_string());
            return types;
        }

        types.extend(
            card.promo_types
                .iter()
                .filter(|p| FOIL_PROMO_TYPES.contains(&p.as_str()))
                .cloned(),
        );

        if card.set_type.as_deref() == Some("from_the_vault") {
            types.insert("from_the_vault".to_string());
        }

        if card.finishes.iter().any(|f| f == "foil") {
            let era = match card.released_at {
                Some(date) if date < modern_foil_cutoff() => "premodern_foil",
                _ => "modern_foil",
            };
            types.insert(era.to_string());
        }

        if card.finishes.iter().any(|f| f == "etched") {
            types.insert("etched".to_string());
        }

        types
    }
}

impl Aggregator for FoilTypesAggregator {
    fn name(&self) -> &str {
        "foil_types_by_name"
    }

    fn display_name(&self) -> &str {
        "Foil Types by Card Name"
    }

    fn description(&self) -> &str {
        "All foiling treatments each card has been printed with"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "Name").width(200).card_link(),
            ColumnDef::new("foilTypes", "Foil Types").width(400),
            ColumnDef::new("count", "Count").numeric().sort_desc(),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let Some(name) = &card.name else {
            return;
        };

        remember_link(&mut self.links, name.clone(), card);

        let types = Self::printing_foil_types(card);
        if !types.is_empty() {
            self.foil_types.entry(name.clone()).or_default().extend(types);
        }
    }

    fn sorted_rows(&self) -> Vec<Row> {
        by_size_desc(&self.foil_types)
            .into_iter()
            .map(|(name, foil_types)| {
                let row = row(json!({
                    "name": name,
                    "foilTypes": join_sorted(foil_types),
                    "count": foil_types.len(),
                }));
                with_link(row, &self.links, name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn printing(name: &str, set: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            set: Some(set.to_string()),
            scryfall_uri: Some(format!("https://scryfall.com/{}", set)),
            ..Default::default()
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_illustrations_by_set() {
        let mut agg = CountCardIllustrationsBySetAggregator::new();
        for (set, art) in [("unh", "a"), ("unh", "b"), ("unh", "a"), ("lea", "c")] {
            agg.process_card(&Card {
                illustration_id: Some(art.to_string()),
                ..printing("Forest", set)
            });
        }
        agg.process_card(&printing("Forest", "m10"));

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["set"], "unh");
        assert_eq!(rows[0]["count"], 2);
        assert_eq!(rows[0]["scryfall_uri"], "https://scryfall.com/unh");
        assert_eq!(rows[1]["set"], "lea");
        assert_eq!(rows[1]["count"], 1);
    }

    #[test]
    fn test_promo_types_union() {
        let mut agg = PromoTypesAggregator::new();
        agg.process_card(&Card {
            promo_types: strings(&["prerelease", "datestamped"]),
            ..printing("Lightning Bolt", "pm10")
        });
        agg.process_card(&Card {
            promo_types: strings(&["buyabox", "prerelease"]),
            ..printing("Lightning Bolt", "p2x")
        });
        agg.process_card(&printing("Shock", "m19"));

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["promoTypes"], "buyabox, datestamped, prerelease");
        assert_eq!(rows[0]["count"], 3);
        assert_eq!(rows[0]["scryfall_uri"], "https://scryfall.com/pm10");
    }

    #[test]
    fn test_foil_eras() {
        let old = Card {
            finishes: strings(&["foil"]),
            released_at: NaiveDate::from_ymd_opt(1999, 1, 1),
            ..printing("Bolt", "old")
        };
        let new = Card {
            finishes: strings(&["foil", "etched"]),
            released_at: NaiveDate::from_ymd_opt(2003, 7, 28),
            ..printing("Bolt", "new")
        };
        let undated = Card {
            finishes: strings(&["foil"]),
            ..printing("Shock", "x")
        };

        assert_eq!(
            FoilTypesAggregator::printing_foil_types(&old),
            BTreeSet::from(["premodern_foil".to_string()])
        );
        assert_eq!(
            FoilTypesAggregator::printing_foil_types(&new),
            BTreeSet::from(["etched".to_string(), "modern_foil".to_string()])
        );
        assert_eq!(
            FoilTypesAggregator::printing_foil_types(&undated),
            BTreeSet::from(["modern_foil".to_string()])
        );
    }

    #[test]
    fn test_foil_special_sets_and_promos() {
        let invention = Card {
            finishes: strings(&["foil"]),
            promo_types: strings(&["galaxyfoil"]),
            ..printing("Sol Ring", "mps")
        };
        assert_eq!(
            FoilTypesAggregator::printing_foil_types(&invention),
            BTreeSet::from(["inventions".to_string()])
        );

        let vault = Card {
            set_type: Some("from_the_vault".to_string()),
            promo_types: strings(&["galaxyfoil", "prerelease"]),
            ..printing("Sol Ring", "v10")
        };
        assert_eq!(
            FoilTypesAggregator::printing_foil_types(&vault),
            BTreeSet::from(["from_the_vault".to_string(), "galaxyfoil".to_string()])
        );
    }

    #[test]
    fn test_foil_rows_skip_nonfoil_cards() {
        let mut agg = FoilTypesAggregator::new();
        agg.process_card(&Card {
            finishes: strings(&["nonfoil"]),
            ..printing("Plain", "lea")
        });
        agg.process_card(&Card {
            finishes: strings(&["foil", "etched"]),
            ..printing("Shiny", "cmr")
        });

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Shiny");
        assert_eq!(rows[0]["foilTypes"], "etched, modern_foil");
        assert_eq!(rows[0]["count"], 2);
    }
}
