//! Aggregators that count card properties.

use crate::aggregators::{insert_link, row, Aggregator, ColumnDef, Row};
use crate::cards::card_image_uri;
use crate::models::{Card, CardField};
use serde_json::{json, Value};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Counts printings (or finishes) grouped by arbitrary key fields.
pub struct CountAggregator {
    name: String,
    display_name: String,
    description: String,
    key_fields: Vec<CardField>,
    count_finishes: bool,
    counts: BTreeMap<Vec<String>, u64>,
    /// First printing's link data per key, kept only when `name` is a key.
    links: BTreeMap<Vec<String>, (String, String)>,
}

impl CountAggregator {
    pub fn new(
        name: &str,
        display_name: &str,
        key_fields: Vec<CardField>,
        count_finishes: bool,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            key_fields,
            count_finishes,
            counts: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    fn needs_card_links(&self) -> bool {
        self.key_fields.contains(&CardField::Name)
    }
}

impl Aggregator for CountAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn columns(&self) -> Vec<ColumnDef> {
        let mut columns: Vec<ColumnDef> = self
            .key_fields
            .iter()
            .map(|field| {
                let col = ColumnDef::new(field.key(), &field.header());
                match field {
                    CardField::Name => col.card_link().width(200),
                    CardField::Set => col.width(80),
                    _ => col,
                }
            })
            .collect();
        columns.push(ColumnDef::new("count", "Count").width(100).numeric());
        columns
    }

    fn process_card(&mut self, card: &Card) {
        // Skip cards missing any key field
        let key: Option<Vec<String>> = self.key_fields.iter().map(|f| card.field(*f)).collect();
        let Some(key) = key else {
            return;
        };

        let amount = if self.count_finishes {
            card.finishes.len() as u64
        } else {
            1
        };
        *self.counts.entry(key.clone()).or_insert(0) += amount;

        if self.needs_card_links() && !self.links.contains_key(&key) {
            let link = (
                card.scryfall_uri.clone().unwrap_or_default(),
                card_image_uri(card, "normal"),
            );
            self.links.insert(key, link);
        }
    }

    fn sorted_rows(&self) -> Vec<Row> {
        let mut entries: Vec<_> = self.counts.iter().collect();
        entries.sort_by_key(|(_, count)| Reverse(**count));

        entries
            .into_iter()
            .map(|(key, count)| {
                let mut row = Row::new();
                for (field, value) in self.key_fields.iter().zip(key) {
                    row.insert(field.key().to_string(), Value::from(value.as_str()));
                }
                row.insert("count".to_string(), Value::from(*count));
                if let Some((scryfall_uri, image_uri)) = self.links.get(key) {
                    insert_link(&mut row, scryfall_uri, image_uri);
                }
                row
            })
            .collect()
    }
}

/// Finds the highest numeric collector number printed in each set.
#[derive(Default)]
pub struct MaxCollectorNumberBySetAggregator {
    max_numbers: BTreeMap<String, u64>,
}

impl MaxCollectorNumberBySetAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for MaxCollectorNumberBySetAggregator {
    fn name(&self) -> &str {
        "max_collector_number_by_set"
    }

    fn display_name(&self) -> &str {
        "Maximum Collector Number by Set"
    }

    fn description(&self) -> &str {
        "Highest numeric collector number in each set"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("set", "Set").width(80),
            ColumnDef::new("maxNumber", "Max Collector Number")
                .width(180)
                .numeric()
                .sort_desc(),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let (Some(number), Some(set)) = (&card.collector_number, &card.set) else {
            return;
        };
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return;
        }
        let Ok(number) = number.parse::<u64>() else {
            return;
        };

        let max = self.max_numbers.entry(set.clone()).or_insert(0);
        *max = (*max).max(number);
    }

    fn sorted_rows(&self) -> Vec<Row> {
        let mut entries: Vec<_> = self.max_numbers.iter().collect();
        entries.sort_by_key(|(_, max)| Reverse(**max));

        entries
            .into_iter()
            .map(|(set, max)| row(json!({ "set": set, "maxNumber": max })))
            .collect()
    }
}
