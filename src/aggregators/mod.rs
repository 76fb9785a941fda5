//! Aggregators over the card stream.
//!
//! Each aggregator is an independent stateful reducer: it sees every
//! card once via [`Aggregator::process_card`] and produces a sorted
//! table of rows for the renderer.

pub mod count;
pub mod first_card;
pub mod metadata;
pub mod supercycle;
pub mod types;

pub use count::{CountAggregator, MaxCollectorNumberBySetAggregator};
pub use first_card::{FirstCardByGeneralizedManaCostAggregator, FirstCardByPowerToughnessAggregator};
pub use metadata::{
    CountCardIllustrationsBySetAggregator, FoilTypesAggregator, PromoTypesAggregator,
};
pub use supercycle::SupercycleTimeAggregator;
pub use types::{MaximalTypesAggregator, TypeTables};

use crate::config::AggregatorsConfig;
use crate::models::Card;
use serde::Serialize;
use serde_json::{Map, Value};

/// A single output row, serialized as a JSON object.
pub type Row = Map<String, Value>;

/// Column definition consumed by the data grid in the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub field: String,
    pub header_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_renderer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_link_data: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wrap_text: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_height: bool,
}

impl ColumnDef {
    pub fn new(field: &str, header_name: &str) -> Self {
        Self {
            field: field.to_string(),
            header_name: header_name.to_string(),
            width: None,
            column_type: None,
            sort: None,
            cell_renderer: None,
            card_link_data: None,
            wrap_text: false,
            auto_height: false,
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Right-aligned numeric column.
    pub fn numeric(mut self) -> Self {
        self.column_type = Some("numericColumn".to_string());
        self
    }

    /// Initial descending sort in the grid.
    pub fn sort_desc(mut self) -> Self {
        self.sort = Some("desc".to_string());
        self
    }

    /// Render the cell as a link to the card, with an image tooltip.
    pub fn card_link(mut self) -> Self {
        self.cell_renderer = Some("cardLinkRenderer".to_string());
        self
    }

    /// Render a list of cards taken from another row field.
    pub fn card_links_from(mut self, field: &str) -> Self {
        self.cell_renderer = Some("cardLinkRenderer".to_string());
        self.card_link_data = Some(field.to_string());
        self.wrap_text = true;
        self.auto_height = true;
        self
    }
}

/// A stateful reducer over the card stream.
pub trait Aggregator {
    /// File stem for this aggregator's outputs.
    fn name(&self) -> &str;

    /// Human-readable title.
    fn display_name(&self) -> &str;

    /// One-line summary shown in the navigation index.
    fn description(&self) -> &str {
        ""
    }

    /// Longer explanation shown above the table.
    fn explanation(&self) -> &str {
        ""
    }

    /// Grid column definitions.
    fn columns(&self) -> Vec<ColumnDef>;

    /// Fold one card into the aggregator state.
    fn process_card(&mut self, card: &Card);

    /// The result table in display order.
    fn sorted_rows(&self) -> Vec<Row>;

    /// Problems noticed while loading inputs or building rows.
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Insert the link fields every card-linked row carries.
pub(crate) fn insert_link(row: &mut Row, scryfall_uri: &str, image_uri: &str) {
    row.insert("scryfall_uri".to_string(), Value::from(scryfall_uri));
    row.insert("image_uri".to_string(), Value::from(image_uri));
}

/// Convert a `json!` object literal into a [`Row`].
pub(crate) fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Output names of the aggregators that are always registered.
pub const BUILTIN_REPORT_NAMES: &[&str] = &[
    "max_collector_number_by_set",
    "first_card_by_power_toughness",
    "first_card_by_generalized_mana_cost",
    "count_card_illustrations_by_set",
    "promo_types_by_name",
    "foil_types_by_name",
    "supercycle_completion_time",
    "maximal_printed_types",
    "maximal_types_with_effects",
];

/// Build the full aggregator set in report order.
pub fn build_aggregators(config: &AggregatorsConfig) -> Vec<Box<dyn Aggregator>> {
    let mut aggregators: Vec<Box<dyn Aggregator>> = Vec::new();

    for count in &config.counts {
        aggregators.push(Box::new(CountAggregator::new(
            &count.name,
            &count.display_name,
            count.key_fields.clone(),
            count.count_finishes,
            &count.description,
        )));
    }

    aggregators.push(Box::new(MaxCollectorNumberBySetAggregator::new()));
    aggregators.push(Box::new(FirstCardByPowerToughnessAggregator::new()));
    aggregators.push(Box::new(FirstCardByGeneralizedManaCostAggregator::new()));
    aggregators.push(Box::new(CountCardIllustrationsBySetAggregator::new()));
    aggregators.push(Box::new(PromoTypesAggregator::new()));
    aggregators.push(Box::new(FoilTypesAggregator::new()));
    aggregators.push(Box::new(SupercycleTimeAggregator::from_file(
        &config.supercycles_file,
    )));

    let tables = TypeTables::load(&config.creature_types_file, &config.land_types_file);
    aggregators.push(Box::new(MaximalTypesAggregator::printed(tables.clone())));
    aggregators.push(Box::new(MaximalTypesAggregator::with_effects(tables)));

    aggregators
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_column_def_serialization() {
        let col = ColumnDef::new("count", "Count").width(100).numeric().sort_desc();
        let value = serde_json::to_value(&col).unwrap();
        assert_eq!(
            value,
            json!({
                "field": "count",
                "headerName": "Count",
                "width": 100,
                "type": "numericColumn",
                "sort": "desc"
            })
        );
    }

    #[test]
    fn test_column_def_card_links() {
        let col = ColumnDef::new("cards", "Cards").card_links_from("cardObjects");
        let value = serde_json::to_value(&col).unwrap();
        assert_eq!(value["cellRenderer"], "cardLinkRenderer");
        assert_eq!(value["cardLinkData"], "cardObjects");
        assert_eq!(value["wrapText"], true);
        assert_eq!(value["autoHeight"], true);
    }

    #[test]
    fn test_build_aggregators_unique_names() {
        let config = AggregatorsConfig {
            creature_types_file: PathBuf::from("/nonexistent/creatures.txt"),
            land_types_file: PathBuf::from("/nonexistent/lands.txt"),
            supercycles_file: PathBuf::from("/nonexistent/supercycles.yaml"),
            ..Default::default()
        };

        let aggregators = build_aggregators(&config);
        let mut names: Vec<_> = aggregators.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names.len(), 13);

        assert_eq!(&names[4..], BUILTIN_REPORT_NAMES);

        names.sort();
        names.dedup();
        assert_eq!(names.len(), 13);
    }
}
