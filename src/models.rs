//! Data models for bulk card records.
//!
//! This module contains the card representation deserialized from the
//! bulk file, along with the field selectors and ordering keys used by
//! the aggregators.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single printing from the bulk data file.
///
/// Every field is optional; unknown fields in the record are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub set_type: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    /// Release date; unparseable values are treated as missing.
    #[serde(default, deserialize_with = "lenient_date")]
    pub released_at: Option<NaiveDate>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub finishes: Vec<String>,
    #[serde(default)]
    pub promo_types: Vec<String>,
    #[serde(default)]
    pub illustration_id: Option<String>,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
    #[serde(default)]
    pub image_uris: Option<HashMap<String, String>>,
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardFace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub image_uris: Option<HashMap<String, String>>,
}

impl CardFace {
    /// Builds a face view of a single-faced card.
    pub fn from_card(card: &Card) -> Self {
        Self {
            name: card.name.clone(),
            type_line: card.type_line.clone(),
            keywords: card.keywords.clone(),
            image_uris: card.image_uris.clone(),
        }
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
}

impl Card {
    /// Release date formatted as `YYYY-MM-DD`, or empty when unknown.
    pub fn release_date_string(&self) -> String {
        self.released_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Returns the value of a string field used as a grouping key.
    pub fn field(&self, field: CardField) -> Option<String> {
        match field {
            CardField::Name => self.name.clone(),
            CardField::Set => self.set.clone(),
            CardField::SetName => self.set_name.clone(),
            CardField::SetType => self.set_type.clone(),
            CardField::Rarity => self.rarity.clone(),
            CardField::Layout => self.layout.clone(),
            CardField::BorderColor => self.border_color.clone(),
            CardField::Lang => self.lang.clone(),
            CardField::CollectorNumber => self.collector_number.clone(),
            CardField::ReleasedAt => self.released_at.map(|_| self.release_date_string()),
            CardField::TypeLine => self.type_line.clone(),
            CardField::ManaCost => self.mana_cost.clone(),
            CardField::Artist => self.artist.clone(),
        }
    }

    /// The faces to analyze: each entry of `card_faces`, or the card itself.
    pub fn faces(&self) -> Vec<CardFace> {
        match &self.card_faces {
            Some(faces) => faces.clone(),
            None => vec![CardFace::from_card(self)],
        }
    }
}

/// A card field that count reports can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Name,
    Set,
    SetName,
    SetType,
    Rarity,
    Layout,
    BorderColor,
    Lang,
    CollectorNumber,
    ReleasedAt,
    TypeLine,
    ManaCost,
    Artist,
}

impl CardField {
    /// The snake_case key used in configuration and row output.
    pub fn key(&self) -> &'static str {
        match self {
            CardField::Name => "name",
            CardField::Set => "set",
            CardField::SetName => "set_name",
            CardField::SetType => "set_type",
            CardField::Rarity => "rarity",
            CardField::Layout => "layout",
            CardField::BorderColor => "border_color",
            CardField::Lang => "lang",
            CardField::CollectorNumber => "collector_number",
            CardField::ReleasedAt => "released_at",
            CardField::TypeLine => "type_line",
            CardField::ManaCost => "mana_cost",
            CardField::Artist => "artist",
        }
    }

    /// Column header, e.g. `set_name` becomes `Set Name`.
    pub fn header(&self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Ordering key for "earliest printing" comparisons.
///
/// Fields compare in declaration order: release date (missing dates sort
/// last), set code, numeric part of the collector number, raw collector
/// number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub release_date: NaiveDate,
    pub set: String,
    pub number: u64,
    pub collector_number: String,
}

/// Link data kept for a printing shown in a report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardLink {
    pub name: String,
    pub scryfall_uri: String,
    pub image_uri: String,
}

/// A compact copy of the printing an aggregator retains.
#[derive(Debug, Clone)]
pub struct Printing {
    pub name: String,
    pub set: String,
    pub release_date: String,
    pub mana_cost: String,
    pub type_line: String,
    pub scryfall_uri: String,
    pub image_uri: String,
    pub sort_key: SortKey,
}

impl Printing {
    /// Captures the fields report rows need from a card.
    pub fn from_card(card: &Card) -> Self {
        Self {
            name: card.name.clone().unwrap_or_default(),
            set: card.set.clone().unwrap_or_default(),
            release_date: card.release_date_string(),
            mana_cost: card.mana_cost.clone().unwrap_or_default(),
            type_line: card.type_line.clone().unwrap_or_default(),
            scryfall_uri: card.scryfall_uri.clone().unwrap_or_default(),
            image_uri: crate::cards::card_image_uri(card, "normal"),
            sort_key: crate::cards::sort_key(card),
        }
    }
}
