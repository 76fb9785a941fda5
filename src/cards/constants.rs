//! Static classification tables shared by the aggregators.

use chrono::NaiveDate;

/// The five basic land types.
pub const BASIC_LAND_TYPES: [&str; 5] = ["Forest", "Island", "Mountain", "Plains", "Swamp"];

/// Card types that make a card a permanent.
pub const PERMANENT_TYPES: [&str; 6] = [
    "Artifact",
    "Battle",
    "Creature",
    "Enchantment",
    "Land",
    "Planeswalker",
];

pub const NON_TRADITIONAL_SET_TYPES: [&str; 2] = ["memorabilia", "funny"];
pub const NON_TRADITIONAL_LAYOUTS: [&str; 2] = ["emblem", "token"];
pub const NON_TRADITIONAL_BORDERS: [&str; 2] = ["silver", "gold"];

/// Promo types that denote a distinct foiling treatment.
pub const FOIL_PROMO_TYPES: [&str; 16] = [
    "confettifoil",
    "doublerainbow",
    "embossed",
    "galaxyfoil",
    "gilded",
    "halofoil",
    "invisibleink",
    "neonink",
    "oilslick",
    "rainbowfoil",
    "raisedfoil",
    "ripplefoil",
    "silverfoil",
    "stepandcompleat",
    "surgefoil",
    "textured",
];

/// Sets whose every printing carries one special foil treatment.
pub const SPECIAL_FOIL_SETS: [(&str, &str); 5] = [
    ("mps", "inventions"),
    ("mp2", "invocations"),
    ("exp", "expedition"),
    ("psus", "sunburst"),
    ("dbl", "silverscreen"),
];

/// Release date of Eighth Edition, when the modern foil process started.
pub fn modern_foil_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2003, 7, 28).unwrap_or(NaiveDate::MIN)
}

/// Looks up the foil label for a special foil set.
pub fn special_foil_label(set: &str) -> Option<&'static str> {
    SPECIAL_FOIL_SETS
        .iter()
        .find(|(code, _)| *code == set)
        .map(|(_, label)| *label)
}
