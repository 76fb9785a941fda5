//! Shared card filtering utilities.
//!
//! Type extraction, printing order, and the predicates aggregators use
//! to decide which cards they consider.

use crate::cards::constants::{
    NON_TRADITIONAL_BORDERS, NON_TRADITIONAL_LAYOUTS, NON_TRADITIONAL_SET_TYPES, PERMANENT_TYPES,
};
use crate::models::{Card, CardFace, SortKey};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

static TYPE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[\w\-']+\b").expect("type word pattern is valid"));

/// Extract the set of types from a type line.
///
/// "Time Lord" is the only multi-word type and is kept together.
pub fn extract_types(type_line: &str) -> BTreeSet<String> {
    let text = type_line.replace("Time Lord", "Time-Lord");
    TYPE_WORD_RE
        .find_iter(&text)
        .map(|m| m.as_str().replace("Time-Lord", "Time Lord"))
        .collect()
}

/// Extract the types printed on a face.
pub fn face_types(face: &CardFace) -> BTreeSet<String> {
    face.type_line.as_deref().map(extract_types).unwrap_or_default()
}

/// Generate the "earliest printing" ordering key for a card.
pub fn sort_key(card: &Card) -> SortKey {
    let collector_number = card.collector_number.clone().unwrap_or_default();
    let digits: String = collector_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    SortKey {
        release_date: card.released_at.unwrap_or(NaiveDate::MAX),
        set: card.set.clone().unwrap_or_default(),
        number: collector_digits_value(&digits),
        collector_number,
    }
}

/// Numeric value of the collector number digits; overlong runs saturate.
fn collector_digits_value(digits: &str) -> u64 {
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Whether a face has every creature type (Changeling or Mistform Ultimus).
pub fn is_all_creature_types(face: &CardFace) -> bool {
    face.name.as_deref() == Some("Mistform Ultimus")
        || face.keywords.iter().any(|k| k == "Changeling")
}

/// Whether a set of types describes a permanent.
pub fn is_permanent(types: &BTreeSet<String>) -> bool {
    PERMANENT_TYPES.iter().any(|t| types.contains(*t))
}

/// Whether a card belongs to the traditional game.
///
/// Memorabilia, un-sets, tokens, emblems, silver/gold borders and the
/// "past" set are excluded.
pub fn is_traditional_card(card: &Card) -> bool {
    let in_list = |value: &Option<String>, list: &[&str]| {
        value.as_deref().is_some_and(|v| list.contains(&v))
    };

    if in_list(&card.set_type, &NON_TRADITIONAL_SET_TYPES) {
        return false;
    }
    if in_list(&card.layout, &NON_TRADITIONAL_LAYOUTS) {
        return false;
    }
    if card.set.as_deref() == Some("past") {
        return false;
    }
    if in_list(&card.border_color, &NON_TRADITIONAL_BORDERS) {
        return false;
    }
    true
}

/// Replace color symbols with generic placeholders in order of appearance.
///
/// `{W}{U}{R}` becomes `{M}{N}{O}`. Costs with all five colors are
/// returned unchanged since there are only four placeholders.
pub fn generalize_mana_cost(mana_cost: &str) -> String {
    const COLORS: &str = "WUBRG";
    const GENERICS: [char; 4] = ['M', 'N', 'O', 'P'];

    let mut color_map: HashMap<char, char> = HashMap::new();
    for c in mana_cost.chars() {
        if COLORS.contains(c) && !color_map.contains_key(&c) {
            match GENERICS.get(color_map.len()) {
                Some(generic) => {
                    color_map.insert(c, *generic);
                }
                None => return mana_cost.to_string(),
            }
        }
    }

    mana_cost
        .chars()
        .map(|c| color_map.get(&c).copied().unwrap_or(c))
        .collect()
}

/// Image URL of the requested size.
///
/// Multi-faced cards use the front face image, falling back to the
/// card-level images. Returns an empty string when none exist.
pub fn card_image_uri(card: &Card, size: &str) -> String {
    let lookup = |uris: &Option<HashMap<String, String>>| {
        uris.as_ref().and_then(|m| m.get(size)).cloned()
    };

    card.card_faces
        .as_ref()
        .and_then(|faces| faces.first())
        .and_then(|face| lookup(&face.image_uris))
        .or_else(|| lookup(&card.image_uris))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn uris(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn printing(released_at: Option<&str>, set: &str, number: &str) -> Card {
        Card {
            released_at: released_at.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            set: Some(set.to_string()),
            collector_number: Some(number.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_types_creature() {
        assert_eq!(
            extract_types("Creature — Human Wizard"),
            types(&["Creature", "Human", "Wizard"])
        );
    }

    #[test]
    fn test_extract_types_time_lord() {
        let result = extract_types("Legendary Creature — Time Lord Doctor");
        assert!(result.contains("Time Lord"));
        assert!(result.contains("Doctor"));
        assert!(!result.contains("Time"));
        assert!(!result.contains("Lord"));
    }

    #[test]
    fn test_extract_types_empty_and_missing() {
        assert!(extract_types("").is_empty());
        assert!(face_types(&CardFace::default()).is_empty());
    }

    #[test]
    fn test_extract_types_hyphen_and_apostrophe() {
        let result = extract_types("Land — Urza's Power-Plant");
        assert_eq!(result, types(&["Land", "Urza's", "Power-Plant"]));
    }

    #[test]
    fn test_sort_key_normal() {
        let key = sort_key(&printing(Some("1993-08-05"), "lea", "161"));
        assert_eq!(key.release_date, NaiveDate::from_ymd_opt(1993, 8, 5).unwrap());
        assert_eq!(key.set, "lea");
        assert_eq!(key.number, 161);
        assert_eq!(key.collector_number, "161");
    }

    #[test]
    fn test_sort_key_collector_number_with_letters() {
        let key = sort_key(&printing(Some("2020-01-01"), "thb", "12a"));
        assert_eq!(key.number, 12);
        assert_eq!(key.collector_number, "12a");
    }

    #[test]
    fn test_sort_key_missing_values() {
        let key = sort_key(&Card::default());
        assert_eq!(key.release_date, NaiveDate::MAX);
        assert_eq!(key.number, 0);
        assert_eq!(key.collector_number, "");

        let key = sort_key(&printing(Some("2020-01-01"), "plist", "★"));
        assert_eq!(key.number, 0);
    }

    #[test]
    fn test_sort_key_overlong_collector_number() {
        let huge = sort_key(&printing(Some("2020-01-01"), "unk", "123456789012345678901234"));
        assert_eq!(huge.number, u64::MAX);

        let small = sort_key(&printing(Some("2020-01-01"), "unk", "99"));
        assert!(small < huge);
    }

    #[test]
    fn test_sort_key_ordering() {
        let mut keys = vec![
            sort_key(&printing(None, "aaa", "1")),
            sort_key(&printing(Some("1994-01-01"), "leb", "2")),
            sort_key(&printing(Some("1993-08-05"), "lea", "10")),
            sort_key(&printing(Some("1993-08-05"), "lea", "9")),
        ];
        keys.sort();
        let order: Vec<_> = keys.iter().map(|k| k.collector_number.as_str()).collect();
        assert_eq!(order, vec!["9", "10", "2", "1"]);
    }

    #[test]
    fn test_is_all_creature_types() {
        let mistform = CardFace {
            name: Some("Mistform Ultimus".to_string()),
            ..Default::default()
        };
        let changeling = CardFace {
            keywords: vec!["Changeling".to_string()],
            ..Default::default()
        };
        let bear = CardFace {
            name: Some("Grizzly Bears".to_string()),
            ..Default::default()
        };
        assert!(is_all_creature_types(&mistform));
        assert!(is_all_creature_types(&changeling));
        assert!(!is_all_creature_types(&bear));
    }

    #[test]
    fn test_is_permanent() {
        assert!(is_permanent(&extract_types("Artifact — Equipment")));
        assert!(is_permanent(&extract_types("Legendary Planeswalker — Jace")));
        assert!(is_permanent(&extract_types("Basic Land — Forest")));
        assert!(!is_permanent(&extract_types("Instant")));
        assert!(!is_permanent(&extract_types("Sorcery")));
    }

    #[test]
    fn test_is_traditional_card() {
        let base = Card {
            set: Some("lea".to_string()),
            set_type: Some("core".to_string()),
            layout: Some("normal".to_string()),
            border_color: Some("black".to_string()),
            ..Default::default()
        };
        assert!(is_traditional_card(&base));

        let funny = Card {
            set_type: Some("funny".to_string()),
            ..base.clone()
        };
        assert!(!is_traditional_card(&funny));

        let token = Card {
            layout: Some("token".to_string()),
            ..base.clone()
        };
        assert!(!is_traditional_card(&token));

        let past = Card {
            set: Some("past".to_string()),
            ..base.clone()
        };
        assert!(!is_traditional_card(&past));

        let silver = Card {
            border_color: Some("silver".to_string()),
            ..base.clone()
        };
        assert!(!is_traditional_card(&silver));
    }

    #[test]
    fn test_generalize_mana_cost() {
        assert_eq!(generalize_mana_cost("{2}"), "{2}");
        assert_eq!(generalize_mana_cost("{W}{W}"), "{M}{M}");
        assert_eq!(generalize_mana_cost("{W}{U}{R}"), "{M}{N}{O}");
        assert_eq!(generalize_mana_cost("{3}{R}{R}"), "{3}{M}{M}");
        assert_eq!(generalize_mana_cost("{C}"), "{C}");
    }

    #[test]
    fn test_generalize_mana_cost_five_colors() {
        assert_eq!(generalize_mana_cost("{W}{U}{B}{R}{G}"), "{W}{U}{B}{R}{G}");
    }

    #[test]
    fn test_generalize_mana_cost_hybrid_and_phyrexian() {
        assert_eq!(generalize_mana_cost("{2/W}{2/U}"), "{2/M}{2/N}");
        assert_eq!(generalize_mana_cost("{W/P}{W/U}{2/W}"), "{M/P}{M/N}{2/M}");
    }

    #[test]
    fn test_card_image_uri_single_faced() {
        let card = Card {
            image_uris: uris(&[
                ("small", "https://example.com/small.jpg"),
                ("normal", "https://example.com/normal.jpg"),
            ]),
            ..Default::default()
        };
        assert_eq!(card_image_uri(&card, "normal"), "https://example.com/normal.jpg");
        assert_eq!(card_image_uri(&card, "small"), "https://example.com/small.jpg");
        assert_eq!(card_image_uri(&card, "large"), "");
    }

    #[test]
    fn test_card_image_uri_double_faced() {
        let card = Card {
            card_faces: Some(vec![
                CardFace {
                    image_uris: uris(&[("normal", "https://example.com/front.jpg")]),
                    ..Default::default()
                },
                CardFace {
                    image_uris: uris(&[("normal", "https://example.com/back.jpg")]),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        assert_eq!(card_image_uri(&card, "normal"), "https://example.com/front.jpg");
    }

    #[test]
    fn test_card_image_uri_face_fallback() {
        let card = Card {
            card_faces: Some(vec![CardFace {
                name: Some("Front".to_string()),
                ..Default::default()
            }]),
            image_uris: uris(&[("normal", "https://example.com/fallback.jpg")]),
            ..Default::default()
        };
        assert_eq!(card_image_uri(&card, "normal"), "https://example.com/fallback.jpg");
        assert_eq!(card_image_uri(&Card::default(), "normal"), "");
    }
}
