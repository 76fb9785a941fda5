//! Supercycle completion times.
//!
//! A supercycle is a named group of cards printed across many sets. This
//! aggregator tracks the first release of every card and reports how long
//! each cycle took (or has been taking) to complete.

use crate::aggregators::{row, Aggregator, ColumnDef, Row};
use crate::cards::card_image_uri;
use crate::models::{Card, CardLink};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error};

/// A supercycle definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Supercycle {
    pub name: String,
    pub cards: Vec<String>,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Deserialize)]
struct SupercycleFile {
    supercycles: Vec<Supercycle>,
}

/// Load supercycle definitions from YAML (`.yaml`/`.yml`) or JSON.
pub fn load_supercycles(path: &Path) -> Result<Vec<Supercycle>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to load supercycles from {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let file: SupercycleFile = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse supercycles file {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse supercycles file {}", path.display()))?
    };

    Ok(file.supercycles)
}

/// Format a day count as "N years, N months, N days".
///
/// Uses 365-day years and 30-day months; zero parts are omitted.
pub fn format_time_difference(days: i64) -> String {
    let years = days / 365;
    let remaining = days % 365;
    let months = remaining / 30;
    let days = remaining % 30;

    let plural = |n: i64, unit: &str| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" });

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(plural(years, "year"));
    }
    if months > 0 {
        parts.push(plural(months, "month"));
    }
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    parts.join(", ")
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Tracks completion times for card supercycles.
pub struct SupercycleTimeAggregator {
    supercycles: Vec<Supercycle>,
    first_printed: HashMap<String, (NaiveDate, CardLink)>,
    today: NaiveDate,
    load_warnings: Vec<String>,
}

impl SupercycleTimeAggregator {
    pub fn new(supercycles: Vec<Supercycle>) -> Self {
        Self {
            supercycles,
            first_printed: HashMap::new(),
            today: Local::now().date_naive(),
            load_warnings: Vec::new(),
        }
    }

    /// Load definitions from a file; failures leave the aggregator empty.
    pub fn from_file(path: &Path) -> Self {
        match load_supercycles(path) {
            Ok(supercycles) => {
                debug!("Loaded {} supercycles from {}", supercycles.len(), path.display());
                Self::new(supercycles)
            }
            Err(e) => {
                error!("{:#}", e);
                let mut aggregator = Self::new(Vec::new());
                aggregator.load_warnings.push(format!("Error: {:#}", e));
                aggregator
            }
        }
    }

    /// Override the date unfinished cycles are measured up to.
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn build(&self) -> (Vec<Row>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut results = Vec::new();

        for cycle in &self.supercycles {
            let dates: Vec<NaiveDate> = cycle
                .cards
                .iter()
                .filter_map(|card| self.first_printed.get(card).map(|(date, _)| *date))
                .collect();
            let (Some(earliest), Some(latest)) = (dates.iter().min(), dates.iter().max()) else {
                warnings.push(format!(
                    "Supercycle '{}' has no processed card data",
                    cycle.name
                ));
                continue;
            };
            let end = if cycle.finished { *latest } else { self.today };
            let days = (end - *earliest).num_days();

            let mut card_objects = Vec::new();
            for card_name in &cycle.cards {
                match self.first_printed.get(card_name) {
                    Some((_, link)) => card_objects.push(link.clone()),
                    None => warnings.push(format!(
                        "Supercycle '{}' references card '{}' with no processed data",
                        cycle.name, card_name
                    )),
                }
            }

            let (status, end_date) = if cycle.finished {
                ("Finished", long_date(end))
            } else {
                ("Unfinished", "Ongoing".to_string())
            };

            let row = row(json!({
                "supercycle": cycle.name,
                "status": status,
                "cards": cycle.cards.join(", "),
                "cardObjects": card_objects,
                "time": format_time_difference(days),
                "startDate": long_date(*earliest),
                "endDate": end_date,
                "days": days,
            }));
            results.push((days, row));
        }

        results.sort_by_key(|(days, _)| Reverse(*days));
        (results.into_iter().map(|(_, row)| row).collect(), warnings)
    }
}

impl Aggregator for SupercycleTimeAggregator {
    fn name(&self) -> &str {
        "supercycle_completion_time"
    }

    fn display_name(&self) -> &str {
        "Supercycle Completion Times"
    }

    fn description(&self) -> &str {
        "Time to complete supercycles"
    }

    fn explanation(&self) -> &str {
        "Learn more about supercycles on the <a href=\"https://mtg.fandom.com/wiki/Mega_mega_cycle\" \
         target=\"_blank\" rel=\"noopener noreferrer\">MTG Wiki</a>."
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("supercycle", "Supercycle").width(220),
            ColumnDef::new("status", "Status").width(100),
            ColumnDef::new("cards", "Cards")
                .width(280)
                .card_links_from("cardObjects"),
            ColumnDef::new("time", "Time").width(150),
            ColumnDef::new("startDate", "Start Date").width(120),
            ColumnDef::new("endDate", "End Date").width(120),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        let (Some(name), Some(released_at)) = (&card.name, card.released_at) else {
            return;
        };

        let is_earlier = self
            .first_printed
            .get(name)
            .map_or(true, |(date, _)| released_at < *date);
        if is_earlier {
            let link = CardLink {
                name: name.clone(),
                scryfall_uri: card.scryfall_uri.clone().unwrap_or_default(),
                image_uri: card_image_uri(card, "normal"),
            };
            self.first_printed.insert(name.clone(), (released_at, link));
        }
    }

    fn sorted_rows(&self) -> Vec<Row> {
        self.build().0
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = self.load_warnings.clone();
        warnings.extend(self.build().1);
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn printed(name: &str, date: &str) -> Card {
        Card {
            name: Some(name.to_string()),
            released_at: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            scryfall_uri: Some(format!("https://scryfall.com/{}", name)),
            ..Default::default()
        }
    }

    fn cycle(name: &str, cards: &[&str], finished: bool) -> Supercycle {
        Supercycle {
            name: name.to_string(),
            cards: cards.iter().map(|s| s.to_string()).collect(),
            finished,
        }
    }

    #[test]
    fn test_format_time_difference() {
        assert_eq!(format_time_difference(0), "");
        assert_eq!(format_time_difference(1), "1 day");
        assert_eq!(format_time_difference(31), "1 month, 1 day");
        assert_eq!(format_time_difference(365), "1 year");
        assert_eq!(format_time_difference(800), "2 years, 2 months, 10 days");
    }

    #[test]
    fn test_finished_cycle() {
        let mut agg = SupercycleTimeAggregator::new(vec![cycle("Pair", &["A", "B"], true)]);
        agg.process_card(&printed("A", "2000-01-01"));
        agg.process_card(&printed("B", "2001-01-01"));
        agg.process_card(&printed("B", "2005-01-01"));

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "Finished");
        assert_eq!(rows[0]["days"], 366);
        assert_eq!(rows[0]["time"], "1 year, 1 day");
        assert_eq!(rows[0]["startDate"], "January 01, 2000");
        assert_eq!(rows[0]["endDate"], "January 01, 2001");
        assert_eq!(rows[0]["cardObjects"][1]["name"], "B");
        assert!(agg.warnings().is_empty());
    }

    #[test]
    fn test_unfinished_cycle_measured_to_today() {
        let today = NaiveDate::from_ymd_opt(2000, 1, 11).unwrap();
        let mut agg =
            SupercycleTimeAggregator::new(vec![cycle("Open", &["A", "Missing"], false)])
                .with_today(today);
        agg.process_card(&printed("A", "2000-01-01"));

        let rows = agg.sorted_rows();
        assert_eq!(rows[0]["status"], "Unfinished");
        assert_eq!(rows[0]["endDate"], "Ongoing");
        assert_eq!(rows[0]["days"], 10);

        let warnings = agg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Missing"));
    }

    #[test]
    fn test_cycles_sorted_by_duration_and_empty_skipped() {
        let mut agg = SupercycleTimeAggregator::new(vec![
            cycle("Short", &["A", "B"], true),
            cycle("Long", &["C", "D"], true),
            cycle("Unknown", &["X"], true),
        ]);
        for (name, date) in [
            ("A", "2000-01-01"),
            ("B", "2000-02-01"),
            ("C", "2000-01-01"),
            ("D", "2010-01-01"),
        ] {
            agg.process_card(&printed(name, date));
        }

        let rows = agg.sorted_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["supercycle"], "Long");
        assert_eq!(rows[1]["supercycle"], "Short");

        let warnings = agg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Unknown"));
    }

    #[test]
    fn test_load_yaml_and_json() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            yaml,
            "supercycles:\n  - name: Pair\n    cards: [A, B]\n    finished: true\n"
        )
        .unwrap();
        let cycles = load_supercycles(yaml.path()).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cards, vec!["A", "B"]);
        assert!(cycles[0].finished);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(
            json,
            r#"{{"supercycles": [{{"name": "Pair", "cards": ["A"]}}]}}"#
        )
        .unwrap();
        let cycles = load_supercycles(json.path()).unwrap();
        assert!(!cycles[0].finished);
    }

    #[test]
    fn test_unreadable_file_is_a_warning() {
        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "not json").unwrap();

        let agg = SupercycleTimeAggregator::from_file(broken.path());
        assert!(agg.sorted_rows().is_empty());
        assert_eq!(agg.warnings().len(), 1);
    }
}
