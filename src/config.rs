//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `card_aggregator.toml` files.

use crate::aggregators::BUILTIN_REPORT_NAMES;
use crate::models::CardField;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Report name taken by the navigation index page.
pub const INDEX_REPORT_NAME: &str = "index";

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "card_aggregator.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Bulk data download settings.
    #[serde(default)]
    pub download: DownloadConfig,

    /// Comprehensive rules settings.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Aggregator inputs and count reports.
    #[serde(default)]
    pub aggregators: AggregatorsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Folder holding bulk files and generated output.
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            verbose: false,
        }
    }
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("data")
}

/// Bulk data download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Bulk data index endpoint.
    #[serde(default = "default_bulk_data_url")]
    pub bulk_data_url: String,

    /// Bulk data entry to download.
    #[serde(default = "default_bulk_type")]
    pub bulk_type: String,

    /// Request timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on failure.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            bulk_data_url: default_bulk_data_url(),
            bulk_type: default_bulk_type(),
            timeout_seconds: default_download_timeout(),
            retries: default_retries(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_bulk_data_url() -> String {
    "https://api.scryfall.com/bulk-data".to_string()
}

fn default_bulk_type() -> String {
    "default_cards".to_string()
}

fn default_download_timeout() -> u64 {
    600 // the default cards file is several hundred megabytes
}

fn default_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("card-aggregator/{}", env!("CARGO_PKG_VERSION"))
}

/// Comprehensive rules settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Page linking to the comprehensive rules text file.
    #[serde(default = "default_rules_url")]
    pub rules_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_rules_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules_url: default_rules_url(),
            timeout_seconds: default_rules_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_rules_url() -> String {
    "https://magic.wizards.com/en/rules".to_string()
}

fn default_rules_timeout() -> u64 {
    60
}

/// Aggregator inputs and configurable count reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorsConfig {
    /// One creature type per line.
    #[serde(default = "default_creature_types_file")]
    pub creature_types_file: PathBuf,

    /// One land type per line.
    #[serde(default = "default_land_types_file")]
    pub land_types_file: PathBuf,

    /// Supercycle definitions (YAML or JSON).
    #[serde(default = "default_supercycles_file")]
    pub supercycles_file: PathBuf,

    /// Count reports, in report order.
    #[serde(default = "default_counts")]
    pub counts: Vec<CountReportConfig>,
}

impl Default for AggregatorsConfig {
    fn default() -> Self {
        Self {
            creature_types_file: default_creature_types_file(),
            land_types_file: default_land_types_file(),
            supercycles_file: default_supercycles_file(),
            counts: default_counts(),
        }
    }
}

impl AggregatorsConfig {
    /// Check that every count report name is usable as an output file stem.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, count) in self.counts.iter().enumerate() {
            let name = count.name.as_str();
            let entry = format!("aggregators.counts[{}] (name = {:?})", index, name);

            if name.is_empty() || name == "." || name == ".." {
                bail!("{}: report name is not a valid file name", entry);
            }
            if name.contains(['/', '\\']) {
                bail!("{}: report name must not contain path separators", entry);
            }
            if name == INDEX_REPORT_NAME || BUILTIN_REPORT_NAMES.contains(&name) {
                bail!("{}: report name is reserved", entry);
            }
            if !seen.insert(name) {
                bail!("{}: duplicate report name", entry);
            }
        }

        Ok(())
    }
}

fn default_creature_types_file() -> PathBuf {
    PathBuf::from("data/all_creature_types.txt")
}

fn default_land_types_file() -> PathBuf {
    PathBuf::from("data/all_land_types.txt")
}

fn default_supercycles_file() -> PathBuf {
    PathBuf::from("data/supercycles.yaml")
}

/// A count report grouped by one or more card fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountReportConfig {
    pub name: String,
    pub display_name: String,
    pub key_fields: Vec<CardField>,

    /// Count each finish instead of each printing.
    #[serde(default)]
    pub count_finishes: bool,

    #[serde(default)]
    pub description: String,
}

impl CountReportConfig {
    fn new(name: &str, display_name: &str, key_fields: &[CardField], count_finishes: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            key_fields: key_fields.to_vec(),
            count_finishes,
            description: description.to_string(),
        }
    }
}

fn default_counts() -> Vec<CountReportConfig> {
    vec![
        CountReportConfig::new(
            "cards_by_name",
            "Cards by Name",
            &[CardField::Name],
            false,
            "Number of printings of each card",
        ),
        CountReportConfig::new(
            "finishes_by_name",
            "Finishes by Name",
            &[CardField::Name],
            true,
            "Number of finishes each card has been printed in",
        ),
        CountReportConfig::new(
            "cards_by_set_name",
            "Cards by Set and Name",
            &[CardField::Set, CardField::Name],
            false,
            "Number of printings of each card within a set",
        ),
        CountReportConfig::new(
            "finishes_by_set_name",
            "Finishes by Set and Name",
            &[CardField::Set, CardField::Name],
            true,
            "Number of finishes of each card within a set",
        ),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .aggregators
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_folder) = args.data_folder {
            self.general.data_folder = data_folder.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Folder that run outputs are written under.
    pub fn output_root(&self) -> PathBuf {
        self.general.data_folder.join("output")
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_folder, PathBuf::from("data"));
        assert_eq!(config.download.bulk_type, "default_cards");
        assert_eq!(config.download.timeout_seconds, 600);
        assert_eq!(config.rules.retries, 3);
        assert_eq!(config.aggregators.counts.len(), 4);
        assert_eq!(config.aggregators.counts[1].name, "finishes_by_name");
        assert!(config.aggregators.counts[1].count_finishes);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_folder = "/tmp/cards"
verbose = true

[download]
retries = 5

[aggregators]
supercycles_file = "cycles.json"

[[aggregators.counts]]
name = "cards_by_artist"
display_name = "Cards by Artist"
key_fields = ["artist"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_folder, PathBuf::from("/tmp/cards"));
        assert!(config.general.verbose);
        assert_eq!(config.download.retries, 5);
        assert_eq!(config.download.bulk_data_url, "https://api.scryfall.com/bulk-data");
        assert_eq!(config.aggregators.supercycles_file, PathBuf::from("cycles.json"));
        assert_eq!(
            config.aggregators.land_types_file,
            PathBuf::from("data/all_land_types.txt")
        );

        let counts = &config.aggregators.counts;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].key_fields, vec![CardField::Artist]);
        assert!(!counts[0].count_finishes);
    }

    #[test]
    fn test_unknown_key_field_is_rejected() {
        let toml_content = r#"
[[aggregators.counts]]
name = "bad"
display_name = "Bad"
key_fields = ["color"]
"#;
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    fn counts_config(names: &[&str]) -> AggregatorsConfig {
        AggregatorsConfig {
            counts: names
                .iter()
                .map(|name| CountReportConfig::new(name, "Report", &[CardField::Name], false, ""))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_counts_are_valid() {
        assert!(AggregatorsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_duplicate_count_name_is_rejected() {
        let err = counts_config(&["by_artist", "by_rarity", "by_artist"])
            .validate()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("aggregators.counts[2]"));
        assert!(message.contains("duplicate"));
    }

    #[test]
    fn test_index_count_name_is_rejected() {
        let err = counts_config(&["index"]).validate().unwrap_err();
        assert!(err.to_string().contains("\"index\""));
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_builtin_count_name_is_rejected() {
        for name in BUILTIN_REPORT_NAMES {
            let err = counts_config(&["by_artist", *name]).validate().unwrap_err();
            assert!(err.to_string().contains("aggregators.counts[1]"));
            assert!(err.to_string().contains("reserved"));
        }
    }

    #[test]
    fn test_count_name_with_path_separator_is_rejected() {
        for name in ["../escape", "nested/report", "nested\\report", "..", ""] {
            assert!(counts_config(&[name]).validate().is_err(), "{:?} accepted", name);
        }
    }

    #[test]
    fn test_load_rejects_reserved_count_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"
[[aggregators.counts]]
name = "max_collector_number_by_set"
display_name = "Shadow"
key_fields = ["set"]
"#,
        )
        .unwrap();

        let err = Config::load(file.path()).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Invalid config file"));
        assert!(chain.contains("max_collector_number_by_set"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/nonexistent/card_aggregator.toml")).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = Args {
            config: None,
            data_folder: Some(PathBuf::from("elsewhere")),
            verbose: true,
            quiet: false,
            command: Command::Download,
        };

        config.merge_with_args(&args);
        assert_eq!(config.general.data_folder, PathBuf::from("elsewhere"));
        assert!(config.general.verbose);
        assert_eq!(config.output_root(), PathBuf::from("elsewhere/output"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[download]"));
        assert!(toml_str.contains("[rules]"));
        assert!(toml_str.contains("[[aggregators.counts]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.aggregators.counts, Config::default().aggregators.counts);
    }
}
