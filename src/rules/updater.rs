//! Fetch the comprehensive rules and extract the type lists.

use crate::config::RulesConfig;
use crate::fetch::retry::{with_retries, Transient, RETRY_BASE_DELAY};
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};

static RULES_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CompRules.*\.txt$").expect("rules link pattern is valid"));

static CREATURE_TYPES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"All other creature types are one word long: (.*?)\.")
        .expect("creature types pattern is valid")
});

static LAND_TYPES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)205\.3i Lands have their own unique set of subtypes; these subtypes are called land types\. The land types are (.*?)\. Of that list",
    )
    .expect("land types pattern is valid")
});

/// The only creature type with a space, listed separately in the rules.
const MULTI_WORD_CREATURE_TYPE: &str = "Time Lord";

/// Errors from the type updater.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Network error while fetching rules page")]
    Network(#[source] reqwest::Error),

    #[error("HTTP error while fetching rules page")]
    Http { status: StatusCode },

    #[error("Request error while fetching rules page")]
    Request(#[source] reqwest::Error),

    #[error("Couldn't find the link to the comprehensive rules text file")]
    NoRulesLink,

    #[error("Failed to download comprehensive rules")]
    DownloadFailed,

    #[error("Couldn't find creature types in the rules")]
    CreatureTypesNotFound,

    #[error("Couldn't find land types in the rules")]
    LandTypesNotFound,
}

impl RulesError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            RulesError::Network(e)
        } else {
            RulesError::Request(e)
        }
    }
}

impl Transient for RulesError {
    fn is_transient(&self) -> bool {
        match self {
            RulesError::Network(_) => true,
            RulesError::Http { status } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Creature and land types listed in the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTypes {
    pub creature_types: BTreeSet<String>,
    pub land_types: BTreeSet<String>,
}

/// Links to the plain-text rules found on the rules page, in page order.
///
/// Relative links are resolved against `base`.
pub fn parse_rules_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| RULES_LINK_RE.is_match(href))
        .filter_map(|href| base.join(href).ok())
        .collect()
}

/// Split a comma-separated rules list, dropping the "and " before the last item.
fn split_type_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|item| item.trim().replace("and ", ""))
        .filter(|item| !item.is_empty())
}

/// Extract the creature and land types from the rules text.
pub fn parse_types(rules_text: &str) -> Result<RuleTypes, RulesError> {
    let text = rules_text.replace('\u{2019}', "'");

    let creature_list = CREATURE_TYPES_RE
        .captures(&text)
        .and_then(|c| c.get(1))
        .ok_or(RulesError::CreatureTypesNotFound)?
        .as_str();

    let mut creature_types: BTreeSet<String> = split_type_list(creature_list).collect();
    creature_types.insert(MULTI_WORD_CREATURE_TYPE.to_string());

    let land_list = LAND_TYPES_RE
        .captures(&text)
        .and_then(|c| c.get(1))
        .ok_or(RulesError::LandTypesNotFound)?
        .as_str();

    let land_types = split_type_list(land_list).collect();

    Ok(RuleTypes {
        creature_types,
        land_types,
    })
}

/// Fetch the rules page, returning its final URL and body.
async fn fetch_rules_page(client: &Client, url: &str) -> Result<(Url, String), RulesError> {
    debug!("Fetching rules page {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(RulesError::from_reqwest)?;

    if !response.status().is_success() {
        return Err(RulesError::Http {
            status: response.status(),
        });
    }

    let final_url = response.url().clone();
    let body = response.text().await.map_err(RulesError::from_reqwest)?;
    Ok((final_url, body))
}

/// Download the first rules text that can be fetched.
async fn download_rules_text(client: &Client, links: &[Url]) -> Result<String, RulesError> {
    for link in links {
        debug!("Downloading rules text from {}", link);

        let response = match client.get(link.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to download {}: {}", link, e);
                continue;
            }
        };

        if !response.status().is_success() {
            warn!("Failed to download {}: HTTP {}", link, response.status());
            continue;
        }

        match response.bytes().await {
            Ok(bytes) => {
                info!("Downloaded comprehensive rules from {}", link);
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) => warn!("Failed to read {}: {}", link, e),
        }
    }

    Err(RulesError::DownloadFailed)
}

/// Fetch the comprehensive rules and extract the type lists.
pub async fn fetch_and_parse_types(
    client: &Client,
    config: &RulesConfig,
) -> Result<RuleTypes, RulesError> {
    let (page_url, html) = with_retries("Fetching rules page", config.retries, RETRY_BASE_DELAY, || {
        fetch_rules_page(client, &config.rules_url)
    })
    .await?;

    let links = parse_rules_links(&html, &page_url);
    if links.is_empty() {
        return Err(RulesError::NoRulesLink);
    }
    debug!("Found {} rules text links", links.len());

    let rules_text = download_rules_text(client, &links).await?;
    parse_types(&rules_text)
}

fn write_table(types: &BTreeSet<String>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut content = types.iter().cloned().collect::<Vec<_>>().join("\n");
    content.push('\n');
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write both tables sorted, one type per line.
pub fn write_type_tables(types: &RuleTypes, creature_types_file: &Path, land_types_file: &Path) -> Result<()> {
    write_table(&types.creature_types, creature_types_file)?;
    write_table(&types.land_types, land_types_file)?;

    info!(
        "Wrote {} creature types to {} and {} land types to {}",
        types.creature_types.len(),
        creature_types_file.display(),
        types.land_types.len(),
        land_types_file.display()
    );
    Ok(())
}
