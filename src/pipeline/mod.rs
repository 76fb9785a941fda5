//! Streaming dispatcher.
//!
//! The bulk file is a single JSON array of several hundred megabytes.
//! It is parsed incrementally: one record is materialized at a time and
//! handed to every aggregator before the next is read.

use crate::aggregators::Aggregator;
use crate::models::Card;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 1 << 20;

/// Counts from a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records handed to the aggregators.
    pub cards: u64,
    /// Records that could not be read as a card.
    pub skipped: u64,
}

/// Progress bar measuring bytes, hidden when `show` is false.
pub fn byte_progress_bar(len: u64, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

struct CardSeqVisitor<F> {
    on_card: F,
}

impl<'de, F> Visitor<'de> for CardSeqVisitor<F>
where
    F: FnMut(&Card),
{
    type Value = PipelineStats;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of card objects")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut stats = PipelineStats::default();

        while let Some(value) = seq.next_element::<Value>()? {
            match serde_json::from_value::<Card>(value) {
                Ok(card) => {
                    (self.on_card)(&card);
                    stats.cards += 1;
                }
                Err(e) => {
                    stats.skipped += 1;
                    warn!("Skipping malformed record #{}: {}", stats.cards + stats.skipped, e);
                }
            }
        }

        Ok(stats)
    }
}

/// Stream every card in a JSON array to `on_card`.
///
/// A document that is not an array, or is not valid JSON, is an error.
/// Array elements that are not card objects are skipped with a warning.
pub fn for_each_card<R, F>(reader: R, on_card: F) -> Result<PipelineStats>
where
    R: Read,
    F: FnMut(&Card),
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let stats = deserializer
        .deserialize_seq(CardSeqVisitor { on_card })
        .context("Failed to read card array")?;
    deserializer
        .end()
        .context("Unexpected data after the card array")?;
    Ok(stats)
}

/// Run every aggregator over the bulk file at `path`.
///
/// Aggregators see each card in registration order.
pub fn run_pipeline(
    path: &Path,
    aggregators: &mut [Box<dyn Aggregator>],
    show_progress: bool,
) -> Result<PipelineStats> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open bulk file: {}", path.display()))?;
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);

    info!("Processing {} ({} bytes)", path.display(), len);
    debug!("Running {} aggregators", aggregators.len());

    let pb = byte_progress_bar(len, show_progress);
    let reader = pb.wrap_read(BufReader::with_capacity(READ_BUFFER_SIZE, file));

    let stats = for_each_card(reader, |card| {
        for aggregator in aggregators.iter_mut() {
            aggregator.process_card(card);
        }
    })
    .with_context(|| format!("Failed to process {}", path.display()))?;

    pb.finish_and_clear();

    if stats.skipped > 0 {
        warn!("Skipped {} malformed records", stats.skipped);
    }
    info!("Processed {} cards", stats.cards);

    Ok(stats)
}
