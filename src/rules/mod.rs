//! Comprehensive rules type updater.
//!
//! The creature and land type tables used by the type aggregators are
//! scraped from the plain-text comprehensive rules.

pub mod updater;

pub use updater::{fetch_and_parse_types, write_type_tables};
