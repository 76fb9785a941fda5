//! Static report rendering.
//!
//! Every aggregator gets a `<name>.json` data file and a `<name>.html`
//! page that displays it in a sortable grid. `index.html` links them all.

pub mod generator;
pub mod markup;

pub use generator::{write_reports, RunMetadata};
