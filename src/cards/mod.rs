//! Card classification and filtering utilities.

pub mod constants;
pub mod utils;

pub use utils::*;
