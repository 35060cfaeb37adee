//! Markdown import and export.
//!
//! Import goes through `pulldown-cmark`; export writes the supported blocks
//! back out. The round trip is not lossless: block kinds without a Markdown
//! form (toggles, columns, callouts) are flattened on export.

mod export;
mod import;

pub use export::{export, render_inline};
pub use import::import;
