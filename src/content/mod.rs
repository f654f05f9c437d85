//! Content pipeline: raw model output to publishable markup.
//!
//! Three order-sensitive stages: [`clean`] normalizes raw output into
//! canonical heading-tagged text, [`dedup`] (used by the cleaner) filters
//! near-duplicate paragraphs, and [`html`] renders the canonical form into
//! the markup the publisher expects.

pub mod clean;
pub mod dedup;
pub mod html;

pub use clean::{BoilerplateRules, ContentCleaner};
pub use dedup::{is_near_duplicate, remove_near_duplicates, similarity};
pub use html::to_html;
