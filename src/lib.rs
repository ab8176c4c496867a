//! Reconciles AI-classified Gmail summaries with raw Gmail message metadata
//! and derives the sponsorship dashboard figures from the merged set.

pub mod config;
pub mod enrich;
pub mod error;
pub mod gmail;
pub mod logging;
pub mod mailbox;
pub mod models;
pub mod normalize;
pub mod refresh;
pub mod stats;
pub mod store;
pub mod sync;
pub mod webhook;

pub use enrich::{enrich, enrich_now, usable};
pub use models::{Category, ClassifiedRecord, EnrichedRecord, NO_SENDER, RawMessageRecord};
pub use refresh::{ClassificationSource, RawMessageSource, RefreshOutcome, refresh};
pub use stats::{DerivedStats, aggregate};
