//! Screener change detection and deduplication.

pub mod classifier;
pub mod dedup;

pub use classifier::{Action, ScreeningClassifier, classify, screening_title};
pub use dedup::DedupStore;
