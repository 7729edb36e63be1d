// northstar-core/src/infrastructure/report/mod.rs

pub mod markdown;

pub use markdown::{BUSINESS_REVIEW_FILE, MarkdownRenderer};
