//! Evaluation: relevance items, OTR / OTR@K metrics, item files, and per-query reports.

pub mod dataset;
pub mod item;
pub mod metrics;
pub mod report;

pub use dataset::{read_items, write_items};
pub use item::{Qid, RelevanceFlag, RelevanceItem};
pub use metrics::{on_topic_rate, on_topic_rate_at_k, on_topic_rate_of, prefix_shortfall};
pub use report::{build_report, OtrReport, QueryReport};
