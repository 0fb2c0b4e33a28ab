pub mod config;
pub mod error;
pub mod eval;
pub mod judge;

pub use config::Config;
pub use error::{OtrError, Result};
pub use eval::{on_topic_rate, on_topic_rate_at_k, RelevanceFlag, RelevanceItem};
pub use judge::{CompletionClient, RelevanceLabeler};
