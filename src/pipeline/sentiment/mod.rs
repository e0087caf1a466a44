//! Patient sentiment and intent via zero-shot classification.

pub mod classifier;
pub mod types;

pub use classifier::SentimentIntentClassifier;
pub use types::{
    CandidateLabel, ClassificationFallback, Dimension, Intent, Sentiment, SentimentIntentResult,
    UnknownLabel,
};
