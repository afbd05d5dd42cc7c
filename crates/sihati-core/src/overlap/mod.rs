mod engine;
mod local;
mod report;
mod resolve;
mod similarity;

pub use engine::OverlapEngine;
pub use local::{LocalScores, PairScore};
pub use report::{
    Category, OverlapFinding, OverlapMetrics, OverlapReport, Priority, Recommendation, Severity,
    SeverityCounts, HIGH_THRESHOLD, LOW_THRESHOLD, MEDIUM_THRESHOLD,
};
pub use resolve::{NameResolver, DEFAULT_NAME_THRESHOLD};
pub use similarity::{jaccard, lcs_ratio};
