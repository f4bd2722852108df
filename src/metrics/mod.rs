pub mod test_set;
pub mod tracker;

pub use test_set::TestSet;
pub use tracker::{MetricsTracker, StepInfo, TrainingMetrics};
