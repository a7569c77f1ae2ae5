//! Classification model components: trees, forest, scaler, pipeline

pub mod forest;
pub mod pipeline;
pub mod scaler;
pub mod trainer;
pub mod tree;

pub use forest::{ForestConfig, RandomForest};
pub use pipeline::ModelPipeline;
pub use scaler::StandardScaler;
pub use trainer::{TrainingConfig, TrainingReport};
pub use tree::{DecisionTree, TreeConfig};
