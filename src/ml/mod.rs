pub mod features;
pub mod model;
pub mod dataset;
pub mod store;

pub use features::{FeatureBuilder, FeatureVector};
pub use model::{LinearModel, ModelWeights, PredictorAdapter, Regressor, StepPredictor};
pub use dataset::{TrainingRow, TrainingSet};
pub use store::{cached_model, history_cache, model_cache, ArtifactCache, HistoryKey};
