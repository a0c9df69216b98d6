//! Trend prediction: the periodic adapter and the bundled momentum predictor

pub mod adapter;
pub mod metadata;
pub mod momentum;

pub use adapter::PredictorAdapter;
pub use metadata::ModelMetadata;
pub use momentum::MomentumPredictor;
