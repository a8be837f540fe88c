pub mod classifier;
pub mod delegate;
pub mod features;
pub mod landmark_service;
pub mod pipeline;
pub mod report;
pub mod seed;
pub mod synthesis;
pub mod types;

pub use classifier::classify;
pub use delegate::{DelegateError, RemoteLandmarkClient};
pub use pipeline::{LandmarkSource, ScreeningOutcome, ScreeningPipeline};
pub use report::ResultView;
pub use seed::{extract_seed, seed_from_encoded, ImageSample, SampleError};
pub use synthesis::{synthesize_features, synthesize_landmarks};
pub use types::{
    ClassificationResult, DisorderLabel, FacialLandmarks, FeatureBundle, ModelKind,
    ParseModelError, Percentages, Probabilities, Seed,
};
