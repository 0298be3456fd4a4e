//! Service Layer
//!
//! The intake pipeline and its collaborators, plus the lifecycle engine.

pub mod classifier;
pub mod dedup;
pub mod intake;
pub mod lifecycle;
pub mod scorer;
pub mod spatial;

pub use classifier::{Classification, Classifier, HttpClassifier};
pub use dedup::DuplicateDetector;
pub use intake::IntakePipeline;
pub use lifecycle::LifecycleEngine;
pub use spatial::SpatialIndex;
