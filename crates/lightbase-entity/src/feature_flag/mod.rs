//! Feature flag aggregate.

mod model;

pub use model::FeatureFlag;
