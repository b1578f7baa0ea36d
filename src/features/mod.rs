//! Feature extraction and filtering: binary mask → measured candidate
//! features → accepted, optionally calibrated features.

pub mod extract;
pub mod filter;
pub mod types;

pub use extract::extract;
pub use filter::{filter, FilterConstraints, RangeConstraint};
pub use types::{BoundingBox, Feature, RawFeature};
