//! Translators between structured local sub-configurations and their remote
//! shapes.
//!
//! `expand` builds the remote request shape and omits zero or empty fields;
//! `flatten` reads the remote shape back and substitutes the remote defaults
//! for absent fields. Neither direction fails: malformed values are dropped.

pub mod autoscaling;
pub mod cloudwatch;
pub mod volume;

pub use autoscaling::{LoadBasedAutoScaling, ScalingThresholds};
pub use cloudwatch::{CloudWatchLogConfig, LogStreamConfig};
pub use volume::{VolumeConfig, VolumeSet};

fn non_zero(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
