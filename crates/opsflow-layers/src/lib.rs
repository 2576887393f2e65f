//! OpsFlow layer engine
//!
//! The remote service has one "layer" object whose kinds differ only in the
//! settings packed into a flat string attribute bag. This crate exposes each
//! kind as a first-class resource:
//!
//! - [`variant`]: the closed set of layer kinds and their attribute tables
//! - [`schema`]: the declarative schema built from a variant
//! - [`codec`]: typed attribute values to and from the remote bag
//! - [`translate`]: nested CloudWatch, volume and auto scaling settings
//! - [`engine`]: create, read, update, delete and import
//!
//! ```ignore
//! let resource = LayerResource::new(LayerVariant::HaProxy, api, tags)
//!     .with_options(EngineOptions::from_config(&ConnectorConfig::discover()?));
//!
//! let mut desired = LayerInstance::new("stack-1");
//! desired.attributes.insert("stats_password".into(), "s3cret".into());
//! let created = resource.create(&desired).await?;
//! ```

pub mod attribute;
pub mod changes;
pub mod codec;
pub mod engine;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod model;
pub mod schema;
pub mod translate;
pub mod variant;

pub use attribute::{AttributeDefinition, AttributeValue, AttributeValues, ScalarKind, Validation};
pub use changes::{ChangeGroup, ChangeSet};
pub use engine::{EngineOptions, LayerResource};
pub use error::{LayerError, Lifecycle, Operation, Result};
pub use model::{CustomRecipes, LayerInstance};
pub use schema::{FieldKind, FieldMode, Schema, SchemaField, build_schema};
pub use translate::{
    CloudWatchLogConfig, LoadBasedAutoScaling, LogStreamConfig, ScalingThresholds, VolumeConfig,
    VolumeSet,
};
pub use variant::{CLUSTER_ARN_KEY, LayerVariant, VariantDescriptor};
