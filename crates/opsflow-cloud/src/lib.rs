//! OpsFlow remote API abstraction
//!
//! This crate defines the seam between the layer engine and the remote
//! orchestration service: the [`LayerApi`] and [`TagService`] traits, the
//! request/response shapes they exchange, and the shared error taxonomy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 opsflow-layers                   │
//! │   variant tables → schema → codec → lifecycle    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 opsflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait LayerApi    trait TagService      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Wire types  │  │ Retry/backoff│            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────────────┐
//! │  transport (host side) │
//! └───────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod retry;
pub mod types;

// Re-exports
pub use error::{CloudError, Result};
pub use provider::{LayerApi, TagService};
pub use retry::{RetryConfig, retry_with_backoff};
pub use types::{
    AutoScalingThresholds, CloudWatchLogsConfiguration, CloudWatchLogsLogStream,
    CreateLayerRequest, ElasticLoadBalancer, Layer, LifecycleEventConfiguration,
    LoadBasedAutoScalingConfiguration, Recipes, RemoteAttributes, SetLoadBasedAutoScalingRequest,
    ShutdownEventConfiguration, Tags, UpdateLayerRequest, VolumeConfiguration,
};
