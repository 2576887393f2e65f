//! Remote API trait definitions

use crate::error::Result;
use crate::types::{
    CreateLayerRequest, ElasticLoadBalancer, Layer, LoadBasedAutoScalingConfiguration,
    SetLoadBasedAutoScalingRequest, Tags, UpdateLayerRequest,
};
use async_trait::async_trait;

/// Remote layer orchestration API
///
/// Implementations own the transport. Every method is a single remote call;
/// a missing object is reported as [`crate::CloudError::ResourceNotFound`].
/// Dropping the returned future abandons the call, which is how the caller's
/// cancellation or deadline reaches the remote side.
#[async_trait]
pub trait LayerApi: Send + Sync {
    /// Create a layer and return its generated identifier
    async fn create_layer(&self, request: CreateLayerRequest) -> Result<String>;

    /// Fetch a single layer by identifier
    async fn describe_layer(&self, layer_id: &str) -> Result<Layer>;

    /// Apply a partial update; unset request fields are left unchanged remotely
    async fn update_layer(&self, request: UpdateLayerRequest) -> Result<()>;

    async fn delete_layer(&self, layer_id: &str) -> Result<()>;

    async fn attach_elastic_load_balancer(&self, load_balancer: &str, layer_id: &str)
    -> Result<()>;

    async fn detach_elastic_load_balancer(&self, load_balancer: &str, layer_id: &str)
    -> Result<()>;

    /// Load balancers attached to a layer (zero or one in practice)
    async fn describe_elastic_load_balancers(
        &self,
        layer_id: &str,
    ) -> Result<Vec<ElasticLoadBalancer>>;

    /// Register a container cluster with a stack
    async fn register_ecs_cluster(&self, cluster_arn: &str, stack_id: &str) -> Result<()>;

    async fn deregister_ecs_cluster(&self, cluster_arn: &str) -> Result<()>;

    async fn set_load_based_auto_scaling(
        &self,
        request: SetLoadBasedAutoScalingRequest,
    ) -> Result<()>;

    async fn describe_load_based_auto_scaling(
        &self,
        layer_id: &str,
    ) -> Result<Vec<LoadBasedAutoScalingConfiguration>>;
}

/// Tag listing and reconciliation service keyed by resource ARN
#[async_trait]
pub trait TagService: Send + Sync {
    async fn list_tags(&self, arn: &str) -> Result<Tags>;

    /// Move the tags on `arn` from `old` to `new` (removals and upserts)
    async fn update_tags(&self, arn: &str, old: &Tags, new: &Tags) -> Result<()>;
}
