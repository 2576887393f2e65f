use opsflow_cloud::RetryConfig;
use opsflow_layers::fake::{FakeOpsApi, FakeTagService};
use opsflow_layers::{EngineOptions, LayerInstance, LayerResource, LayerVariant};
use std::sync::Arc;
use std::time::Duration;

pub const CLUSTER_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/prod";

pub struct TestBackend {
    pub api: Arc<FakeOpsApi>,
    pub tags: Arc<FakeTagService>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            api: Arc::new(FakeOpsApi::new()),
            tags: Arc::new(FakeTagService::new()),
        }
    }

    pub fn resource(&self, variant: LayerVariant) -> LayerResource {
        LayerResource::new(variant, self.api.clone(), self.tags.clone()).with_options(
            EngineOptions {
                registration_retry: RetryConfig {
                    max_attempts: 3,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(2),
                    backoff_multiplier: 2.0,
                },
            },
        )
    }

    pub fn clear_calls(&self) {
        self.api.clear_calls();
        self.tags.clear_calls();
    }
}

pub fn custom_layer(name: &str) -> LayerInstance {
    let mut layer = LayerInstance::new("stack-1");
    layer.name = Some(name.to_string());
    layer.short_name = Some(name.to_string());
    layer
}

#[allow(dead_code)]
pub fn ecs_layer() -> LayerInstance {
    let mut layer = LayerInstance::new("stack-1");
    layer
        .attributes
        .insert("ecs_cluster_arn".to_string(), CLUSTER_ARN.into());
    layer
}

#[allow(dead_code)]
pub fn haproxy_layer(password: &str) -> LayerInstance {
    let mut layer = LayerInstance::new("stack-1");
    layer
        .attributes
        .insert("stats_password".to_string(), password.into());
    layer
}
