//! In-memory layer backend for tests
//!
//! [`FakeOpsApi`] keeps layers in memory, records every call and can be told
//! to fail the next call to a given operation. Write-only attributes are
//! answered with a redaction placeholder, like the real service does.

use crate::variant::LayerVariant;
use async_trait::async_trait;
use opsflow_cloud::{
    CloudError, CreateLayerRequest, ElasticLoadBalancer, Layer, LayerApi,
    LoadBasedAutoScalingConfiguration, Result, SetLoadBasedAutoScalingRequest, TagService, Tags,
    UpdateLayerRequest,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Value the remote side reports for write-only attributes
pub const REDACTED: &str = "*****FILTERED*****";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    CreateLayer,
    DescribeLayer,
    UpdateLayer,
    DeleteLayer,
    AttachLoadBalancer,
    DetachLoadBalancer,
    DescribeLoadBalancers,
    RegisterCluster,
    DeregisterCluster,
    SetAutoScaling,
    DescribeAutoScaling,
}

/// One recorded call with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    CreateLayer(CreateLayerRequest),
    DescribeLayer(String),
    UpdateLayer(UpdateLayerRequest),
    DeleteLayer(String),
    AttachLoadBalancer { load_balancer: String, layer_id: String },
    DetachLoadBalancer { load_balancer: String, layer_id: String },
    DescribeLoadBalancers(String),
    RegisterCluster { cluster_arn: String, stack_id: String },
    DeregisterCluster(String),
    SetAutoScaling(SetLoadBasedAutoScalingRequest),
    DescribeAutoScaling(String),
}

impl RecordedCall {
    pub fn operation(&self) -> FakeOperation {
        match self {
            RecordedCall::CreateLayer(_) => FakeOperation::CreateLayer,
            RecordedCall::DescribeLayer(_) => FakeOperation::DescribeLayer,
            RecordedCall::UpdateLayer(_) => FakeOperation::UpdateLayer,
            RecordedCall::DeleteLayer(_) => FakeOperation::DeleteLayer,
            RecordedCall::AttachLoadBalancer { .. } => FakeOperation::AttachLoadBalancer,
            RecordedCall::DetachLoadBalancer { .. } => FakeOperation::DetachLoadBalancer,
            RecordedCall::DescribeLoadBalancers(_) => FakeOperation::DescribeLoadBalancers,
            RecordedCall::RegisterCluster { .. } => FakeOperation::RegisterCluster,
            RecordedCall::DeregisterCluster(_) => FakeOperation::DeregisterCluster,
            RecordedCall::SetAutoScaling(_) => FakeOperation::SetAutoScaling,
            RecordedCall::DescribeAutoScaling(_) => FakeOperation::DescribeAutoScaling,
        }
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    layers: BTreeMap<String, Layer>,
    load_balancers: BTreeMap<String, Vec<String>>,
    auto_scaling: BTreeMap<String, LoadBasedAutoScalingConfiguration>,
    /// cluster ARN -> stack id
    clusters: BTreeMap<String, String>,
    calls: Vec<RecordedCall>,
    failures: HashMap<FakeOperation, VecDeque<CloudError>>,
}

impl FakeState {
    fn record(&mut self, call: RecordedCall) -> Result<()> {
        let operation = call.operation();
        self.calls.push(call);
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn layer_mut(&mut self, layer_id: &str) -> Result<&mut Layer> {
        self.layers
            .get_mut(layer_id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("layer {}", layer_id)))
    }
}

/// Request-capturing in-memory [`LayerApi`]
#[derive(Default)]
pub struct FakeOpsApi {
    state: Mutex<FakeState>,
}

impl FakeOpsApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call to `operation` with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, operation: FakeOperation, error: CloudError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Seed a layer as if it had been created out of band
    pub fn insert_layer(&self, layer: Layer) {
        self.state().layers.insert(layer.layer_id.clone(), layer);
    }

    /// Drop a layer as if it had been deleted out of band
    pub fn remove_layer(&self, layer_id: &str) {
        self.state().layers.remove(layer_id);
    }

    /// Associate a load balancer without recording a call
    pub fn add_load_balancer(&self, layer_id: &str, load_balancer: &str) {
        self.state()
            .load_balancers
            .entry(layer_id.to_string())
            .or_default()
            .push(load_balancer.to_string());
    }

    /// Stored layer, with secrets unredacted
    pub fn layer(&self, layer_id: &str) -> Option<Layer> {
        self.state().layers.get(layer_id).cloned()
    }

    pub fn load_balancers(&self, layer_id: &str) -> Vec<String> {
        self.state()
            .load_balancers
            .get(layer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn registered_clusters(&self) -> BTreeMap<String, String> {
        self.state().clusters.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn calls_to(&self, operation: FakeOperation) -> Vec<RecordedCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: FakeOperation) -> usize {
        self.calls_to(operation).len()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

fn redact(mut layer: Layer) -> Layer {
    let write_only: Vec<&str> = LayerVariant::from_type_name(&layer.layer_type)
        .map(|variant| {
            variant
                .descriptor()
                .attributes
                .iter()
                .filter(|def| def.write_only)
                .map(|def| def.remote_key)
                .collect()
        })
        .unwrap_or_default();

    for key in write_only {
        if let Some(value) = layer.attributes.get_mut(key) {
            *value = REDACTED.to_string();
        }
    }
    layer
}

#[async_trait]
impl LayerApi for FakeOpsApi {
    async fn create_layer(&self, request: CreateLayerRequest) -> Result<String> {
        let mut state = self.state();
        state.record(RecordedCall::CreateLayer(request.clone()))?;

        state.next_id += 1;
        let layer_id = format!("layer-{}", state.next_id);
        let layer = Layer {
            layer_id: layer_id.clone(),
            stack_id: request.stack_id,
            arn: Some(format!(
                "arn:aws:opsworks:us-east-1:123456789012:layer/{}",
                layer_id
            )),
            layer_type: request.layer_type,
            name: request.name,
            shortname: request.shortname,
            attributes: request.attributes,
            auto_assign_elastic_ips: request.auto_assign_elastic_ips,
            auto_assign_public_ips: request.auto_assign_public_ips,
            enable_auto_healing: request.enable_auto_healing,
            install_updates_on_boot: request.install_updates_on_boot,
            lifecycle_event_configuration: request.lifecycle_event_configuration,
            cloud_watch_logs_configuration: request.cloud_watch_logs_configuration,
            custom_recipes: request.custom_recipes,
            custom_security_group_ids: request.custom_security_group_ids.unwrap_or_default(),
            custom_instance_profile_arn: request.custom_instance_profile_arn,
            custom_json: request.custom_json,
            packages: request.packages.unwrap_or_default(),
            volume_configurations: request.volume_configurations,
            use_ebs_optimized_instances: request.use_ebs_optimized_instances,
        };
        state.layers.insert(layer_id.clone(), layer);

        Ok(layer_id)
    }

    async fn describe_layer(&self, layer_id: &str) -> Result<Layer> {
        let mut state = self.state();
        state.record(RecordedCall::DescribeLayer(layer_id.to_string()))?;
        state.layer_mut(layer_id).map(|layer| redact(layer.clone()))
    }

    async fn update_layer(&self, request: UpdateLayerRequest) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::UpdateLayer(request.clone()))?;
        let layer = state.layer_mut(&request.layer_id)?;

        if let Some(name) = request.name {
            layer.name = name;
        }
        if let Some(shortname) = request.shortname {
            layer.shortname = shortname;
        }
        if let Some(attributes) = request.attributes {
            layer.attributes = attributes;
        }
        if let Some(recipes) = request.custom_recipes {
            let current = layer.custom_recipes.get_or_insert_with(Default::default);
            current.setup = recipes.setup.or(current.setup.take());
            current.configure = recipes.configure.or(current.configure.take());
            current.deploy = recipes.deploy.or(current.deploy.take());
            current.undeploy = recipes.undeploy.or(current.undeploy.take());
            current.shutdown = recipes.shutdown.or(current.shutdown.take());
        }
        if let Some(ids) = request.custom_security_group_ids {
            layer.custom_security_group_ids = ids;
        }
        if let Some(packages) = request.packages {
            layer.packages = packages;
        }
        if let Some(volumes) = request.volume_configurations {
            layer.volume_configurations = volumes;
        }
        if let Some(arn) = request.custom_instance_profile_arn {
            layer.custom_instance_profile_arn = (!arn.is_empty()).then_some(arn);
        }
        if let Some(json) = request.custom_json {
            layer.custom_json = (!json.is_empty()).then_some(json);
        }
        layer.auto_assign_elastic_ips = request
            .auto_assign_elastic_ips
            .or(layer.auto_assign_elastic_ips);
        layer.auto_assign_public_ips = request
            .auto_assign_public_ips
            .or(layer.auto_assign_public_ips);
        layer.enable_auto_healing = request.enable_auto_healing.or(layer.enable_auto_healing);
        layer.install_updates_on_boot = request
            .install_updates_on_boot
            .or(layer.install_updates_on_boot);
        layer.use_ebs_optimized_instances = request
            .use_ebs_optimized_instances
            .or(layer.use_ebs_optimized_instances);
        layer.lifecycle_event_configuration = request
            .lifecycle_event_configuration
            .or(layer.lifecycle_event_configuration.take());
        layer.cloud_watch_logs_configuration = request
            .cloud_watch_logs_configuration
            .or(layer.cloud_watch_logs_configuration.take());

        Ok(())
    }

    async fn delete_layer(&self, layer_id: &str) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::DeleteLayer(layer_id.to_string()))?;
        state
            .layers
            .remove(layer_id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("layer {}", layer_id)))?;
        state.load_balancers.remove(layer_id);
        state.auto_scaling.remove(layer_id);
        Ok(())
    }

    async fn attach_elastic_load_balancer(&self, load_balancer: &str, layer_id: &str) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::AttachLoadBalancer {
            load_balancer: load_balancer.to_string(),
            layer_id: layer_id.to_string(),
        })?;
        state.layer_mut(layer_id)?;
        state
            .load_balancers
            .entry(layer_id.to_string())
            .or_default()
            .push(load_balancer.to_string());
        Ok(())
    }

    async fn detach_elastic_load_balancer(&self, load_balancer: &str, layer_id: &str) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::DetachLoadBalancer {
            load_balancer: load_balancer.to_string(),
            layer_id: layer_id.to_string(),
        })?;
        if let Some(attached) = state.load_balancers.get_mut(layer_id) {
            attached.retain(|name| name != load_balancer);
        }
        Ok(())
    }

    async fn describe_elastic_load_balancers(&self, layer_id: &str) -> Result<Vec<ElasticLoadBalancer>> {
        let mut state = self.state();
        state.record(RecordedCall::DescribeLoadBalancers(layer_id.to_string()))?;
        let stack_id = state.layers.get(layer_id).map(|layer| layer.stack_id.clone());

        Ok(state
            .load_balancers
            .get(layer_id)
            .into_iter()
            .flatten()
            .map(|name| ElasticLoadBalancer {
                elastic_load_balancer_name: name.clone(),
                layer_id: Some(layer_id.to_string()),
                stack_id: stack_id.clone(),
                dns_name: Some(format!("{}.elb.amazonaws.com", name)),
            })
            .collect())
    }

    async fn register_ecs_cluster(&self, cluster_arn: &str, stack_id: &str) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::RegisterCluster {
            cluster_arn: cluster_arn.to_string(),
            stack_id: stack_id.to_string(),
        })?;
        state
            .clusters
            .insert(cluster_arn.to_string(), stack_id.to_string());
        Ok(())
    }

    async fn deregister_ecs_cluster(&self, cluster_arn: &str) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::DeregisterCluster(cluster_arn.to_string()))?;
        state.clusters.remove(cluster_arn);
        Ok(())
    }

    async fn set_load_based_auto_scaling(&self, request: SetLoadBasedAutoScalingRequest) -> Result<()> {
        let mut state = self.state();
        state.record(RecordedCall::SetAutoScaling(request.clone()))?;
        state.layer_mut(&request.layer_id)?;

        let current = state
            .auto_scaling
            .entry(request.layer_id.clone())
            .or_insert_with(|| LoadBasedAutoScalingConfiguration {
                layer_id: Some(request.layer_id.clone()),
                ..Default::default()
            });
        current.enable = request.enable.or(current.enable);
        current.up_scaling = request.up_scaling.or(current.up_scaling.take());
        current.down_scaling = request.down_scaling.or(current.down_scaling.take());
        Ok(())
    }

    async fn describe_load_based_auto_scaling(
        &self,
        layer_id: &str,
    ) -> Result<Vec<LoadBasedAutoScalingConfiguration>> {
        let mut state = self.state();
        state.record(RecordedCall::DescribeAutoScaling(layer_id.to_string()))?;
        Ok(state.auto_scaling.get(layer_id).cloned().into_iter().collect())
    }
}

/// One recorded tag-service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCall {
    List(String),
    Update { arn: String, old: Tags, new: Tags },
}

#[derive(Default)]
struct TagState {
    tags: BTreeMap<String, Tags>,
    calls: Vec<TagCall>,
    failures: VecDeque<CloudError>,
}

/// Request-capturing in-memory [`TagService`]
#[derive(Default)]
pub struct FakeTagService {
    state: Mutex<TagState>,
}

impl FakeTagService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next tag call of either kind
    pub fn fail_next(&self, error: CloudError) {
        self.state().failures.push_back(error);
    }

    pub fn tags(&self, arn: &str) -> Tags {
        self.state().tags.get(arn).cloned().unwrap_or_default()
    }

    pub fn set_tags(&self, arn: &str, tags: Tags) {
        self.state().tags.insert(arn.to_string(), tags);
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl TagService for FakeTagService {
    async fn list_tags(&self, arn: &str) -> Result<Tags> {
        let mut state = self.state();
        state.calls.push(TagCall::List(arn.to_string()));
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn update_tags(&self, arn: &str, old: &Tags, new: &Tags) -> Result<()> {
        let mut state = self.state();
        state.calls.push(TagCall::Update {
            arn: arn.to_string(),
            old: old.clone(),
            new: new.clone(),
        });
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        let current = state.tags.entry(arn.to_string()).or_default();
        current.retain(|key, _| !old.contains_key(key) || new.contains_key(key));
        current.extend(new.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}
