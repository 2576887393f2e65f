//! Lifecycle engine shared by every layer variant
//!
//! [`LayerResource`] runs create, read, update, delete and import for one
//! variant against a [`LayerApi`] and a [`TagService`]. Each operation is a
//! single sequential chain of remote calls; dropping the returned future
//! abandons the chain at the next call boundary.
//!
//! Side effects are ordered so that associations are created only once
//! their host exists and removed only after it is gone:
//!
//! ```text
//! create: register cluster -> create layer -> attach ELB -> auto scaling -> tags -> read
//! update: update layer -> detach/attach ELB -> auto scaling -> tags -> read
//! delete: delete layer -> deregister cluster
//! ```
//!
//! A side effect that fails after the layer was created, updated or deleted
//! is reported as [`LayerError::PartialFailure`]. Nothing is rolled back.

use crate::changes::{ChangeGroup, ChangeSet};
use crate::codec;
use crate::error::{LayerError, Lifecycle, Operation, Result};
use crate::model::{CustomRecipes, LayerInstance, normalize_json};
use crate::schema::{Schema, build_schema};
use crate::translate::{autoscaling, cloudwatch, volume};
use crate::variant::{LayerVariant, VariantDescriptor};
use opsflow_cloud::{
    CloudError, CloudWatchLogsConfiguration, CreateLayerRequest, Layer, LayerApi,
    LifecycleEventConfiguration, Recipes, RetryConfig, ShutdownEventConfiguration, TagService,
    Tags, UpdateLayerRequest, retry_with_backoff,
};
use opsflow_config::ConnectorConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions {
    /// Backoff for cluster registration, which can race IAM propagation
    pub registration_retry: RetryConfig,
}

impl EngineOptions {
    /// Engine options from the connector config's `retry` section
    pub fn from_config(config: &ConnectorConfig) -> Self {
        let retry = &config.retry;
        Self {
            registration_retry: RetryConfig {
                max_attempts: retry.max_attempts,
                initial_delay: Duration::from_millis(retry.initial_delay_ms),
                max_delay: Duration::from_millis(retry.max_delay_ms),
                backoff_multiplier: retry.backoff_multiplier,
            },
        }
    }
}

/// How a read treats its result
#[derive(Debug, Clone, Copy)]
struct ReadMode {
    /// A missing layer is an error rather than absence
    must_exist: bool,
    /// List tags remotely instead of keeping the ones just written
    refresh_tags: bool,
}

impl ReadMode {
    const REFRESH: ReadMode = ReadMode {
        must_exist: false,
        refresh_tags: true,
    };

    const AFTER_WRITE: ReadMode = ReadMode {
        must_exist: true,
        refresh_tags: false,
    };
}

/// CRUD engine for one layer variant
pub struct LayerResource {
    variant: LayerVariant,
    api: Arc<dyn LayerApi>,
    tags: Arc<dyn TagService>,
    options: EngineOptions,
}

impl LayerResource {
    /// Engine for `variant` with default options
    pub fn new(variant: LayerVariant, api: Arc<dyn LayerApi>, tags: Arc<dyn TagService>) -> Self {
        Self {
            variant,
            api,
            tags,
            options: EngineOptions::default(),
        }
    }

    /// Replace the default options, e.g. with [`EngineOptions::from_config`]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Layer kind this engine manages
    pub fn variant(&self) -> LayerVariant {
        self.variant
    }

    pub fn descriptor(&self) -> &'static VariantDescriptor {
        self.variant.descriptor()
    }

    /// Declarative schema for this variant
    pub fn schema(&self) -> Result<Schema> {
        build_schema(self.descriptor())
    }

    /// Create the layer and its side effects, returning the observed state
    pub async fn create(&self, desired: &LayerInstance) -> Result<LayerInstance> {
        let descriptor = self.descriptor();
        desired.validate(descriptor)?;

        let request = self.create_request(desired)?;
        let name = request.name.clone();

        if let Some(cluster_arn) = desired.cluster_arn() {
            tracing::debug!("Registering ECS cluster {} with stack {}", cluster_arn, desired.stack_id);
            retry_with_backoff(&self.options.registration_retry, "register_ecs_cluster", || {
                self.api.register_ecs_cluster(cluster_arn, &desired.stack_id)
            })
            .await
            .map_err(|e| {
                LayerError::remote(
                    Operation::RegisteringCluster(cluster_arn.to_string()),
                    name.as_str(),
                    e,
                )
            })?;
        }

        tracing::debug!(
            "Creating {} layer {} in stack {}",
            request.layer_type,
            name,
            request.stack_id
        );
        let id = self
            .api
            .create_layer(request)
            .await
            .map_err(|e| LayerError::remote(Operation::Creating, name.as_str(), e))?;
        tracing::info!("Created {} ({})", self.variant, id);

        let partial = |operation, e| LayerError::partial(Lifecycle::Create, id.as_str(), operation, e);

        if let Some(elb) = active_load_balancer(desired) {
            self.api
                .attach_elastic_load_balancer(elb, &id)
                .await
                .map_err(|e| partial(Operation::AttachingLoadBalancer(elb.to_string()), e))?;
        }

        if let Some(scaling) = &desired.load_based_auto_scaling {
            self.api
                .set_load_based_auto_scaling(autoscaling::expand(&id, scaling))
                .await
                .map_err(|e| partial(Operation::SettingAutoScaling, e))?;
        }

        if !desired.tags.is_empty() {
            let layer = self
                .api
                .describe_layer(&id)
                .await
                .map_err(|e| partial(Operation::Reading, e))?;
            let arn = layer_arn(&layer).map_err(|e| partial(Operation::UpdatingTags, e))?;
            self.tags
                .update_tags(arn, &Tags::new(), &desired.tags)
                .await
                .map_err(|e| partial(Operation::UpdatingTags, e))?;
        }

        self.observe(&id, desired, ReadMode::AFTER_WRITE)
            .await
            .and_then(|observed| observed.ok_or_else(|| vanished(&id)))
            .map_err(|e| into_partial(e, Lifecycle::Create, &id))
    }

    /// Refresh `prior` from the remote side; `None` means the layer is gone
    pub async fn read(&self, prior: &LayerInstance) -> Result<Option<LayerInstance>> {
        let id = require_id(prior)?;
        self.observe(id, prior, ReadMode::REFRESH).await
    }

    /// Adopt an existing layer by identifier. Write-only attributes are not
    /// recoverable and come back unset.
    pub async fn import(&self, id: &str) -> Result<Option<LayerInstance>> {
        tracing::info!("Importing {} ({})", self.variant, id);
        self.observe(id, &LayerInstance::default(), ReadMode::REFRESH)
            .await
    }

    /// Apply the difference between `old` and `new`
    pub async fn update(&self, old: &LayerInstance, new: &LayerInstance) -> Result<LayerInstance> {
        let descriptor = self.descriptor();
        let id = require_id(old)?;
        new.validate(descriptor)?;

        let changes = ChangeSet::between(descriptor, old, new);
        if changes.requires_replacement() {
            return Err(LayerError::Validation(format!(
                "changing {} requires replacing layer {}",
                changes.replacement_fields().join(", "),
                id
            )));
        }
        tracing::debug!("Updating {} ({}): {}", self.variant, id, changes);

        if changes.requires_layer_update() {
            let request = self.update_request(id, &changes, old, new)?;
            self.api
                .update_layer(request)
                .await
                .map_err(|e| LayerError::remote(Operation::Updating, id, e))?;
            tracing::info!("Updated {} ({})", self.variant, id);
        }

        let partial = |operation, e| LayerError::partial(Lifecycle::Update, id, operation, e);

        if changes.contains(ChangeGroup::LoadBalancer) {
            if let Some(elb) = active_load_balancer(old) {
                self.api
                    .detach_elastic_load_balancer(elb, id)
                    .await
                    .map_err(|e| partial(Operation::DetachingLoadBalancer(elb.to_string()), e))?;
            }
            if let Some(elb) = active_load_balancer(new) {
                self.api
                    .attach_elastic_load_balancer(elb, id)
                    .await
                    .map_err(|e| partial(Operation::AttachingLoadBalancer(elb.to_string()), e))?;
            }
        }

        if changes.contains(ChangeGroup::AutoScaling) {
            let request = match &new.load_based_auto_scaling {
                Some(scaling) => autoscaling::expand(id, scaling),
                None => autoscaling::disable(id),
            };
            self.api
                .set_load_based_auto_scaling(request)
                .await
                .map_err(|e| partial(Operation::SettingAutoScaling, e))?;
        }

        if changes.contains(ChangeGroup::Tags) {
            let arn = match old.arn.as_deref().filter(|arn| !arn.is_empty()) {
                Some(arn) => arn.to_string(),
                None => {
                    let layer = self
                        .api
                        .describe_layer(id)
                        .await
                        .map_err(|e| partial(Operation::Reading, e))?;
                    layer_arn(&layer)
                        .map_err(|e| partial(Operation::UpdatingTags, e))?
                        .to_string()
                }
            };
            self.tags
                .update_tags(&arn, &old.tags, &new.tags)
                .await
                .map_err(|e| partial(Operation::UpdatingTags, e))?;
        }

        self.observe(id, new, ReadMode::AFTER_WRITE)
            .await
            .and_then(|observed| observed.ok_or_else(|| vanished(id)))
            .map_err(|e| into_partial(e, Lifecycle::Update, id))
    }

    /// Delete the layer. A layer that is already gone counts as deleted.
    pub async fn delete(&self, state: &LayerInstance) -> Result<()> {
        let id = require_id(state)?;

        tracing::debug!("Deleting {} ({})", self.variant, id);
        match self.api.delete_layer(id).await {
            Ok(()) => tracing::info!("Deleted {} ({})", self.variant, id),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Layer {} already deleted", id);
                return Ok(());
            }
            Err(e) => return Err(LayerError::remote(Operation::Deleting, id, e)),
        }

        if let Some(cluster_arn) = state.cluster_arn() {
            tracing::debug!("Deregistering ECS cluster {}", cluster_arn);
            self.api
                .deregister_ecs_cluster(cluster_arn)
                .await
                .map_err(|e| {
                    LayerError::partial(
                        Lifecycle::Delete,
                        id,
                        Operation::DeregisteringCluster(cluster_arn.to_string()),
                        e,
                    )
                })?;
        }

        Ok(())
    }

    async fn observe(
        &self,
        id: &str,
        prior: &LayerInstance,
        mode: ReadMode,
    ) -> Result<Option<LayerInstance>> {
        let descriptor = self.descriptor();

        let layer = match self.api.describe_layer(id).await {
            Ok(layer) => layer,
            Err(e) if e.is_not_found() && !mode.must_exist => {
                tracing::warn!("Layer {} not found, removing from state", id);
                return Ok(None);
            }
            Err(e) => return Err(LayerError::remote(Operation::Reading, id, e)),
        };

        if layer.layer_type != descriptor.type_name {
            return Err(LayerError::Validation(format!(
                "layer {} has type {}, expected {}",
                id, layer.layer_type, descriptor.type_name
            )));
        }

        let mut observed = self.flatten_layer(&layer, prior)?;

        observed.elastic_load_balancer = self.find_load_balancer(id).await?;
        observed.load_based_auto_scaling = self.find_auto_scaling(id).await?;

        observed.tags = match (&observed.arn, mode.refresh_tags) {
            (Some(arn), true) => self
                .tags
                .list_tags(arn)
                .await
                .map_err(|e| LayerError::remote(Operation::ReadingTags, id, e))?,
            (None, true) => Tags::new(),
            (_, false) => prior.tags.clone(),
        };

        Ok(Some(observed))
    }

    fn flatten_layer(&self, layer: &Layer, prior: &LayerInstance) -> Result<LayerInstance> {
        let descriptor = self.descriptor();
        let shutdown = layer
            .lifecycle_event_configuration
            .as_ref()
            .and_then(|lifecycle| lifecycle.shutdown.as_ref());
        let recipes = layer.custom_recipes.clone().unwrap_or_default();

        let custom_json = match layer.custom_json.as_deref() {
            Some(raw) if !raw.is_empty() => Some(normalize_json(raw)?),
            _ => None,
        };

        Ok(LayerInstance {
            id: Some(layer.layer_id.clone()),
            arn: layer.arn.clone(),
            stack_id: layer.stack_id.clone(),
            name: Some(layer.name.clone()),
            short_name: descriptor
                .custom_short_name
                .then(|| layer.shortname.clone()),
            attributes: codec::decode(&layer.attributes, &descriptor.attributes, &prior.attributes),
            auto_assign_elastic_ips: layer.auto_assign_elastic_ips.unwrap_or_default(),
            auto_assign_public_ips: layer.auto_assign_public_ips.unwrap_or_default(),
            auto_healing: layer.enable_auto_healing.unwrap_or_default(),
            install_updates_on_boot: layer.install_updates_on_boot.unwrap_or_default(),
            drain_elb_on_shutdown: shutdown
                .and_then(|s| s.delay_until_elb_connections_drained)
                .unwrap_or_default(),
            instance_shutdown_timeout: shutdown.and_then(|s| s.execution_timeout),
            use_ebs_optimized_instances: layer.use_ebs_optimized_instances.unwrap_or_default(),
            custom_instance_profile_arn: layer.custom_instance_profile_arn.clone(),
            custom_json,
            custom_recipes: CustomRecipes {
                setup: recipes.setup.unwrap_or_default(),
                configure: recipes.configure.unwrap_or_default(),
                deploy: recipes.deploy.unwrap_or_default(),
                undeploy: recipes.undeploy.unwrap_or_default(),
                shutdown: recipes.shutdown.unwrap_or_default(),
            },
            custom_security_group_ids: layer.custom_security_group_ids.iter().cloned().collect(),
            system_packages: layer.packages.iter().cloned().collect(),
            cloudwatch: layer
                .cloud_watch_logs_configuration
                .as_ref()
                .map(cloudwatch::flatten),
            volumes: volume::flatten(&layer.volume_configurations),
            elastic_load_balancer: None,
            load_based_auto_scaling: None,
            tags: Tags::new(),
        })
    }

    async fn find_load_balancer(&self, id: &str) -> Result<Option<String>> {
        let mut balancers = self
            .api
            .describe_elastic_load_balancers(id)
            .await
            .map_err(|e| LayerError::remote(Operation::ReadingLoadBalancers, id, e))?;

        match balancers.len() {
            0 => Ok(None),
            1 => Ok(balancers.pop().map(|elb| elb.elastic_load_balancer_name)),
            count => Err(LayerError::remote(
                Operation::ReadingLoadBalancers,
                id,
                CloudError::TooManyResults {
                    count,
                    request: format!("load balancers of layer {}", id),
                },
            )),
        }
    }

    async fn find_auto_scaling(&self, id: &str) -> Result<Option<autoscaling::LoadBasedAutoScaling>> {
        let configurations = match self.api.describe_load_based_auto_scaling(id).await {
            Ok(configurations) => configurations,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(LayerError::remote(Operation::ReadingAutoScaling, id, e)),
        };

        match configurations.as_slice() {
            [] => Ok(None),
            [configuration] => Ok(Some(autoscaling::flatten(configuration))),
            _ => Err(LayerError::remote(
                Operation::ReadingAutoScaling,
                id,
                CloudError::TooManyResults {
                    count: configurations.len(),
                    request: format!("load-based auto scaling of layer {}", id),
                },
            )),
        }
    }

    fn create_request(&self, desired: &LayerInstance) -> Result<CreateLayerRequest> {
        let descriptor = self.descriptor();

        Ok(CreateLayerRequest {
            stack_id: desired.stack_id.clone(),
            layer_type: descriptor.type_name.to_string(),
            name: desired.resolved_name(descriptor).unwrap_or_default(),
            shortname: desired.resolved_short_name(descriptor),
            attributes: codec::encode(&desired.attributes, &descriptor.attributes)?,
            auto_assign_elastic_ips: Some(desired.auto_assign_elastic_ips),
            auto_assign_public_ips: Some(desired.auto_assign_public_ips),
            enable_auto_healing: Some(desired.auto_healing),
            install_updates_on_boot: Some(desired.install_updates_on_boot),
            lifecycle_event_configuration: Some(shutdown_event(desired)),
            cloud_watch_logs_configuration: desired.cloudwatch.as_ref().map(cloudwatch::expand),
            custom_recipes: Some(Recipes {
                setup: non_empty_list(&desired.custom_recipes.setup),
                configure: non_empty_list(&desired.custom_recipes.configure),
                deploy: non_empty_list(&desired.custom_recipes.deploy),
                undeploy: non_empty_list(&desired.custom_recipes.undeploy),
                shutdown: non_empty_list(&desired.custom_recipes.shutdown),
            }),
            custom_security_group_ids: non_empty_set(&desired.custom_security_group_ids),
            custom_instance_profile_arn: desired
                .custom_instance_profile_arn
                .clone()
                .filter(|arn| !arn.is_empty()),
            custom_json: desired.custom_json.clone().filter(|json| !json.is_empty()),
            packages: non_empty_set(&desired.system_packages),
            volume_configurations: volume::expand(&desired.volumes),
            use_ebs_optimized_instances: Some(desired.use_ebs_optimized_instances),
        })
    }

    /// Build an update request carrying only the changed groups
    fn update_request(
        &self,
        id: &str,
        changes: &ChangeSet,
        old: &LayerInstance,
        new: &LayerInstance,
    ) -> Result<UpdateLayerRequest> {
        let descriptor = self.descriptor();
        let mut request = UpdateLayerRequest::new(id);

        for group in changes.groups() {
            match group {
                ChangeGroup::Attributes => {
                    request.attributes =
                        Some(codec::encode(&new.attributes, &descriptor.attributes)?);
                }
                ChangeGroup::Name => request.name = new.resolved_name(descriptor),
                ChangeGroup::ShortName => request.shortname = new.short_name.clone(),
                ChangeGroup::AutoAssignElasticIps => {
                    request.auto_assign_elastic_ips = Some(new.auto_assign_elastic_ips);
                }
                ChangeGroup::AutoAssignPublicIps => {
                    request.auto_assign_public_ips = Some(new.auto_assign_public_ips);
                }
                ChangeGroup::AutoHealing => request.enable_auto_healing = Some(new.auto_healing),
                ChangeGroup::InstallUpdatesOnBoot => {
                    request.install_updates_on_boot = Some(new.install_updates_on_boot);
                }
                ChangeGroup::ShutdownEvent => {
                    request.lifecycle_event_configuration = Some(shutdown_event(new));
                }
                ChangeGroup::UseEbsOptimizedInstances => {
                    request.use_ebs_optimized_instances = Some(new.use_ebs_optimized_instances);
                }
                ChangeGroup::CustomInstanceProfileArn => {
                    request.custom_instance_profile_arn =
                        Some(new.custom_instance_profile_arn.clone().unwrap_or_default());
                }
                ChangeGroup::CustomJson => {
                    request.custom_json = Some(new.custom_json.clone().unwrap_or_default());
                }
                ChangeGroup::CustomRecipes => {
                    request.custom_recipes =
                        Some(changed_recipes(&old.custom_recipes, &new.custom_recipes));
                }
                ChangeGroup::SecurityGroups => {
                    request.custom_security_group_ids =
                        Some(new.custom_security_group_ids.iter().cloned().collect());
                }
                ChangeGroup::SystemPackages => {
                    request.packages = Some(new.system_packages.iter().cloned().collect());
                }
                ChangeGroup::CloudWatch => {
                    // a removed block is sent as disabled so the remote side stops shipping
                    request.cloud_watch_logs_configuration =
                        Some(new.cloudwatch.as_ref().map_or_else(
                            || CloudWatchLogsConfiguration {
                                enabled: Some(false),
                                log_streams: Some(Vec::new()),
                            },
                            cloudwatch::expand,
                        ));
                }
                ChangeGroup::Volumes => {
                    request.volume_configurations = Some(volume::expand(&new.volumes));
                }
                ChangeGroup::LoadBalancer | ChangeGroup::AutoScaling | ChangeGroup::Tags => {}
            }
        }

        Ok(request)
    }
}

fn require_id(layer: &LayerInstance) -> Result<&str> {
    layer
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| LayerError::Validation("layer has no identifier".to_string()))
}

fn layer_arn(layer: &Layer) -> std::result::Result<&str, CloudError> {
    layer
        .arn
        .as_deref()
        .filter(|arn| !arn.is_empty())
        .ok_or_else(|| CloudError::InvalidConfig(format!("layer {} has no ARN", layer.layer_id)))
}

fn vanished(id: &str) -> LayerError {
    LayerError::remote(
        Operation::Reading,
        id,
        CloudError::ResourceNotFound(format!("layer {}", id)),
    )
}

/// Re-tag a remote failure as a side effect of an already applied lifecycle step
fn into_partial(err: LayerError, lifecycle: Lifecycle, id: &str) -> LayerError {
    match err {
        LayerError::Remote {
            operation, source, ..
        } => LayerError::partial(lifecycle, id, operation, source),
        other => other,
    }
}

fn active_load_balancer(layer: &LayerInstance) -> Option<&str> {
    layer
        .elastic_load_balancer
        .as_deref()
        .filter(|name| !name.is_empty())
}

fn shutdown_event(layer: &LayerInstance) -> LifecycleEventConfiguration {
    LifecycleEventConfiguration {
        shutdown: Some(ShutdownEventConfiguration {
            delay_until_elb_connections_drained: Some(layer.drain_elb_on_shutdown),
            execution_timeout: layer.instance_shutdown_timeout,
        }),
    }
}

fn non_empty_list(list: &[String]) -> Option<Vec<String>> {
    (!list.is_empty()).then(|| list.to_vec())
}

fn non_empty_set(set: &BTreeSet<String>) -> Option<Vec<String>> {
    (!set.is_empty()).then(|| set.iter().cloned().collect())
}

/// Only lists that differ are sent; the rest stay untouched remotely
fn changed_recipes(old: &CustomRecipes, new: &CustomRecipes) -> Recipes {
    let pick = |o: &Vec<String>, n: &Vec<String>| (o != n).then(|| n.clone());
    Recipes {
        setup: pick(&old.setup, &new.setup),
        configure: pick(&old.configure, &new.configure),
        deploy: pick(&old.deploy, &new.deploy),
        undeploy: pick(&old.undeploy, &new.undeploy),
        shutdown: pick(&old.shutdown, &new.shutdown),
    }
}
