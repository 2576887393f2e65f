//! Locally observed state of a layer

use crate::attribute::{AttributeValues, validate_values};
use crate::error::{LayerError, Result};
use crate::translate::{CloudWatchLogConfig, LoadBasedAutoScaling, VolumeSet};
use crate::variant::{CLUSTER_ARN_KEY, VariantDescriptor};
use opsflow_cloud::Tags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_INSTANCE_SHUTDOWN_TIMEOUT: i64 = 120;

/// Chef recipes run at each lifecycle event, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRecipes {
    pub setup: Vec<String>,
    pub configure: Vec<String>,
    pub deploy: Vec<String>,
    pub undeploy: Vec<String>,
    pub shutdown: Vec<String>,
}

/// A layer as declared by the caller or as last observed remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerInstance {
    /// Remote identifier; `None` until the layer is created
    pub id: Option<String>,
    pub arn: Option<String>,
    pub stack_id: String,
    /// Display name; variants with a fixed name fall back to it
    pub name: Option<String>,
    /// Only meaningful for variants with a custom short name
    pub short_name: Option<String>,
    /// Variant-specific settings
    pub attributes: AttributeValues,
    pub auto_assign_elastic_ips: bool,
    pub auto_assign_public_ips: bool,
    pub auto_healing: bool,
    pub install_updates_on_boot: bool,
    pub drain_elb_on_shutdown: bool,
    /// Seconds
    pub instance_shutdown_timeout: Option<i64>,
    pub use_ebs_optimized_instances: bool,
    pub custom_instance_profile_arn: Option<String>,
    pub custom_json: Option<String>,
    pub custom_recipes: CustomRecipes,
    pub custom_security_group_ids: BTreeSet<String>,
    pub system_packages: BTreeSet<String>,
    pub cloudwatch: Option<CloudWatchLogConfig>,
    pub volumes: VolumeSet,
    pub elastic_load_balancer: Option<String>,
    pub load_based_auto_scaling: Option<LoadBasedAutoScaling>,
    pub tags: Tags,
}

impl Default for LayerInstance {
    fn default() -> Self {
        Self {
            id: None,
            arn: None,
            stack_id: String::new(),
            name: None,
            short_name: None,
            attributes: AttributeValues::new(),
            auto_assign_elastic_ips: false,
            auto_assign_public_ips: false,
            auto_healing: true,
            install_updates_on_boot: true,
            drain_elb_on_shutdown: true,
            instance_shutdown_timeout: Some(DEFAULT_INSTANCE_SHUTDOWN_TIMEOUT),
            use_ebs_optimized_instances: false,
            custom_instance_profile_arn: None,
            custom_json: None,
            custom_recipes: CustomRecipes::default(),
            custom_security_group_ids: BTreeSet::new(),
            system_packages: BTreeSet::new(),
            cloudwatch: None,
            volumes: VolumeSet::new(),
            elastic_load_balancer: None,
            load_based_auto_scaling: None,
            tags: Tags::new(),
        }
    }
}

impl LayerInstance {
    pub fn new(stack_id: impl Into<String>) -> Self {
        Self {
            stack_id: stack_id.into(),
            ..Default::default()
        }
    }

    /// Container cluster this layer is registered with, if any
    pub fn cluster_arn(&self) -> Option<&str> {
        self.attributes
            .get(CLUSTER_ARN_KEY)
            .and_then(|v| v.as_str())
            .filter(|arn| !arn.is_empty())
    }

    /// Name sent to the remote API
    pub fn resolved_name(&self, descriptor: &VariantDescriptor) -> Option<String> {
        self.name
            .clone()
            .or_else(|| descriptor.default_name.map(str::to_string))
    }

    /// Short name sent to the remote API
    pub fn resolved_short_name(&self, descriptor: &VariantDescriptor) -> String {
        if descriptor.custom_short_name {
            self.short_name.clone().unwrap_or_default()
        } else {
            descriptor.type_name.to_string()
        }
    }

    /// Check the instance against its variant before any remote call
    pub fn validate(&self, descriptor: &VariantDescriptor) -> Result<()> {
        if self.stack_id.is_empty() {
            return Err(LayerError::Validation("stack_id is required".to_string()));
        }
        if self
            .resolved_name(descriptor)
            .is_none_or(|name| name.is_empty())
        {
            return Err(LayerError::Validation("name is required".to_string()));
        }
        if descriptor.custom_short_name
            && self.short_name.as_deref().is_none_or(str::is_empty)
        {
            return Err(LayerError::Validation("short_name is required".to_string()));
        }

        validate_values(&descriptor.attributes, &self.attributes)?;

        if let Some(json) = &self.custom_json {
            normalize_json(json)?;
        }
        if let Some(cloudwatch) = &self.cloudwatch {
            cloudwatch.validate()?;
        }
        self.volumes.validate()?;
        if let Some(scaling) = &self.load_based_auto_scaling {
            scaling.validate()?;
        }

        Ok(())
    }
}

/// Parse a JSON document and re-serialise it compactly
pub fn normalize_json(raw: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| LayerError::Validation(format!("custom_json is not valid JSON: {}", e)))?;
    Ok(value.to_string())
}
