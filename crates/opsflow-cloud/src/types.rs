//! Request and response shapes exchanged with the remote layer API
//!
//! Field names follow the remote API's PascalCase JSON convention. Every
//! optional field is omitted from the wire when unset, which is what gives
//! update requests their partial-update semantics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote attribute bag: flat string keys to string values
pub type RemoteAttributes = BTreeMap<String, String>;

/// Tag map attached to a remote object
pub type Tags = BTreeMap<String, String>;

/// Custom recipes run at each lifecycle event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Recipes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configure: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undeploy: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShutdownEventConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_until_elb_connections_drained: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEventConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<ShutdownEventConfiguration>,
}

/// One log stream shipped to CloudWatch Logs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchLogsLogStream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_fingerprint_lines: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_line_start_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchLogsConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_streams: Option<Vec<CloudWatchLogsLogStream>>,
}

/// EBS volume set attached to every instance in the layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_disks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_metrics_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds_wait_time: Option<i64>,
}

/// Load-based auto scaling as reported by the remote API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBasedAutoScalingConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_scaling: Option<AutoScalingThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_scaling: Option<AutoScalingThresholds>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetLoadBasedAutoScalingRequest {
    pub layer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_scaling: Option<AutoScalingThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_scaling: Option<AutoScalingThresholds>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElasticLoadBalancer {
    pub elastic_load_balancer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
}

/// create-layer request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateLayerRequest {
    pub stack_id: String,
    #[serde(rename = "Type")]
    pub layer_type: String,
    pub name: String,
    pub shortname: String,
    #[serde(default)]
    pub attributes: RemoteAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_elastic_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_public_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_healing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_updates_on_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_event_configuration: Option<LifecycleEventConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_watch_logs_configuration: Option<CloudWatchLogsConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_recipes: Option<Recipes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_security_group_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instance_profile_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    #[serde(default)]
    pub volume_configurations: Vec<VolumeConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ebs_optimized_instances: Option<bool>,
}

/// update-layer request; every `None` leaves the remote field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateLayerRequest {
    pub layer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<RemoteAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_elastic_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_public_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_healing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_updates_on_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_event_configuration: Option<LifecycleEventConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_watch_logs_configuration: Option<CloudWatchLogsConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_recipes: Option<Recipes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_security_group_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instance_profile_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_configurations: Option<Vec<VolumeConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ebs_optimized_instances: Option<bool>,
}

impl UpdateLayerRequest {
    pub fn new(layer_id: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            ..Default::default()
        }
    }
}

/// read-layer response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Layer {
    pub layer_id: String,
    pub stack_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(rename = "Type")]
    pub layer_type: String,
    pub name: String,
    pub shortname: String,
    #[serde(default)]
    pub attributes: RemoteAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_elastic_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assign_public_ips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_healing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_updates_on_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_event_configuration: Option<LifecycleEventConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_watch_logs_configuration: Option<CloudWatchLogsConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_recipes: Option<Recipes>,
    #[serde(default)]
    pub custom_security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instance_profile_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_json: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub volume_configurations: Vec<VolumeConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ebs_optimized_instances: Option<bool>,
}
