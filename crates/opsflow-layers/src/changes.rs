//! Change detection between two observations of a layer

use crate::model::{LayerInstance, normalize_json};
use crate::translate::CloudWatchLogConfig;
use crate::variant::VariantDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Independently guarded group of layer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeGroup {
    /// The variant's attribute bag, as a whole
    Attributes,
    Name,
    ShortName,
    AutoAssignElasticIps,
    AutoAssignPublicIps,
    AutoHealing,
    InstallUpdatesOnBoot,
    /// Drain-on-shutdown flag and shutdown timeout
    ShutdownEvent,
    UseEbsOptimizedInstances,
    CustomInstanceProfileArn,
    CustomJson,
    CustomRecipes,
    SecurityGroups,
    SystemPackages,
    CloudWatch,
    Volumes,
    LoadBalancer,
    AutoScaling,
    Tags,
}

impl ChangeGroup {
    /// Whether the group is carried by the update-layer request itself
    pub fn is_layer_field(self) -> bool {
        !matches!(
            self,
            ChangeGroup::LoadBalancer | ChangeGroup::AutoScaling | ChangeGroup::Tags
        )
    }
}

impl fmt::Display for ChangeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeGroup::Attributes => "attributes",
            ChangeGroup::Name => "name",
            ChangeGroup::ShortName => "short_name",
            ChangeGroup::AutoAssignElasticIps => "auto_assign_elastic_ips",
            ChangeGroup::AutoAssignPublicIps => "auto_assign_public_ips",
            ChangeGroup::AutoHealing => "auto_healing",
            ChangeGroup::InstallUpdatesOnBoot => "install_updates_on_boot",
            ChangeGroup::ShutdownEvent => "shutdown_event",
            ChangeGroup::UseEbsOptimizedInstances => "use_ebs_optimized_instances",
            ChangeGroup::CustomInstanceProfileArn => "custom_instance_profile_arn",
            ChangeGroup::CustomJson => "custom_json",
            ChangeGroup::CustomRecipes => "custom_recipes",
            ChangeGroup::SecurityGroups => "custom_security_group_ids",
            ChangeGroup::SystemPackages => "system_packages",
            ChangeGroup::CloudWatch => "cloudwatch_configuration",
            ChangeGroup::Volumes => "ebs_volume",
            ChangeGroup::LoadBalancer => "elastic_load_balancer",
            ChangeGroup::AutoScaling => "load_based_auto_scaling",
            ChangeGroup::Tags => "tags",
        };
        f.write_str(name)
    }
}

/// Groups that differ between an old and a new observation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    groups: BTreeSet<ChangeGroup>,
    /// Changed fields that cannot be updated in place
    replacements: Vec<String>,
}

impl ChangeSet {
    pub fn between(descriptor: &VariantDescriptor, old: &LayerInstance, new: &LayerInstance) -> Self {
        let mut changes = ChangeSet::default();

        if old.stack_id != new.stack_id {
            changes.replacements.push("stack_id".to_string());
        }

        for def in &descriptor.attributes {
            if def.resolve(&old.attributes) != def.resolve(&new.attributes) {
                changes.groups.insert(ChangeGroup::Attributes);
                if def.force_replace {
                    changes.replacements.push(def.key.to_string());
                }
            }
        }

        changes.guard(
            ChangeGroup::Name,
            old.resolved_name(descriptor) != new.resolved_name(descriptor),
        );
        changes.guard(
            ChangeGroup::ShortName,
            descriptor.custom_short_name && old.short_name != new.short_name,
        );
        changes.guard(
            ChangeGroup::AutoAssignElasticIps,
            old.auto_assign_elastic_ips != new.auto_assign_elastic_ips,
        );
        changes.guard(
            ChangeGroup::AutoAssignPublicIps,
            old.auto_assign_public_ips != new.auto_assign_public_ips,
        );
        changes.guard(ChangeGroup::AutoHealing, old.auto_healing != new.auto_healing);
        changes.guard(
            ChangeGroup::InstallUpdatesOnBoot,
            old.install_updates_on_boot != new.install_updates_on_boot,
        );
        changes.guard(
            ChangeGroup::ShutdownEvent,
            old.drain_elb_on_shutdown != new.drain_elb_on_shutdown
                || old.instance_shutdown_timeout != new.instance_shutdown_timeout,
        );
        changes.guard(
            ChangeGroup::UseEbsOptimizedInstances,
            old.use_ebs_optimized_instances != new.use_ebs_optimized_instances,
        );
        changes.guard(
            ChangeGroup::CustomInstanceProfileArn,
            old.custom_instance_profile_arn != new.custom_instance_profile_arn,
        );
        changes.guard(
            ChangeGroup::CustomJson,
            comparable_json(&old.custom_json) != comparable_json(&new.custom_json),
        );
        changes.guard(
            ChangeGroup::CustomRecipes,
            old.custom_recipes != new.custom_recipes,
        );
        changes.guard(
            ChangeGroup::SecurityGroups,
            old.custom_security_group_ids != new.custom_security_group_ids,
        );
        changes.guard(
            ChangeGroup::SystemPackages,
            old.system_packages != new.system_packages,
        );
        changes.guard(
            ChangeGroup::CloudWatch,
            active_cloudwatch(old) != active_cloudwatch(new),
        );
        changes.guard(ChangeGroup::Volumes, old.volumes != new.volumes);
        changes.guard(
            ChangeGroup::LoadBalancer,
            load_balancer(old) != load_balancer(new),
        );
        changes.guard(ChangeGroup::AutoScaling, auto_scaling_changed(old, new));
        changes.guard(ChangeGroup::Tags, old.tags != new.tags);

        changes
    }

    fn guard(&mut self, group: ChangeGroup, changed: bool) {
        if changed {
            self.groups.insert(group);
        }
    }

    pub fn contains(&self, group: ChangeGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.replacements.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = ChangeGroup> + '_ {
        self.groups.iter().copied()
    }

    /// Whether an update-layer request is needed at all
    pub fn requires_layer_update(&self) -> bool {
        self.groups.iter().any(|g| g.is_layer_field())
    }

    /// Whether the layer must be destroyed and recreated
    pub fn requires_replacement(&self) -> bool {
        !self.replacements.is_empty()
    }

    pub fn replacement_fields(&self) -> &[String] {
        &self.replacements
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() && self.replacements.is_empty() {
            return write!(f, "no changes");
        }

        let groups: Vec<String> = self.groups.iter().map(ChangeGroup::to_string).collect();
        write!(f, "{} changed", groups.join(", "))?;
        if !self.replacements.is_empty() {
            write!(f, " (forces replacement: {})", self.replacements.join(", "))?;
        }
        Ok(())
    }
}

fn load_balancer(layer: &LayerInstance) -> Option<&str> {
    layer
        .elastic_load_balancer
        .as_deref()
        .filter(|name| !name.is_empty())
}

/// A disabled block with no streams is what the remote side reports once
/// shipping was switched off, and is the same as no block
fn active_cloudwatch(layer: &LayerInstance) -> Option<&CloudWatchLogConfig> {
    layer
        .cloudwatch
        .as_ref()
        .filter(|cw| cw.enabled || !cw.log_streams.is_empty())
}

/// Auto scaling is optional and computed: dropping the block only matters
/// while it is still enabled remotely
fn auto_scaling_changed(old: &LayerInstance, new: &LayerInstance) -> bool {
    match (&old.load_based_auto_scaling, &new.load_based_auto_scaling) {
        (old, None) => old.as_ref().is_some_and(|scaling| scaling.enable),
        (old, Some(new)) => old.as_ref() != Some(new),
    }
}

/// Normalised form where possible, so formatting differences are not changes
fn comparable_json(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| normalize_json(s).unwrap_or_else(|_| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValue;
    use crate::translate::{LoadBasedAutoScaling, ScalingThresholds, VolumeConfig};
    use crate::variant::{CLUSTER_ARN_KEY, LayerVariant};

    fn haproxy() -> LayerInstance {
        let mut layer = LayerInstance::new("stack-1");
        layer
            .attributes
            .insert("stats_password".to_string(), "pw".into());
        layer
    }

    #[test]
    fn test_identical_layers_have_no_changes() {
        let descriptor = LayerVariant::HaProxy.descriptor();
        let changes = ChangeSet::between(descriptor, &haproxy(), &haproxy());
        assert!(changes.is_empty());
        assert_eq!(changes.to_string(), "no changes");
    }

    #[test]
    fn test_explicit_default_is_not_a_change() {
        let descriptor = LayerVariant::HaProxy.descriptor();
        let mut new = haproxy();
        new.attributes
            .insert("stats_url".to_string(), "/haproxy?stats".into());
        new.name = Some("HAProxy".to_string());

        assert!(ChangeSet::between(descriptor, &haproxy(), &new).is_empty());
    }

    #[test]
    fn test_tags_only_needs_no_layer_update() {
        let descriptor = LayerVariant::HaProxy.descriptor();
        let mut new = haproxy();
        new.tags.insert("env".to_string(), "prod".to_string());

        let changes = ChangeSet::between(descriptor, &haproxy(), &new);
        assert_eq!(changes.groups().collect::<Vec<_>>(), vec![ChangeGroup::Tags]);
        assert!(!changes.requires_layer_update());
        assert!(!changes.requires_replacement());
    }

    #[test]
    fn test_nested_groups_guarded_independently() {
        let descriptor = LayerVariant::StaticWeb.descriptor();
        let old = LayerInstance::new("stack-1");
        let mut new = old.clone();
        new.volumes.insert(VolumeConfig::new("/data", 1, 10));
        new.system_packages.insert("htop".to_string());

        let changes = ChangeSet::between(descriptor, &old, &new);
        assert!(changes.contains(ChangeGroup::Volumes));
        assert!(changes.contains(ChangeGroup::SystemPackages));
        assert!(!changes.contains(ChangeGroup::CloudWatch));
        assert!(!changes.contains(ChangeGroup::SecurityGroups));
        assert!(changes.requires_layer_update());
        assert_eq!(
            changes.to_string(),
            "system_packages, ebs_volume changed"
        );
    }

    #[test]
    fn test_force_replace_fields_reported() {
        let descriptor = LayerVariant::EcsCluster.descriptor();
        let mut old = LayerInstance::new("stack-1");
        old.attributes.insert(
            CLUSTER_ARN_KEY.to_string(),
            AttributeValue::from("arn:aws:ecs:us-east-1:1:cluster/a"),
        );
        let mut new = old.clone();
        new.attributes.insert(
            CLUSTER_ARN_KEY.to_string(),
            AttributeValue::from("arn:aws:ecs:us-east-1:1:cluster/b"),
        );
        new.stack_id = "stack-2".to_string();

        let changes = ChangeSet::between(descriptor, &old, &new);
        assert!(changes.requires_replacement());
        assert_eq!(changes.replacement_fields(), ["stack_id", CLUSTER_ARN_KEY]);
    }

    #[test]
    fn test_custom_json_formatting_is_not_a_change() {
        let descriptor = LayerVariant::PhpApp.descriptor();
        let mut old = LayerInstance::new("stack-1");
        old.custom_json = Some(r#"{"a":1}"#.to_string());
        let mut new = old.clone();
        new.custom_json = Some("{ \"a\" : 1 }".to_string());

        assert!(ChangeSet::between(descriptor, &old, &new).is_empty());
    }

    #[test]
    fn test_disabled_cloudwatch_equals_none() {
        let descriptor = LayerVariant::PhpApp.descriptor();
        let mut old = LayerInstance::new("stack-1");
        old.cloudwatch = Some(CloudWatchLogConfig {
            enabled: false,
            log_streams: Vec::new(),
        });
        let new = LayerInstance::new("stack-1");

        assert!(ChangeSet::between(descriptor, &old, &new).is_empty());
        assert!(ChangeSet::between(descriptor, &new, &old).is_empty());

        old.cloudwatch = Some(CloudWatchLogConfig {
            enabled: true,
            log_streams: Vec::new(),
        });
        let changes = ChangeSet::between(descriptor, &old, &new);
        assert!(changes.contains(ChangeGroup::CloudWatch));
    }

    #[test]
    fn test_absent_auto_scaling_keeps_disabled_observation() {
        let descriptor = LayerVariant::PhpApp.descriptor();
        let mut old = LayerInstance::new("stack-1");
        old.load_based_auto_scaling = Some(LoadBasedAutoScaling {
            enable: false,
            upscaling: Some(ScalingThresholds::upscaling()),
            downscaling: None,
        });
        let new = LayerInstance::new("stack-1");
        assert!(ChangeSet::between(descriptor, &old, &new).is_empty());

        if let Some(scaling) = old.load_based_auto_scaling.as_mut() {
            scaling.enable = true;
        }
        let changes = ChangeSet::between(descriptor, &old, &new);
        assert_eq!(
            changes.groups().collect::<Vec<_>>(),
            vec![ChangeGroup::AutoScaling]
        );
        assert!(!changes.requires_layer_update());

        let mut enabled = new.clone();
        enabled.load_based_auto_scaling = Some(LoadBasedAutoScaling {
            enable: true,
            ..Default::default()
        });
        assert!(ChangeSet::between(descriptor, &new, &enabled).contains(ChangeGroup::AutoScaling));
    }

    #[test]
    fn test_empty_load_balancer_equals_none() {
        let descriptor = LayerVariant::PhpApp.descriptor();
        let old = LayerInstance::new("stack-1");
        let mut new = old.clone();
        new.elastic_load_balancer = Some(String::new());

        assert!(ChangeSet::between(descriptor, &old, &new).is_empty());
    }
}
