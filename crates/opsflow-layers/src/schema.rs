//! Declarative schema exposed to the host tool
//!
//! Every variant shares the same base fields; the variant's attribute table
//! is appended to them. The result serialises to JSON and is the stable
//! description of what a layer resource accepts.

use crate::attribute::{AttributeDefinition, ScalarKind};
use crate::error::{LayerError, Result};
use crate::model::DEFAULT_INSTANCE_SHUTDOWN_TIMEOUT;
use crate::translate::{cloudwatch, volume};
use crate::variant::VariantDescriptor;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;

/// Names of the fields every layer schema carries
pub const BASE_FIELD_NAMES: &[&str] = &[
    "arn",
    "stack_id",
    "name",
    "short_name",
    "auto_assign_elastic_ips",
    "auto_assign_public_ips",
    "auto_healing",
    "install_updates_on_boot",
    "drain_elb_on_shutdown",
    "instance_shutdown_timeout",
    "use_ebs_optimized_instances",
    "custom_instance_profile_arn",
    "custom_json",
    "custom_setup_recipes",
    "custom_configure_recipes",
    "custom_deploy_recipes",
    "custom_undeploy_recipes",
    "custom_shutdown_recipes",
    "custom_security_group_ids",
    "system_packages",
    "cloudwatch_configuration",
    "ebs_volume",
    "elastic_load_balancer",
    "load_based_auto_scaling",
    "tags",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Float,
    StringList,
    StringSet,
    StringMap,
    /// Nested block with at most `max_items` entries
    Block {
        max_items: Option<usize>,
        fields: Vec<SchemaField>,
    },
    /// Unordered nested blocks, unique by `key`
    BlockSet {
        key: &'static str,
        fields: Vec<SchemaField>,
    },
}

impl From<ScalarKind> for FieldKind {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::String => FieldKind::String,
            ScalarKind::Int => FieldKind::Int,
            ScalarKind::Bool => FieldKind::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMode {
    Required,
    Optional,
    Computed,
    ForceReplace,
    WriteOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub modes: BTreeSet<FieldMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl SchemaField {
    fn new(name: &'static str, kind: FieldKind, modes: &[FieldMode]) -> Self {
        Self {
            name,
            kind,
            modes: modes.iter().copied().collect(),
            default: None,
        }
    }

    fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, &[FieldMode::Required])
    }

    fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, &[FieldMode::Optional])
    }

    fn computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, &[FieldMode::Computed])
    }

    fn with_mode(mut self, mode: FieldMode) -> Self {
        self.modes.insert(mode);
        self
    }

    fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn has_mode(&self, mode: FieldMode) -> bool {
        self.modes.contains(&mode)
    }

    fn from_attribute(def: &AttributeDefinition) -> Self {
        let mut field = if def.required {
            Self::required(def.key, def.kind.into())
        } else {
            Self::optional(def.key, def.kind.into())
        };
        if def.force_replace {
            field = field.with_mode(FieldMode::ForceReplace);
        }
        if def.write_only {
            field = field.with_mode(FieldMode::WriteOnly);
        }
        field.default = def.default.as_ref().map(|v| v.to_json());
        field
    }
}

/// Complete schema for one layer variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub type_name: &'static str,
    pub fields: Vec<SchemaField>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| LayerError::Validation(format!("schema is not serialisable: {}", e)))
    }
}

/// Merge the base fields with the variant's attribute table
pub fn build_schema(descriptor: &VariantDescriptor) -> Result<Schema> {
    descriptor.validate()?;

    let mut fields = base_fields(descriptor);
    fields.extend(descriptor.attributes.iter().map(SchemaField::from_attribute));

    Ok(Schema {
        type_name: descriptor.type_name,
        fields,
    })
}

/// Reject attribute keys that shadow a base field
pub fn check_collisions(table: &[AttributeDefinition]) -> Result<()> {
    match table.iter().find(|def| BASE_FIELD_NAMES.contains(&def.key)) {
        Some(def) => Err(LayerError::Validation(format!(
            "attribute {} collides with a base schema field",
            def.key
        ))),
        None => Ok(()),
    }
}

fn base_fields(descriptor: &VariantDescriptor) -> Vec<SchemaField> {
    let name = match descriptor.default_name {
        Some(default) => SchemaField::optional("name", FieldKind::String).with_default(json!(default)),
        None => SchemaField::required("name", FieldKind::String),
    };

    let mut fields = vec![
        SchemaField::computed("arn", FieldKind::String),
        SchemaField::required("stack_id", FieldKind::String).with_mode(FieldMode::ForceReplace),
        name,
    ];

    if descriptor.custom_short_name {
        fields.push(SchemaField::required("short_name", FieldKind::String));
    }

    fields.extend([
        SchemaField::optional("auto_assign_elastic_ips", FieldKind::Bool).with_default(json!(false)),
        SchemaField::optional("auto_assign_public_ips", FieldKind::Bool).with_default(json!(false)),
        SchemaField::optional("auto_healing", FieldKind::Bool).with_default(json!(true)),
        SchemaField::optional("install_updates_on_boot", FieldKind::Bool).with_default(json!(true)),
        SchemaField::optional("drain_elb_on_shutdown", FieldKind::Bool).with_default(json!(true)),
        SchemaField::optional("instance_shutdown_timeout", FieldKind::Int)
            .with_default(json!(DEFAULT_INSTANCE_SHUTDOWN_TIMEOUT)),
        SchemaField::optional("use_ebs_optimized_instances", FieldKind::Bool)
            .with_default(json!(false)),
        SchemaField::optional("custom_instance_profile_arn", FieldKind::String),
        SchemaField::optional("custom_json", FieldKind::String),
        SchemaField::optional("custom_setup_recipes", FieldKind::StringList),
        SchemaField::optional("custom_configure_recipes", FieldKind::StringList),
        SchemaField::optional("custom_deploy_recipes", FieldKind::StringList),
        SchemaField::optional("custom_undeploy_recipes", FieldKind::StringList),
        SchemaField::optional("custom_shutdown_recipes", FieldKind::StringList),
        SchemaField::optional("custom_security_group_ids", FieldKind::StringSet),
        SchemaField::optional("system_packages", FieldKind::StringSet),
        SchemaField::optional(
            "cloudwatch_configuration",
            FieldKind::Block {
                max_items: Some(1),
                fields: cloudwatch_fields(),
            },
        ),
        SchemaField::optional(
            "ebs_volume",
            FieldKind::BlockSet {
                key: "mount_point",
                fields: volume_fields(),
            },
        )
        .with_mode(FieldMode::Computed),
        SchemaField::optional("elastic_load_balancer", FieldKind::String),
        SchemaField::optional(
            "load_based_auto_scaling",
            FieldKind::Block {
                max_items: Some(1),
                fields: autoscaling_fields(),
            },
        )
        .with_mode(FieldMode::Computed),
        SchemaField::optional("tags", FieldKind::StringMap),
    ]);

    fields
}

fn cloudwatch_fields() -> Vec<SchemaField> {
    let stream = vec![
        SchemaField::required("file", FieldKind::String),
        SchemaField::required("log_group_name", FieldKind::String),
        SchemaField::optional("batch_count", FieldKind::Int)
            .with_default(json!(cloudwatch::DEFAULT_BATCH_COUNT)),
        SchemaField::optional("batch_size", FieldKind::Int)
            .with_default(json!(cloudwatch::DEFAULT_BATCH_SIZE)),
        SchemaField::optional("buffer_duration", FieldKind::Int)
            .with_default(json!(cloudwatch::DEFAULT_BUFFER_DURATION)),
        SchemaField::optional("datetime_format", FieldKind::String),
        SchemaField::optional("encoding", FieldKind::String)
            .with_default(json!(cloudwatch::DEFAULT_ENCODING)),
        SchemaField::optional("file_fingerprint_lines", FieldKind::String)
            .with_default(json!(cloudwatch::DEFAULT_FILE_FINGERPRINT_LINES)),
        SchemaField::optional("initial_position", FieldKind::String)
            .with_default(json!(cloudwatch::DEFAULT_INITIAL_POSITION)),
        SchemaField::optional("multiline_start_pattern", FieldKind::String),
        SchemaField::optional("time_zone", FieldKind::String),
    ];

    vec![
        SchemaField::optional("enabled", FieldKind::Bool).with_default(json!(false)),
        SchemaField::optional(
            "log_streams",
            FieldKind::Block {
                max_items: None,
                fields: stream,
            },
        ),
    ]
}

fn volume_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::required("mount_point", FieldKind::String),
        SchemaField::required("number_of_disks", FieldKind::Int),
        SchemaField::required("size", FieldKind::Int),
        SchemaField::optional("type", FieldKind::String)
            .with_default(json!(volume::DEFAULT_VOLUME_TYPE)),
        SchemaField::optional("raid_level", FieldKind::String).with_default(json!("")),
        SchemaField::optional("iops", FieldKind::Int).with_default(json!(0)),
        SchemaField::optional("encrypted", FieldKind::Bool).with_default(json!(false)),
    ]
}

fn thresholds_fields(cpu: f64, ignore_metrics: i64, wait: i64) -> Vec<SchemaField> {
    vec![
        SchemaField::optional("alarms", FieldKind::StringList),
        SchemaField::optional("cpu_threshold", FieldKind::Float).with_default(json!(cpu)),
        SchemaField::optional("ignore_metrics_time", FieldKind::Int)
            .with_default(json!(ignore_metrics)),
        SchemaField::optional("instance_count", FieldKind::Int).with_default(json!(1)),
        SchemaField::optional("load_threshold", FieldKind::Float),
        SchemaField::optional("memory_threshold", FieldKind::Float),
        SchemaField::optional("thresholds_wait_time", FieldKind::Int).with_default(json!(wait)),
    ]
}

fn autoscaling_fields() -> Vec<SchemaField> {
    let block = |fields| FieldKind::Block {
        max_items: Some(1),
        fields,
    };

    vec![
        SchemaField::optional("enable", FieldKind::Bool).with_default(json!(false)),
        SchemaField::optional("upscaling", block(thresholds_fields(80.0, 5, 5)))
            .with_mode(FieldMode::Computed),
        SchemaField::optional("downscaling", block(thresholds_fields(30.0, 10, 10)))
            .with_mode(FieldMode::Computed),
    ]
}
