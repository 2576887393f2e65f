//! Layer variant registry
//!
//! The remote API has a single "layer" object whose kinds differ only in the
//! settings packed into its attribute bag. Each kind is one [`LayerVariant`]
//! arm carrying a statically initialised [`VariantDescriptor`].

use crate::attribute::{AttributeDefinition, Validation, validate_table};
use crate::error::Result;
use crate::schema::check_collisions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Attribute key that links a layer to a container cluster
pub const CLUSTER_ARN_KEY: &str = "ecs_cluster_arn";

/// Immutable description of one layer kind
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDescriptor {
    /// Remote type tag (e.g. "lb", "db-master")
    pub type_name: &'static str,
    /// Fixed display name; when `None` the caller must supply a name
    pub default_name: Option<&'static str>,
    /// The caller must supply a short name
    pub custom_short_name: bool,
    pub attributes: Vec<AttributeDefinition>,
}

impl VariantDescriptor {
    pub fn attribute(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|def| def.key == key)
    }

    /// Whether layers of this kind carry a cluster registration
    pub fn registers_cluster(&self) -> bool {
        self.attribute(CLUSTER_ARN_KEY).is_some()
    }

    /// Check the attribute table for authoring defects
    pub fn validate(&self) -> Result<()> {
        validate_table(&self.attributes)?;
        check_collisions(&self.attributes)
    }
}

/// All supported layer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerVariant {
    Custom,
    EcsCluster,
    Ganglia,
    HaProxy,
    JavaApp,
    Memcached,
    Mysql,
    NodejsApp,
    PhpApp,
    RailsApp,
    StaticWeb,
}

impl LayerVariant {
    pub const ALL: [LayerVariant; 11] = [
        LayerVariant::Custom,
        LayerVariant::EcsCluster,
        LayerVariant::Ganglia,
        LayerVariant::HaProxy,
        LayerVariant::JavaApp,
        LayerVariant::Memcached,
        LayerVariant::Mysql,
        LayerVariant::NodejsApp,
        LayerVariant::PhpApp,
        LayerVariant::RailsApp,
        LayerVariant::StaticWeb,
    ];

    pub fn descriptor(self) -> &'static VariantDescriptor {
        match self {
            LayerVariant::Custom => &CUSTOM,
            LayerVariant::EcsCluster => &ECS_CLUSTER,
            LayerVariant::Ganglia => &GANGLIA,
            LayerVariant::HaProxy => &HAPROXY,
            LayerVariant::JavaApp => &JAVA_APP,
            LayerVariant::Memcached => &MEMCACHED,
            LayerVariant::Mysql => &MYSQL,
            LayerVariant::NodejsApp => &NODEJS_APP,
            LayerVariant::PhpApp => &PHP_APP,
            LayerVariant::RailsApp => &RAILS_APP,
            LayerVariant::StaticWeb => &STATIC_WEB,
        }
    }

    /// Resource name exposed to the host tool
    pub fn resource_name(self) -> &'static str {
        match self {
            LayerVariant::Custom => "opsworks_custom_layer",
            LayerVariant::EcsCluster => "opsworks_ecs_cluster_layer",
            LayerVariant::Ganglia => "opsworks_ganglia_layer",
            LayerVariant::HaProxy => "opsworks_haproxy_layer",
            LayerVariant::JavaApp => "opsworks_java_app_layer",
            LayerVariant::Memcached => "opsworks_memcached_layer",
            LayerVariant::Mysql => "opsworks_mysql_layer",
            LayerVariant::NodejsApp => "opsworks_nodejs_app_layer",
            LayerVariant::PhpApp => "opsworks_php_app_layer",
            LayerVariant::RailsApp => "opsworks_rails_app_layer",
            LayerVariant::StaticWeb => "opsworks_static_web_layer",
        }
    }

    /// Look a variant up by its remote type tag
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.descriptor().type_name == type_name)
    }
}

impl fmt::Display for LayerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

fn plain(type_name: &'static str, default_name: &'static str) -> VariantDescriptor {
    VariantDescriptor {
        type_name,
        default_name: Some(default_name),
        custom_short_name: false,
        attributes: Vec::new(),
    }
}

static CUSTOM: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    type_name: "custom",
    default_name: None,
    custom_short_name: true,
    attributes: Vec::new(),
});

static ECS_CLUSTER: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string(CLUSTER_ARN_KEY, "EcsClusterArn")
            .required()
            .force_replace()
            .validated_by(Validation::Arn),
    ],
    ..plain("ecs-cluster", "Ecs Cluster")
});

static GANGLIA: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string("url", "GangliaUrl").with_default("/ganglia"),
        AttributeDefinition::string("username", "GangliaUser").with_default("opsworks"),
        AttributeDefinition::string("password", "GangliaPassword")
            .required()
            .write_only(),
    ],
    ..plain("monitoring-master", "Ganglia")
});

static HAPROXY: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::bool("stats_enabled", "EnableHaproxyStats").with_default(true),
        AttributeDefinition::string("stats_url", "HaproxyStatsUrl").with_default("/haproxy?stats"),
        AttributeDefinition::string("stats_user", "HaproxyStatsUser").with_default("opsworks"),
        AttributeDefinition::string("stats_password", "HaproxyStatsPassword")
            .required()
            .write_only(),
        AttributeDefinition::string("healthcheck_url", "HaproxyHealthCheckUrl").with_default("/"),
        AttributeDefinition::string("healthcheck_method", "HaproxyHealthCheckMethod")
            .with_default("OPTIONS"),
    ],
    ..plain("lb", "HAProxy")
});

static JAVA_APP: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string("jvm_type", "Jvm").with_default("openjdk"),
        AttributeDefinition::string("jvm_version", "JvmVersion").with_default("7"),
        AttributeDefinition::string("jvm_options", "JvmOptions").with_default(""),
        AttributeDefinition::string("app_server", "JavaAppServer").with_default("tomcat"),
        AttributeDefinition::string("app_server_version", "JavaAppServerVersion")
            .with_default("7"),
    ],
    ..plain("java-app", "Java App Server")
});

static MEMCACHED: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::int("allocated_memory", "MemcachedMemory").with_default(512_i64),
    ],
    ..plain("memcached", "Memcached")
});

static MYSQL: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string("root_password", "MysqlRootPassword").write_only(),
        AttributeDefinition::bool("root_password_on_all_instances", "MysqlRootPasswordUbiquitous")
            .with_default(true),
    ],
    ..plain("db-master", "MySQL")
});

static NODEJS_APP: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string("nodejs_version", "NodejsVersion").with_default("0.10.38"),
    ],
    ..plain("nodejs-app", "Node.js App Server")
});

static PHP_APP: LazyLock<VariantDescriptor> =
    LazyLock::new(|| plain("php-app", "PHP App Server"));

static RAILS_APP: LazyLock<VariantDescriptor> = LazyLock::new(|| VariantDescriptor {
    attributes: vec![
        AttributeDefinition::string("ruby_version", "RubyVersion").with_default("2.0.0"),
        AttributeDefinition::string("app_server", "RailsStack").with_default("apache_passenger"),
        AttributeDefinition::string("passenger_version", "PassengerVersion")
            .with_default("4.0.46"),
        AttributeDefinition::string("rubygems_version", "RubygemsVersion").with_default("2.2.2"),
        AttributeDefinition::bool("manage_bundler", "ManageBundler").with_default(true),
        AttributeDefinition::string("bundler_version", "BundlerVersion").with_default("1.5.3"),
    ],
    ..plain("rails-app", "Rails App Server")
});

static STATIC_WEB: LazyLock<VariantDescriptor> =
    LazyLock::new(|| plain("web", "Static Web Server"));
