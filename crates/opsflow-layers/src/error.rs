//! Layer engine error types

use opsflow_cloud::CloudError;
use std::fmt;
use thiserror::Error;

/// Remote step a lifecycle operation was performing when it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Creating,
    Reading,
    Updating,
    Deleting,
    RegisteringCluster(String),
    DeregisteringCluster(String),
    AttachingLoadBalancer(String),
    DetachingLoadBalancer(String),
    SettingAutoScaling,
    ReadingLoadBalancers,
    ReadingAutoScaling,
    UpdatingTags,
    ReadingTags,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Creating => write!(f, "creating"),
            Operation::Reading => write!(f, "reading"),
            Operation::Updating => write!(f, "updating"),
            Operation::Deleting => write!(f, "deleting"),
            Operation::RegisteringCluster(arn) => write!(f, "registering ECS cluster ({}) for", arn),
            Operation::DeregisteringCluster(arn) => {
                write!(f, "deregistering ECS cluster ({}) of", arn)
            }
            Operation::AttachingLoadBalancer(name) => {
                write!(f, "attaching load balancer ({}) to", name)
            }
            Operation::DetachingLoadBalancer(name) => {
                write!(f, "detaching load balancer ({}) from", name)
            }
            Operation::SettingAutoScaling => write!(f, "setting load-based auto scaling of"),
            Operation::ReadingLoadBalancers => write!(f, "reading load balancers of"),
            Operation::ReadingAutoScaling => write!(f, "reading load-based auto scaling of"),
            Operation::UpdatingTags => write!(f, "updating tags of"),
            Operation::ReadingTags => write!(f, "reading tags of"),
        }
    }
}

/// Lifecycle operation during which a side effect failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Create => write!(f, "create"),
            Lifecycle::Update => write!(f, "update"),
            Lifecycle::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LayerError {
    /// A remote call failed; the remote message is carried verbatim
    #[error("{operation} layer ({target}): {source}")]
    Remote {
        operation: Operation,
        target: String,
        #[source]
        source: CloudError,
    },

    /// A side effect failed after the layer itself was created, updated or
    /// deleted. The remote layer is not in the state the caller asked for.
    #[error("{lifecycle} of layer ({layer_id}) incomplete: {operation} layer ({layer_id}): {source}")]
    PartialFailure {
        lifecycle: Lifecycle,
        layer_id: String,
        operation: Operation,
        #[source]
        source: CloudError,
    },

    /// Variant table or input is self-contradictory
    #[error("Invalid layer definition: {0}")]
    Validation(String),
}

impl LayerError {
    pub(crate) fn remote(
        operation: Operation,
        target: impl Into<String>,
        source: CloudError,
    ) -> Self {
        LayerError::Remote {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn partial(
        lifecycle: Lifecycle,
        layer_id: impl Into<String>,
        operation: Operation,
        source: CloudError,
    ) -> Self {
        LayerError::PartialFailure {
            lifecycle,
            layer_id: layer_id.into(),
            operation,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            LayerError::Remote { source, .. } | LayerError::PartialFailure { source, .. } => {
                source.is_not_found()
            }
            LayerError::Validation(_) => false,
        }
    }

    /// Identifier of a layer that exists remotely despite the error
    pub fn orphaned_layer_id(&self) -> Option<&str> {
        match self {
            LayerError::PartialFailure {
                lifecycle: Lifecycle::Create | Lifecycle::Update,
                layer_id,
                ..
            } => Some(layer_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
