// src/reconciler/error.rs
use crate::client::ClientError;
use crate::discovery::AnnotationError;

/// Why a reconcile pass stopped.
///
/// Client failures carry the client's error untouched as `source`.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to resolve annotations of service {service}")]
    Annotation {
        service: String,
        #[source]
        source: AnnotationError,
    },

    #[error("failed to describe backend servers of {lb_id}")]
    Describe {
        lb_id: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to add backend servers to {lb_id}")]
    AddBackends {
        lb_id: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to update backend server weights on {lb_id}")]
    UpdateWeights {
        lb_id: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to remove backend servers from {lb_id}")]
    RemoveBackends {
        lb_id: String,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    /// The client error behind this failure, if a client call failed.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            ReconcileError::Annotation { .. } => None,
            ReconcileError::Describe { source, .. }
            | ReconcileError::AddBackends { source, .. }
            | ReconcileError::UpdateWeights { source, .. }
            | ReconcileError::RemoveBackends { source, .. } => Some(source),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Annotation { .. } => "annotation_error",
            ReconcileError::Describe { .. } => "describe_error",
            ReconcileError::AddBackends { .. } => "add_error",
            ReconcileError::UpdateWeights { .. } => "update_error",
            ReconcileError::RemoveBackends { .. } => "remove_error",
        }
    }
}
