// src/client/api.rs
use async_trait::async_trait;

use super::backend::BackendServer;

/// Backend-membership operations of a cloud load balancer API.
///
/// Transport, signing, retries and timeouts live behind this trait.
#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    async fn describe_backend_servers(&self, lb_id: &str) -> Result<Vec<BackendServer>, ClientError>;

    async fn add_backend_servers(
        &self,
        lb_id: &str,
        backends: Vec<BackendServer>,
    ) -> Result<(), ClientError>;

    async fn update_backend_servers(
        &self,
        lb_id: &str,
        backends: Vec<BackendServer>,
    ) -> Result<(), ClientError>;

    async fn remove_backend_servers(
        &self,
        lb_id: &str,
        instance_ids: Vec<String>,
    ) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Load balancer not found: {0}")]
    LoadBalancerNotFound(String),

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}
