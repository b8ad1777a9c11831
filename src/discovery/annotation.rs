// src/discovery/annotation.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ANNOTATION_BACKEND_COUNT: &str =
    "service.beta.kubernetes.io/cce-load-balancer-backend-count";

/// The Kubernetes service a load balancer fronts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// `namespace/name`, or just the name outside a namespace.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("annotation {key} has non-integer value {value:?}")]
    InvalidInteger {
        key: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Load balancer settings resolved from service annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceAnnotations {
    /// Desired backend count; zero or below means unset.
    pub backend_count: i64,
}

impl ServiceAnnotations {
    pub fn extract(service: &ServiceDescriptor) -> Result<Self, AnnotationError> {
        let mut annotations = Self::default();

        if let Some(raw) = service.annotations.get(ANNOTATION_BACKEND_COUNT) {
            annotations.backend_count =
                raw.trim()
                    .parse()
                    .map_err(|source| AnnotationError::InvalidInteger {
                        key: ANNOTATION_BACKEND_COUNT,
                        value: raw.clone(),
                        source,
                    })?;
        }

        Ok(annotations)
    }
}
