// src/discovery/mod.rs
mod annotation;
mod node;

pub use annotation::{AnnotationError, ServiceAnnotations, ServiceDescriptor, ANNOTATION_BACKEND_COUNT};
pub use node::{build_candidates, NodeDescriptor, PROVIDER_ID_SEPARATOR};
