//
// src/client/mod.rs
//
mod api;
mod backend;
mod memory;

pub use api::{ClientError, LoadBalancerClient};
pub use backend::BackendServer;
pub use memory::{BackendCall, InMemoryLoadBalancer, Operation};
