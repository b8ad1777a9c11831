// src/lib.rs
pub mod client;
pub mod config;
pub mod discovery;
pub mod metrics;
pub mod reconciler;
