//
// src/reconciler/mod.rs
//
mod capacity;
mod controller;
mod error;
mod executor;
mod planner;
mod reconciler;

pub use capacity::resolve_target_capacity;
pub use controller::ReconcileController;
pub use error::ReconcileError;
pub use executor::{fetch_backend_servers, PlanExecutor};
pub use planner::{DiffPlanner, ReconcilePlan};
pub use reconciler::{BackendReconciler, ReconcileReport};
