// src/reconciler/capacity.rs
use tracing::info;

use crate::config::ReconcileConfig;

/// Number of backends a load balancer should serve with.
///
/// A configured count is honored only when it is positive and below the
/// registration limit; anything else falls back to the default. The result
/// never exceeds the number of candidates.
pub fn resolve_target_capacity(
    configured: i64,
    candidate_count: usize,
    config: &ReconcileConfig,
) -> usize {
    let mut target = config.default_backend_count;

    if configured > 0 {
        match usize::try_from(configured) {
            Ok(count) if count < config.backend_count_limit => target = count,
            _ => info!(
                "configured backend count {} is not below the limit of {}, using default {}",
                configured, config.backend_count_limit, config.default_backend_count
            ),
        }
    }

    target.min(candidate_count)
}
