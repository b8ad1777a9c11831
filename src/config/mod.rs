// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(&contents, path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|s| s.to_str());
    let config: Config = if matches!(extension, Some("yaml") | Some("yml")) {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_by_extension() {
        let yaml = r#"
reconcile:
  policy: weight_aware
  interval_secs: 5
load_balancers:
  - id: lb-web
    service:
      name: web
      namespace: prod
      annotations:
        service.beta.kubernetes.io/cce-load-balancer-backend-count: "3"
    nodes:
      - name: node-a
        provider_id: "cce://i-aaa"
    backends:
      - instance_id: i-old
        weight: 0
"#;
        let config = parse_config(yaml, Path::new("config.yaml")).unwrap();
        assert_eq!(config.reconcile.interval_secs, 5);
        assert_eq!(config.load_balancers.len(), 1);
        let target = &config.load_balancers[0];
        assert_eq!(target.nodes[0].provider_id, "cce://i-aaa");
        assert_eq!(target.backends[0].weight, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_json_otherwise() {
        let json = r#"{"load_balancers": [{"id": "lb-1", "service": {"name": "api"}}]}"#;
        let config = parse_config(json, Path::new("config.json")).unwrap();
        assert_eq!(config.load_balancers[0].service.name, "api");
        assert_eq!(config.reconcile.default_backend_count, DEFAULT_BACKEND_COUNT);
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/reconciler.yaml").await;
        assert!(result.is_err());
    }
}
