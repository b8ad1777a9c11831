// tests/reconciler_tests.rs
use lb_backend_reconciler::client::{BackendCall, BackendServer, ClientError, InMemoryLoadBalancer, Operation};
use lb_backend_reconciler::config::ReconcileConfig;
use lb_backend_reconciler::discovery::{NodeDescriptor, ServiceDescriptor, ANNOTATION_BACKEND_COUNT};
use lb_backend_reconciler::metrics::MetricsRegistry;
use lb_backend_reconciler::reconciler::{BackendReconciler, ReconcileError};
use std::collections::BTreeSet;
use std::sync::Arc;

const LB: &str = "lb-web";

fn nodes(ids: &[&str]) -> Vec<NodeDescriptor> {
    ids.iter()
        .map(|id| NodeDescriptor::new(format!("node-{}", id), format!("cce://{}", id)))
        .collect()
}

fn setup(backends: Vec<BackendServer>) -> (InMemoryLoadBalancer, BackendReconciler) {
    let lb = InMemoryLoadBalancer::new();
    lb.insert_load_balancer(LB, backends);
    let reconciler = BackendReconciler::new(Arc::new(lb.clone()), ReconcileConfig::default(), None);
    (lb, reconciler)
}

fn ids<'a>(items: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    items.into_iter().map(|s| s.to_string()).collect()
}

fn operations(lb: &InMemoryLoadBalancer) -> Vec<Operation> {
    lb.calls().iter().map(BackendCall::operation).collect()
}

#[tokio::test]
async fn test_empty_load_balancer_filled_from_candidates() {
    let (lb, reconciler) = setup(Vec::new());

    let report = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A", "B", "C"]), LB)
        .await
        .unwrap();

    assert_eq!(report.target, 3);
    assert_eq!(ids(report.plan.add_ids()), ids(["A", "B", "C"]));
    assert!(report.plan.to_change_weight.is_empty());
    assert!(report.plan.to_delete.is_empty());
    assert!(lb.backends(LB).unwrap().iter().all(|b| b.weight == 100));
    assert_eq!(operations(&lb), vec![Operation::Add]);
}

#[tokio::test]
async fn test_departed_node_drained_then_deleted() {
    let (lb, reconciler) = setup(vec![BackendServer::new("A", 100), BackendServer::new("C", 100)]);
    let service = ServiceDescriptor::new("web");
    let candidates = nodes(&["A", "B"]);

    let first = reconciler.reconcile(&service, &candidates, LB).await.unwrap();
    assert_eq!(first.plan.to_change_weight, vec![BackendServer::drained("C")]);
    assert_eq!(first.plan.to_add, vec![BackendServer::new("B", 100)]);
    assert!(first.plan.to_delete.is_empty());

    // C keeps its registration at weight 0 until the next pass.
    let second = reconciler.reconcile(&service, &candidates, LB).await.unwrap();
    assert_eq!(second.plan.to_delete, vec!["C".to_string()]);
    assert!(second.plan.to_add.is_empty());
    assert!(second.plan.to_change_weight.is_empty());

    let third = reconciler.reconcile(&service, &candidates, LB).await.unwrap();
    assert!(third.plan.is_empty());
    assert_eq!(
        lb.backends(LB).unwrap(),
        vec![BackendServer::new("A", 100), BackendServer::new("B", 100)]
    );
}

#[tokio::test]
async fn test_already_drained_backend_removed() {
    let (lb, reconciler) = setup(vec![BackendServer::drained("A")]);

    let report = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A", "B", "C", "D", "E"]), LB)
        .await
        .unwrap();

    assert_eq!(report.target, 5);
    assert_eq!(report.plan.to_delete, vec!["A".to_string()]);
    assert_eq!(ids(report.plan.add_ids()), ids(["B", "C", "D", "E"]));
    assert_eq!(operations(&lb), vec![Operation::Add, Operation::Remove]);
}

#[tokio::test]
async fn test_oversized_backend_count_ignored() {
    let (lb, reconciler) = setup(Vec::new());
    let service = ServiceDescriptor::new("web").with_annotation(ANNOTATION_BACKEND_COUNT, "150");
    let candidates: Vec<String> = (0..60).map(|i| format!("i-{:02}", i)).collect();
    let candidates: Vec<&str> = candidates.iter().map(|s| s.as_str()).collect();

    let report = reconciler.reconcile(&service, &nodes(&candidates), LB).await.unwrap();

    assert_eq!(report.target, 50);
    assert_eq!(lb.backends(LB).unwrap().len(), 50);
}

#[tokio::test]
async fn test_shrinking_backend_count_drains_surplus() {
    let (lb, reconciler) = setup(Vec::new());
    let candidates = nodes(&["A", "B", "C", "D", "E"]);

    reconciler
        .reconcile(&ServiceDescriptor::new("web"), &candidates, LB)
        .await
        .unwrap();

    let service = ServiceDescriptor::new("web").with_annotation(ANNOTATION_BACKEND_COUNT, "2");
    let report = reconciler.reconcile(&service, &candidates, LB).await.unwrap();

    assert_eq!(report.target, 2);
    assert_eq!(report.plan.to_change_weight.len(), 3);
    let serving = lb
        .backends(LB)
        .unwrap()
        .into_iter()
        .filter(|b| !b.is_drained())
        .count();
    assert_eq!(serving, 2);
}

#[tokio::test]
async fn test_add_failure_stops_the_pass() {
    let (lb, reconciler) = setup(vec![BackendServer::new("X", 100), BackendServer::drained("Y")]);
    let failure = ClientError::api("QuotaExceeded", "no more backends");
    lb.fail_next(Operation::Add, failure.clone());

    let err = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A", "B"]), LB)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::AddBackends { ref lb_id, .. } if lb_id == LB));
    assert_eq!(err.client_error(), Some(&failure));
    assert_eq!(operations(&lb), vec![Operation::Add]);
    assert_eq!(
        lb.backends(LB).unwrap(),
        vec![BackendServer::new("X", 100), BackendServer::drained("Y")]
    );
}

#[tokio::test]
async fn test_remove_failure_leaves_earlier_calls_applied() {
    let (lb, reconciler) = setup(vec![BackendServer::drained("Y")]);
    lb.fail_next(Operation::Remove, ClientError::Transport("connection reset".into()));
    let service = ServiceDescriptor::new("web");
    let candidates = nodes(&["A"]);

    let err = reconciler.reconcile(&service, &candidates, LB).await.unwrap_err();
    assert!(matches!(err, ReconcileError::RemoveBackends { .. }));
    assert_eq!(
        lb.backends(LB).unwrap(),
        vec![BackendServer::new("A", 100), BackendServer::drained("Y")]
    );

    // Running again recomputes from what actually happened.
    let report = reconciler.reconcile(&service, &candidates, LB).await.unwrap();
    assert_eq!(report.plan.to_delete, vec!["Y".to_string()]);
    assert!(report.plan.to_add.is_empty());
    assert_eq!(lb.backends(LB).unwrap(), vec![BackendServer::new("A", 100)]);
}

#[tokio::test]
async fn test_describe_failure_issues_no_mutations() {
    let (lb, reconciler) = setup(Vec::new());
    lb.fail_next(Operation::Describe, ClientError::Transport("timeout".into()));

    let err = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A"]), LB)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Describe { .. }));
    assert!(lb.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_provider_ids_excluded() {
    let (lb, reconciler) = setup(Vec::new());
    let mut candidates = nodes(&["A"]);
    candidates.push(NodeDescriptor::new("node-broken", "not-a-provider-id"));

    let report = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &candidates, LB)
        .await
        .unwrap();

    assert_eq!(report.candidate_count, 1);
    assert_eq!(lb.backends(LB).unwrap(), vec![BackendServer::new("A", 100)]);
}

#[tokio::test]
async fn test_pass_results_exported_as_metrics() {
    let lb = InMemoryLoadBalancer::new();
    lb.insert_load_balancer(LB, Vec::new());
    let registry = MetricsRegistry::new().unwrap();
    let reconciler = BackendReconciler::new(
        Arc::new(lb.clone()),
        ReconcileConfig::default(),
        Some(registry.collector()),
    );

    reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A", "B"]), LB)
        .await
        .unwrap();
    lb.fail_next(Operation::Describe, ClientError::Transport("timeout".into()));
    let _ = reconciler
        .reconcile(&ServiceDescriptor::new("web"), &nodes(&["A", "B"]), LB)
        .await;

    let text = String::from_utf8(registry.gather()).unwrap();
    assert!(text.contains("reconciler_passes_total{load_balancer=\"lb-web\",result=\"success\"} 1"));
    assert!(text.contains("reconciler_passes_total{load_balancer=\"lb-web\",result=\"describe_error\"} 1"));
    assert!(text.contains("reconciler_backends_added_total{load_balancer=\"lb-web\"} 2"));
}
