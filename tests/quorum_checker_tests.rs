use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use timelock_cluster::{
    ClusterConfig, ElectionPolicy, InProgressResponseState, MajorityQuorum, NamespaceCoverage,
    NodeExecutors, QuorumOutcome, ResponseState, TimelockCluster, TimelockError,
    collect_majority, collect_until,
};

fn nodes(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn majority_returns_without_waiting_for_silent_nodes() {
    let result = collect_majority(
        nodes(&["a", "b", "c", "d", "e"]),
        |node: String| async move {
            if node == "d" || node == "e" {
                futures::future::pending::<()>().await;
            }
            Ok(node.len() as u32)
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::Satisfied);
    assert!(result.elapsed() < Duration::from_secs(1));
    assert_eq!(result.state().success_count(), 3);
    assert_eq!(result.state().pending_count(), 2);
    let pending = result.state().pending_nodes().cloned().collect::<Vec<_>>();
    assert_eq!(pending, nodes(&["d", "e"]));
}

#[tokio::test]
async fn single_node_majority_returns_on_first_answer() {
    let result = collect_majority(
        nodes(&["solo"]),
        |_node: String| async { Ok(1u32) },
        &NodeExecutors::current(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::Satisfied);
    assert!(result.elapsed() < Duration::from_secs(1));
    assert_eq!(result.state().success_count(), 1);
}

#[tokio::test]
async fn two_node_majority_needs_both_answers() {
    let both = collect_majority(
        nodes(&["a", "b"]),
        |_node: String| async { Ok(1u32) },
        &NodeExecutors::current(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    assert_eq!(both.outcome(), QuorumOutcome::Satisfied);
    assert!(both.elapsed() < Duration::from_secs(1));

    let one_silent = collect_majority(
        nodes(&["a", "b"]),
        |node: String| async move {
            if node == "b" {
                futures::future::pending::<()>().await;
            }
            Ok(1u32)
        },
        &NodeExecutors::current(),
        Duration::from_millis(100),
    )
    .await
    .unwrap();
    assert_eq!(one_silent.outcome(), QuorumOutcome::DeadlineElapsed);
    assert_eq!(one_silent.state().success_count(), 1);

    let one_failed = collect_majority(
        nodes(&["a", "b"]),
        |node: String| async move {
            if node == "b" {
                return Err(TimelockError::NodeUnavailable(node));
            }
            Ok(1u32)
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    assert_eq!(one_failed.outcome(), QuorumOutcome::Unsatisfiable);
    assert!(one_failed.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn coverage_returns_once_every_namespace_is_claimed() {
    let requested = ["ns-1", "ns-2"]
        .iter()
        .map(|ns| ns.to_string())
        .collect::<BTreeSet<_>>();
    let result = collect_until(
        nodes(&["a", "b", "c"]),
        |node: String| async move {
            let claimed = match node.as_str() {
                "a" => vec!["ns-1".to_string()],
                "b" => vec!["ns-2".to_string()],
                _ => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Vec::new()
                }
            };
            Ok(claimed.into_iter().collect::<BTreeSet<_>>())
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
        NamespaceCoverage::new(requested),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::Satisfied);
    assert!(result.elapsed() < Duration::from_secs(1));
    assert_eq!(
        result.state().pending_nodes().cloned().collect::<Vec<_>>(),
        nodes(&["c"])
    );
}

#[tokio::test]
async fn leadership_query_does_not_wait_for_slow_non_leader() {
    let config = ClusterConfig::new(["node-a", "node-b", "node-c"]).quorum_deadline_ms(2_000);
    let (cluster, network) = TimelockCluster::in_memory(config, ElectionPolicy::Rotate).unwrap();
    network.elect("ns-1", "node-a").await.unwrap();
    network.elect("ns-2", "node-b").await.unwrap();
    network
        .set_ping_latency("node-c", Some(Duration::from_secs(5)))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let snapshot = cluster.current_leaders(["ns-1", "ns-2"]).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(snapshot.outcome(), QuorumOutcome::Satisfied);
    assert_eq!(snapshot.single_leader("ns-1").unwrap(), "node-a");
    assert_eq!(snapshot.single_leader("ns-2").unwrap(), "node-b");
}

#[tokio::test]
async fn failing_majority_is_reported_as_unsatisfiable_before_deadline() {
    let result = collect_until(
        nodes(&["a", "b", "c"]),
        |node: String| async move { Err::<u32, _>(TimelockError::NodeUnavailable(node)) },
        &NodeExecutors::current(),
        Duration::from_secs(5),
        MajorityQuorum::for_cluster(3),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::Unsatisfiable);
    assert!(result.elapsed() < Duration::from_secs(1));
    assert!(result.state().failure_count() >= 2);
    for (node, err) in result.state().failures() {
        assert_eq!(err, &TimelockError::NodeUnavailable(node.clone()));
    }
}

#[tokio::test]
async fn deadline_returns_partial_state() {
    let result = collect_majority(
        nodes(&["a", "b", "c"]),
        |node: String| async move {
            if node != "a" {
                futures::future::pending::<()>().await;
            }
            Ok(7u32)
        },
        &NodeExecutors::current(),
        Duration::from_millis(100),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::DeadlineElapsed);
    assert!(result.elapsed() >= Duration::from_millis(100));
    assert_eq!(result.state().success_count(), 1);
    assert_eq!(result.state().pending_count(), 2);
    assert_eq!(
        result.state().get(&"a".to_string()),
        Some(&ResponseState::Succeeded(7))
    );

    let not_reached = result.into_satisfied().unwrap_err();
    assert_eq!(not_reached.outcome, QuorumOutcome::DeadlineElapsed);
    assert_eq!(not_reached.state.success_count(), 1);
    let err = TimelockError::from(not_reached);
    assert!(matches!(err, TimelockError::QuorumNotReached(_)));
}

#[tokio::test]
async fn every_node_is_called_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result = collect_majority(
        nodes(&["a", "b", "c", "d", "e"]),
        move |_node: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(1u32) }
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    assert!(result.is_satisfied());
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panicking_node_is_recorded_as_failed() {
    let result = collect_until(
        nodes(&["a", "b", "c"]),
        |node: String| async move {
            if node == "a" {
                panic!("node a crashed");
            }
            Ok(1u32)
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
        |state: &InProgressResponseState<String, u32>| state.pending_count() == 0,
    )
    .await
    .unwrap();

    assert_eq!(result.outcome(), QuorumOutcome::Satisfied);
    assert_eq!(result.state().success_count(), 2);
    assert!(matches!(
        result.state().get(&"a".to_string()),
        Some(ResponseState::Failed(TimelockError::ExecutionError(_)))
    ));
}

#[tokio::test]
async fn predicate_satisfied_up_front_skips_all_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let result = collect_until(
        nodes(&["a", "b"]),
        move |_node: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(1u32) }
        },
        &NodeExecutors::current(),
        Duration::from_secs(2),
        |_: &InProgressResponseState<String, u32>| true,
    )
    .await
    .unwrap();

    assert!(result.is_satisfied());
    assert_eq!(result.state().pending_count(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_node_set_is_rejected() {
    let err = collect_majority(
        Vec::<String>::new(),
        |_node: String| async { Ok::<u32, TimelockError>(1) },
        &NodeExecutors::current(),
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TimelockError::IllegalState(_)));
}

#[test]
fn dedicated_executor_runs_its_node_calls() {
    let dedicated = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("dedicated-a")
        .enable_all()
        .build()
        .unwrap();
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let executors = NodeExecutors::current().with_node("a".to_string(), dedicated.handle().clone());

    let result = caller
        .block_on(collect_until(
            nodes(&["a", "b"]),
            |_node: String| async move {
                Ok(std::thread::current()
                    .name()
                    .unwrap_or_default()
                    .to_string())
            },
            &executors,
            Duration::from_secs(2),
            |state: &InProgressResponseState<String, String>| state.pending_count() == 0,
        ))
        .unwrap();

    let values = result
        .state()
        .successful_values()
        .map(|(node, thread)| (node.clone(), thread.clone()))
        .collect::<Vec<_>>();
    assert_eq!(values[0], ("a".to_string(), "dedicated-a".to_string()));
    assert_ne!(values[1].1, "dedicated-a");
}
