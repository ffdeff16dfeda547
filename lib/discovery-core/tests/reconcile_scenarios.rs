use discovery_api::ContainerInstance;
use discovery_core::memory::{MemoryRuntime, MemoryStore};
use discovery_core::{
    Backoff, CoordinationStore, CoreError, DiscoveryConfig, DiscoveryMetrics, ExponentialBackoff,
    Reconciler, Trigger, WatchSubscriber,
};
use std::sync::Arc;
use std::time::Duration;

const APP_DEFINITION: &str = r#"{"NamePattern":"^app-.*","ContainerPort":8080}"#;

fn config(poll_interval: Duration) -> DiscoveryConfig {
    DiscoveryConfig {
        definitions_path: "/publication".to_string(),
        routing_path: "/vulcand".to_string(),
        advertise_host: "node-1.example".to_string(),
        poll_interval,
    }
}

fn fast_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(1),
        1.0,
        0.0,
        Duration::from_millis(1),
        None,
    )
}

fn app_container(id: &str, name: &str, public_port: Option<i64>) -> ContainerInstance {
    ContainerInstance::new(id)
        .with_name(name)
        .with_port(8080, public_port)
}

fn reconciler(
    store: &Arc<MemoryStore>,
    runtime: &Arc<MemoryRuntime>,
    poll_interval: Duration,
) -> (Reconciler, DiscoveryMetrics) {
    let metrics = DiscoveryMetrics::new().unwrap();
    let reconciler = Reconciler::new(
        config(poll_interval),
        store.clone(),
        runtime.clone(),
        metrics.clone(),
    );
    (reconciler, metrics)
}

async fn wait_for_value(store: &MemoryStore, key: &str) -> Option<String> {
    for _ in 0..200 {
        if let Some(value) = store.value(key) {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

#[tokio::test]
async fn test_scenario_a_backend_and_server_published() {
    let store = Arc::new(MemoryStore::new());
    store.set("/publication/svc1", APP_DEFINITION).await.unwrap();
    let runtime = Arc::new(MemoryRuntime::new(vec![app_container(
        "c1",
        "/app-1",
        Some(33000),
    )]));

    let (mut reconciler, _) = reconciler(&store, &runtime, Duration::from_secs(30));
    reconciler.reload().await.unwrap();
    let summary = reconciler.poll_pass(Trigger::Initial).await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(
        store.value("/vulcand/backends/svc1/backend").as_deref(),
        Some(r#"{"Type":"http"}"#)
    );
    assert_eq!(
        store.value("/vulcand/backends/svc1/servers/app-1").as_deref(),
        Some(r#"{"URL":"http://node-1.example:33000"}"#)
    );
}

#[tokio::test]
async fn test_scenario_b_unpublished_port_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    store.set("/publication/svc1", APP_DEFINITION).await.unwrap();
    let runtime = Arc::new(MemoryRuntime::new(vec![
        app_container("c1", "/app-1", Some(0)),
        app_container("c2", "/app-2", Some(33002)),
    ]));

    let (mut reconciler, metrics) = reconciler(&store, &runtime, Duration::from_secs(30));
    reconciler.reload().await.unwrap();
    let summary = reconciler.poll_pass(Trigger::Tick).await.unwrap();

    assert_eq!(summary.matched, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.published, 1);
    assert!(store.value("/vulcand/backends/svc1/servers/app-1").is_none());
    assert!(store.value("/vulcand/backends/svc1/servers/app-2").is_some());
    assert_eq!(
        metrics
            .skipped_matches_total
            .with_label_values(&["unpublished"])
            .get(),
        1
    );
}

#[tokio::test]
async fn test_server_write_failure_is_contained() {
    let store = Arc::new(MemoryStore::new());
    store.set("/publication/svc1", APP_DEFINITION).await.unwrap();
    store.reject_writes_under("/vulcand/backends/svc1/servers/app-1");
    let runtime = Arc::new(MemoryRuntime::new(vec![
        app_container("c1", "/app-1", Some(33001)),
        app_container("c2", "/app-2", Some(33002)),
    ]));

    let (mut reconciler, _) = reconciler(&store, &runtime, Duration::from_secs(30));
    reconciler.reload().await.unwrap();
    let summary = reconciler.poll_pass(Trigger::Tick).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.published, 1);
    assert!(store.value("/vulcand/backends/svc1/servers/app-2").is_some());
}

#[tokio::test]
async fn test_scenario_c_watch_failures_then_reload() {
    let store = Arc::new(MemoryStore::new());
    store.set("/publication/svc1", APP_DEFINITION).await.unwrap();
    store.fail_next_watches(3);
    let runtime = Arc::new(MemoryRuntime::new(vec![
        app_container("c1", "/app-1", Some(33000)),
        ContainerInstance::new("c2")
            .with_name("/cache-1")
            .with_port(6379, Some(36379)),
    ]));

    let feed = WatchSubscriber::new(store.clone(), "/publication")
        .with_backoff(fast_backoff())
        .spawn();
    let (reconciler, metrics) = reconciler(&store, &runtime, Duration::from_secs(3600));
    let handle = tokio::spawn(reconciler.run(feed));

    assert!(wait_for_value(&store, "/vulcand/backends/svc1/servers/app-1")
        .await
        .is_some());

    // let the failing watches burn through before changing anything
    tokio::time::sleep(Duration::from_millis(50)).await;
    store
        .set(
            "/publication/cache",
            r#"{"NamePattern":"^cache-","ContainerPort":6379}"#,
        )
        .await
        .unwrap();

    assert_eq!(
        wait_for_value(&store, "/vulcand/backends/cache/servers/cache-1")
            .await
            .as_deref(),
        Some(r#"{"URL":"http://node-1.example:36379"}"#)
    );
    assert!(store.value("/vulcand/backends/cache/backend").is_some());
    assert!(!handle.is_finished());
    assert!(
        metrics
            .passes_total
            .with_label_values(&["definitions"])
            .get()
            >= 1
    );
    handle.abort();
}

#[tokio::test]
async fn test_tick_polls_without_reloading() {
    let store = Arc::new(MemoryStore::new());
    store.set("/publication/svc1", APP_DEFINITION).await.unwrap();
    let runtime = Arc::new(MemoryRuntime::new(vec![]));

    // the feed watches a different store, so no definition change is seen
    let quiet = Arc::new(MemoryStore::new());
    let feed = WatchSubscriber::new(quiet, "/publication").spawn();
    let (reconciler, _) = reconciler(&store, &runtime, Duration::from_millis(20));
    let handle = tokio::spawn(reconciler.run(feed));

    assert!(wait_for_value(&store, "/vulcand/backends/svc1/backend")
        .await
        .is_some());

    store
        .set(
            "/publication/svc2",
            r#"{"NamePattern":"^web-","ContainerPort":80}"#,
        )
        .await
        .unwrap();
    runtime.set_containers(vec![
        app_container("c1", "/app-1", Some(33000)),
        ContainerInstance::new("c2")
            .with_name("/web-1")
            .with_port(80, Some(30080)),
    ]);

    assert!(wait_for_value(&store, "/vulcand/backends/svc1/servers/app-1")
        .await
        .is_some());
    assert!(store.value("/vulcand/backends/svc2/backend").is_none());
    assert!(store.value("/vulcand/backends/svc2/servers/web-1").is_none());
    assert!(runtime.list_calls() >= 2);
    handle.abort();
}

#[tokio::test]
async fn test_runtime_unavailable_stops_the_loop() {
    let store = Arc::new(MemoryStore::new());
    let runtime = Arc::new(MemoryRuntime::new(vec![]));
    runtime.set_available(false);

    let feed = WatchSubscriber::new(store.clone(), "/publication").spawn();
    let (reconciler, _) = reconciler(&store, &runtime, Duration::from_secs(30));

    let res = tokio::time::timeout(Duration::from_secs(1), reconciler.run(feed))
        .await
        .expect("loop kept running");
    assert!(matches!(res, Err(CoreError::Runtime(_))));
}

#[tokio::test]
async fn test_unreachable_store_stops_the_loop() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let runtime = Arc::new(MemoryRuntime::new(vec![]));

    let feed = WatchSubscriber::new(store.clone(), "/publication").spawn();
    let (reconciler, _) = reconciler(&store, &runtime, Duration::from_secs(30));

    let res = tokio::time::timeout(Duration::from_secs(1), reconciler.run(feed))
        .await
        .expect("loop kept running");
    assert!(matches!(res, Err(CoreError::Store(_))));
    assert_eq!(runtime.list_calls(), 0);
}

struct NeverRetry;

impl Backoff for NeverRetry {
    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}

#[tokio::test]
async fn test_exhausted_watch_stops_the_loop() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next_watches(1);
    let runtime = Arc::new(MemoryRuntime::new(vec![]));

    let feed = WatchSubscriber::new(store.clone(), "/publication")
        .with_backoff(NeverRetry)
        .spawn();
    let (reconciler, _) = reconciler(&store, &runtime, Duration::from_secs(3600));

    let res = tokio::time::timeout(Duration::from_secs(1), reconciler.run(feed))
        .await
        .expect("loop kept running");
    assert!(matches!(res, Err(CoreError::WatchExhausted { .. })));
}
