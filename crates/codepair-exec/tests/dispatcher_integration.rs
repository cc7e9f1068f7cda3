mod helpers;

use std::sync::atomic::Ordering;
use std::time::Duration;

use codepair_exec::{DispatcherConfig, ExecutionDispatcher};
use codepair_protocol::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_TIMEOUT, Language};
use helpers::{Behavior, ScriptedFactory};

fn dispatcher(factory: ScriptedFactory) -> ExecutionDispatcher {
    helpers::init_tracing();
    ExecutionDispatcher::new(Box::new(factory), DispatcherConfig::default())
}

#[tokio::test(start_paused = true)]
async fn routes_to_the_right_backend_and_echoes() {
    let dispatcher = dispatcher(ScriptedFactory::new([(Language::Javascript, Behavior::Echo)]));

    let result = dispatcher.execute("console.log(1)", Language::Javascript).await;
    assert_eq!(result.exit_code, EXIT_SUCCESS);
    assert_eq!(result.stdout, "console.log(1)");
    assert_eq!(dispatcher.in_flight().await, 0);
}

#[tokio::test(start_paused = true)]
async fn highlight_only_language_resolves_immediately() {
    let factory = ScriptedFactory::new([]);
    let spawns = factory.spawn_counter();
    let dispatcher = dispatcher(factory);

    let result = dispatcher.execute("select 1;", Language::Sql).await;
    assert_eq!(result.exit_code, EXIT_SUCCESS);
    assert!(result.stdout.contains("display-only"));
    assert!(result.stderr.is_empty());
    // No backend was created, let alone waited on.
    assert_eq!(spawns.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn unavailable_runtime_reports_informational_failure() {
    let factory = ScriptedFactory::new([]);
    let spawns = factory.spawn_counter();
    let dispatcher = dispatcher(factory);

    let result = dispatcher.execute("fmt.Println(1)", Language::Go).await;
    assert_eq!(result.exit_code, EXIT_FAILURE);
    assert!(result.stderr.contains("Go execution is not yet implemented"));
    assert!(result.stderr.contains("TinyGo WASM"));
    assert_eq!(spawns.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_backend_times_out_with_synthetic_result() {
    let dispatcher = dispatcher(ScriptedFactory::new([(Language::Javascript, Behavior::Silent)]));

    let result = dispatcher.execute("while(true){}", Language::Javascript).await;
    assert_eq!(result.exit_code, EXIT_TIMEOUT);
    assert_eq!(result.stderr, "Execution timed out");
    assert_eq!(result.duration_ms, 10_000);
    assert_eq!(dispatcher.in_flight().await, 0);
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_discarded_and_never_double_resolves() {
    let dispatcher = dispatcher(ScriptedFactory::new([(
        Language::Javascript,
        Behavior::EchoAfter(vec![Duration::from_secs(20)]),
    )]));

    // The backend will reply at t=20s; the deadline fires at t=10s.
    let first = dispatcher.execute("slow", Language::Javascript).await;
    assert_eq!(first.exit_code, EXIT_TIMEOUT);
    assert_eq!(dispatcher.in_flight().await, 0);

    // Let the stale reply arrive; the router must discard it.
    tokio::time::sleep(Duration::from_secs(15)).await;
    tokio::task::yield_now().await;

    // A fresh request on the same backend resolves with its own result.
    let second = dispatcher.execute("fast", Language::Javascript).await;
    assert_eq!(second.exit_code, EXIT_SUCCESS);
    assert_eq!(second.stdout, "fast");
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatch_is_independent_across_languages() {
    let dispatcher = dispatcher(ScriptedFactory::new([
        (Language::Javascript, Behavior::Echo),
        (Language::Python, Behavior::SlowReady(Duration::from_secs(7))),
    ]));

    // Python's readiness gate is still closed when javascript resolves; the
    // readiness bound (5s) then elapses and the submission proceeds
    // best-effort, completing once the backend finishes initializing at 7s.
    let (js, py) = tokio::join!(
        dispatcher.execute("js-code", Language::Javascript),
        dispatcher.execute("py-code", Language::Python),
    );

    assert_eq!(js.exit_code, EXIT_SUCCESS);
    assert_eq!(js.stdout, "js-code");
    assert_eq!(py.exit_code, EXIT_SUCCESS);
    assert_eq!(py.stdout, "py-code");
}

#[tokio::test(start_paused = true)]
async fn readiness_gate_opens_before_the_bound() {
    let dispatcher = dispatcher(ScriptedFactory::new([(
        Language::Python,
        Behavior::SlowReady(Duration::from_secs(2)),
    )]));

    let result = dispatcher.execute("print(1)", Language::Python).await;
    assert_eq!(result.exit_code, EXIT_SUCCESS);
    assert_eq!(result.stdout, "print(1)");
}

#[tokio::test(start_paused = true)]
async fn backends_are_lazy_singletons_per_language() {
    let factory = ScriptedFactory::new([
        (Language::Javascript, Behavior::Echo),
        (Language::Python, Behavior::Echo),
    ]);
    let spawns = factory.spawn_counter();
    let dispatcher = dispatcher(factory);

    dispatcher.execute("a", Language::Javascript).await;
    dispatcher.execute("b", Language::Javascript).await;
    assert_eq!(spawns.load(Ordering::SeqCst), 1);

    dispatcher.execute("c", Language::Python).await;
    assert_eq!(spawns.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_is_encoded_as_a_result() {
    let dispatcher = dispatcher(ScriptedFactory::new([(
        Language::Javascript,
        Behavior::FailSpawn,
    )]));

    let result = dispatcher.execute("x", Language::Javascript).await;
    assert_eq!(result.exit_code, EXIT_FAILURE);
    assert!(result.stderr.contains("backend unavailable"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_backends_and_allows_relaunch() {
    let factory = ScriptedFactory::new([(Language::Javascript, Behavior::Echo)]);
    let spawns = factory.spawn_counter();
    let dispatcher = dispatcher(factory);

    dispatcher.execute("a", Language::Javascript).await;
    dispatcher.shutdown().await;

    // A new request after teardown lazily relaunches the backend.
    let result = dispatcher.execute("b", Language::Javascript).await;
    assert_eq!(result.stdout, "b");
    assert_eq!(spawns.load(Ordering::SeqCst), 2);
}
