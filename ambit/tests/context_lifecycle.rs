//! End-to-end lifecycle tests: environment access, state durability,
//! guaranteed cleanup drain and failure aggregation.

use ambit::testing::CleanupProbe;
use ambit::{BoxError, Context, Environment, RunError, Runner};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct RequestEnv {
    request_id: u64,
    client: &'static str,
}

impl Environment for RequestEnv {}

fn env() -> RequestEnv {
    RequestEnv {
        request_id: 7,
        client: "10.0.0.1",
    }
}

#[tokio::test]
async fn handler_reads_environment() {
    let outcome = Runner::run(env(), |cx: Context<RequestEnv>| async move {
        assert_eq!(cx.environment().client, "10.0.0.1");
        Ok::<_, BoxError>(cx.environment().request_id * 2)
    })
    .await;

    assert_eq!(outcome.into_result().unwrap(), 14);
}

#[tokio::test]
async fn state_write_survives_handler_failure() {
    // The write must still be observable at teardown, after the failure:
    // a cleanup action reads the cell and captures what it sees.
    let seen = Arc::new(Mutex::new(None::<u32>));
    let capture = Arc::clone(&seen);

    let outcome = Runner::run(env(), move |cx: Context<RequestEnv>| {
        let capture = Arc::clone(&capture);
        async move {
            cx.state().write("session.visits", 3_u32);
            let reader = cx.clone();
            cx.cleanup().register(move || {
                *capture.lock().unwrap() = reader.state().get::<u32>("session.visits").map(|v| *v);
                Ok(())
            })?;
            Err::<(), BoxError>("form validation rejected".into())
        }
    })
    .await;

    assert!(matches!(outcome.into_result(), Err(RunError::Handler(_))));
    assert_eq!(*seen.lock().unwrap(), Some(3));
}

#[tokio::test]
async fn all_cleanups_run_once_when_handler_fails() {
    let probe = CleanupProbe::new();
    let handle = probe.clone();

    let outcome = Runner::run(env(), move |cx: Context<RequestEnv>| {
        let probe = handle.clone();
        async move {
            cx.cleanup().register_labeled("a", probe.action("a"))?;
            cx.cleanup().register_labeled("b", probe.action("b"))?;
            cx.cleanup().register_labeled("c", probe.action("c"))?;
            Err::<(), BoxError>("aborted after acquiring resources".into())
        }
    })
    .await;

    let (result, cleanup_failures) = outcome.into_parts();
    assert!(matches!(result, Err(RunError::Handler(_))));
    assert!(cleanup_failures.is_empty());
    // Release mirrors acquisition: reverse registration order, each once.
    assert_eq!(probe.invoked(), vec!["c", "b", "a"]);
    for label in ["a", "b", "c"] {
        assert_eq!(probe.count(label), 1);
    }
}

#[tokio::test]
async fn failing_cleanup_is_reported_alongside_success() {
    let probe = CleanupProbe::new();
    let handle = probe.clone();

    let outcome = Runner::run(env(), move |cx: Context<RequestEnv>| {
        let probe = handle.clone();
        async move {
            cx.cleanup().register_labeled("a", probe.action("a"))?;
            cx.cleanup()
                .register_labeled("b", probe.failing_action("b"))?;
            cx.cleanup().register_labeled("c", probe.action("c"))?;
            Ok::<_, BoxError>("rendered")
        }
    })
    .await;

    assert!(outcome.is_success());
    assert!(!outcome.is_clean());
    assert_eq!(outcome.result().unwrap(), &"rendered");
    assert_eq!(outcome.cleanup_failures().len(), 1);
    assert_eq!(outcome.cleanup_failures()[0].label(), Some("b"));
    assert_eq!(probe.invoked(), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn cancelled_token_skips_its_action() {
    let probe = CleanupProbe::new();
    let handle = probe.clone();

    let outcome = Runner::run(env(), move |cx: Context<RequestEnv>| {
        let probe = handle.clone();
        async move {
            cx.cleanup().register(probe.action("keep"))?;
            let token = cx.cleanup().register(probe.action("drop"))?;
            assert!(cx.cleanup().cancel(token));
            Ok::<_, BoxError>(())
        }
    })
    .await;

    assert!(outcome.is_clean());
    assert_eq!(probe.invoked(), vec!["keep"]);
}

#[tokio::test]
async fn handler_panic_still_drains() {
    let probe = CleanupProbe::new();
    let handle = probe.clone();

    let outcome = Runner::run(env(), move |cx: Context<RequestEnv>| {
        let probe = handle.clone();
        async move {
            cx.cleanup().register(probe.action("checkin"))?;
            panic!("template engine blew up");
            #[allow(unreachable_code)]
            return Ok::<_, BoxError>(());
        }
    })
    .await;

    let (result, _) = outcome.into_parts();
    assert!(matches!(result, Err(RunError::Panic(message)) if message.contains("blew up")));
    assert_eq!(probe.invoked(), vec!["checkin"]);
}

#[tokio::test]
async fn cancellation_is_a_failed_transition_not_a_teardown_bypass() {
    let probe = CleanupProbe::new();
    let handle = probe.clone();

    let outcome = Runner::run_cancellable(
        env(),
        futures::future::ready(()),
        move |cx: Context<RequestEnv>| {
            let probe = handle.clone();
            async move {
                cx.cleanup().register(probe.action("conn"))?;
                // Simulates a request that never finishes on its own.
                futures::future::pending::<()>().await;
                Ok::<_, BoxError>(0_u8)
            }
        },
    )
    .await;

    let (result, cleanup_failures) = outcome.into_parts();
    assert!(matches!(result, Err(RunError::Cancelled)));
    assert!(cleanup_failures.is_empty());
    assert_eq!(probe.invoked(), vec!["conn"]);
}

#[tokio::test]
async fn environment_builder_failure_skips_the_handler() {
    let outcome = Runner::run_with(
        || Err::<RequestEnv, BoxError>("malformed request line".into()),
        |_cx: Context<RequestEnv>| async move { Ok::<_, BoxError>(()) },
    )
    .await;

    assert!(matches!(outcome.into_result(), Err(RunError::Handler(_))));
}

#[tokio::test]
async fn modify_is_read_modify_write() {
    let outcome = Runner::run(env(), |cx: Context<RequestEnv>| async move {
        cx.state().write("hits", 10_i64);
        cx.state().modify("hits", |current| {
            let n = current
                .and_then(|v| v.downcast::<i64>().ok())
                .map_or(0, |v| *v);
            Some(Arc::new(n + 5))
        });
        Ok::<_, BoxError>(cx.state().get::<i64>("hits").map(|v| *v))
    })
    .await;

    assert_eq!(outcome.into_result().unwrap(), Some(15));
}

#[cfg(feature = "timeout")]
#[tokio::test]
async fn deadline_expiry_maps_to_cancelled() {
    let outcome = Runner::run_with_timeout(
        env(),
        std::time::Duration::from_millis(5),
        |_cx: Context<RequestEnv>| async move {
            futures::future::pending::<()>().await;
            Ok::<_, BoxError>(())
        },
    )
    .await;

    assert!(matches!(outcome.into_result(), Err(RunError::Cancelled)));
}
