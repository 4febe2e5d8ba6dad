//! End-to-end tests for orchestrator execution.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::errors::{JournalError, UnitError};
    use crate::events::{event_types, CollectingEventSink, EventSink, NoOpEventSink};
    use crate::journal::MockJournaler;
    use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
    use crate::record::{RecordView, Request};
    use crate::retry::RetryPolicy;
    use crate::testing::{CollectingJournaler, FailingJournaler, FlakyHandler, OrderingProbe, ProbeEvent, SlowJournaler};
    use crate::units::{UnitContext, UnitResult, UnitSpec};
    use pretty_assertions::assert_eq;
    use rand::Rng;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::Level;

    fn request() -> Request {
        Request::new(
            format!("req-{}", rand::thread_rng().gen_range(0..1_000_000)),
            json!({
                "device": {
                    "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
                    "ipAddress": "127.0.0.1"
                },
                "billingInformation": {
                    "email": "test@test.com",
                    "address": {"line1": "123 Main St", "city": "Anytown", "state": "CA", "zip": "12345"}
                }
            }),
        )
    }

    fn constant(name: &str, out: &'static str) -> UnitSpec {
        UnitSpec::from_fn(name, move |_, _| Ok(json!(out)))
    }

    fn failing(name: &str, message: &'static str) -> UnitSpec {
        UnitSpec::from_fn(name, move |_, _| Err(UnitError::msg(message)))
    }

    fn build(units: Vec<UnitSpec>) -> Orchestrator {
        Orchestrator::new(Arc::new(NoOpEventSink), None, units).unwrap()
    }

    fn results(pairs: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn test_linear_chain() {
        let orchestrator = build(vec![
            constant("P", "P-OUT"),
            constant("A", "A-OUT").with_dependency("P"),
            constant("R", "R-OUT").with_dependency("A"),
        ]);

        let record = orchestrator.orchestrate(request()).await;

        assert_eq!(
            record.results,
            results(&[("P", "P-OUT"), ("A", "A-OUT"), ("R", "R-OUT")])
        );
        assert!(record.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_workflow() {
        let orchestrator = build(vec![
            constant("authorization", "AUTHORIZATION"),
            constant("payment", "PAYMENT").with_dependency("authorization"),
            constant("analytics", "ANALYTICS").with_dependency("payment"),
            constant("notification", "NOTIFICATION").with_dependency("analytics"),
        ]);

        let req = request();
        let record = orchestrator.orchestrate(req.clone()).await;

        assert_eq!(record.run_id, req.request_id);
        assert_eq!(record.request, req);
        assert_eq!(
            record.results,
            results(&[
                ("authorization", "AUTHORIZATION"),
                ("payment", "PAYMENT"),
                ("analytics", "ANALYTICS"),
                ("notification", "NOTIFICATION"),
            ])
        );
    }

    #[tokio::test]
    async fn test_failed_dependency_still_runs_dependent() {
        let orchestrator = build(vec![
            failing("auth", "authorization failed"),
            constant("payment", "PAYMENT").with_dependency("auth"),
        ]);

        let record = orchestrator.orchestrate(request()).await;

        assert_eq!(record.warnings, vec!["authorization failed".to_string()]);
        assert_eq!(record.results, results(&[("payment", "PAYMENT")]));
    }

    #[tokio::test]
    async fn test_dependent_sees_missing_dependency_result() {
        let orchestrator = build(vec![
            failing("auth", "authorization failed"),
            UnitSpec::from_fn("payment", |_, record: &RecordView| {
                match record.result("auth") {
                    Some(_) => Ok(json!("CHARGED")),
                    None => Ok(json!("SKIPPED_NO_AUTH")),
                }
            })
            .with_dependency("auth"),
        ]);

        let record = orchestrator.orchestrate(request()).await;
        assert_eq!(record.results["payment"], json!("SKIPPED_NO_AUTH"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let flaky = Arc::new(FlakyHandler::new(4, json!("AUTHORIZATION")));
        let orchestrator = build(vec![
            UnitSpec::new("authorization", flaky.clone())
                .with_retry(RetryPolicy::DEFAULT.with_max_retries(5)),
            constant("payment", "PAYMENT").with_dependency("authorization"),
        ]);

        let record = orchestrator.orchestrate(request()).await;

        assert_eq!(flaky.calls(), 5);
        assert_eq!(
            record.results,
            results(&[("authorization", "AUTHORIZATION"), ("payment", "PAYMENT")])
        );
        assert!(record.warnings.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_predicate_selects_retryable_errors() {
        let flaky = Arc::new(FlakyHandler::new(4, json!("AUTHORIZATION")).with_error("retryable error"));
        let policy = RetryPolicy::DEFAULT
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(10))
            .retry_if(|e| e.to_string() == "retryable error");
        let orchestrator = build(vec![UnitSpec::new("authorization", flaky.clone()).with_retry(policy)]);

        let record = orchestrator.orchestrate(request()).await;
        assert_eq!(record.results["authorization"], json!("AUTHORIZATION"));
        assert_eq!(flaky.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_one_warning() {
        let flaky = Arc::new(FlakyHandler::always_failing("gateway down"));
        let orchestrator = build(vec![
            UnitSpec::new("payment", flaky.clone()).with_retry(RetryPolicy::DEFAULT.with_max_retries(2)),
            constant("notify", "SENT").with_dependency("payment"),
        ]);

        let record = orchestrator.orchestrate(request()).await;

        assert_eq!(flaky.calls(), 3);
        assert_eq!(
            record.warnings,
            vec!["gateway down\nunit payment failed after 3 attempts".to_string()]
        );
        assert_eq!(record.results, results(&[("notify", "SENT")]));
    }

    #[tokio::test]
    async fn test_flat_graph_is_stable_across_runs() {
        let orchestrator = build(vec![
            constant("payments", "PAYMENTS"),
            constant("analytics", "ANALYTICS"),
            failing("fraud", "fraud service unavailable"),
        ]);

        for _ in 0..200 {
            let record = orchestrator.orchestrate(request()).await;
            assert_eq!(
                record.results,
                results(&[("payments", "PAYMENTS"), ("analytics", "ANALYTICS")])
            );
            assert_eq!(record.warnings, vec!["fraud service unavailable".to_string()]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dependencies_commit_before_dependents_start() {
        let probe = OrderingProbe::new();
        let work = Duration::from_millis(5);
        let orchestrator = build(vec![
            probe.unit("root", &[], work),
            probe.unit("left", &["root"], work),
            probe.unit("right", &["root"], Duration::ZERO),
            probe.unit("join", &["left", "right"], work),
            probe.unit("tail", &["join"], Duration::ZERO),
            probe.unit("island", &[], work),
        ]);

        let record = orchestrator.orchestrate(request()).await;
        assert_eq!(record.results.len(), 6);
        assert_eq!(record.results["join"], json!("JOIN-OUT"));

        for unit in ["root", "left", "right", "join", "tail", "island"] {
            let started = probe.started_at(unit).unwrap();
            for dep in orchestrator.dependencies_of(unit).unwrap() {
                let finished = probe.finished_at(dep).unwrap();
                assert!(finished < started, "{unit} started before {dep} finished");
            }
        }

        for event in probe.events() {
            if let ProbeEvent::Started { unit, visible } = event {
                let declared = orchestrator.dependencies_of(&unit).unwrap().to_vec();
                assert_eq!(visible, declared, "{unit} could not see all dependency results");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_random_dags_commit_every_unit_exactly_once() {
        let mut rng = rand::thread_rng();
        for _ in 0..25 {
            let count = rng.gen_range(1..=12);
            let mut units = Vec::new();
            let mut expect_ok = BTreeSet::new();
            let mut expect_warn = BTreeSet::new();

            for i in 0..count {
                let name = format!("u{i}");
                let deps: Vec<String> = (0..i)
                    .filter(|_| rng.gen_bool(0.3))
                    .map(|j| format!("u{j}"))
                    .collect();
                let spec = if rng.gen_bool(0.25) {
                    expect_warn.insert(format!("{name} failed"));
                    let message = format!("{name} failed");
                    UnitSpec::from_fn(&name, move |_, _| Err(UnitError::msg(message.clone())))
                } else {
                    expect_ok.insert(name.clone());
                    let value = name.clone();
                    UnitSpec::from_fn(&name, move |_, _| Ok(json!(value)))
                };
                units.push(spec.with_dependencies(deps));
            }

            let record = build(units).orchestrate(request()).await;

            let got_ok: BTreeSet<String> = record.results.keys().cloned().collect();
            let got_warn: BTreeSet<String> = record.warnings.iter().cloned().collect();
            assert_eq!(got_ok, expect_ok);
            assert_eq!(got_warn, expect_warn);
            assert_eq!(record.warnings.len(), expect_warn.len());
            assert_eq!(record.committed(), count);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_do_not_share_state() {
        let orchestrator = Arc::new(build(vec![
            UnitSpec::from_async("echo", |_ctx: UnitContext, record: RecordView| async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                let out: UnitResult = Ok(record.payload()["n"].clone());
                out
            }),
            UnitSpec::from_fn("double", |_, record: &RecordView| {
                let n = record
                    .result("echo")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| UnitError::msg("echo missing"))?;
                Ok(json!(n * 2))
            })
            .with_dependency("echo"),
        ]));

        let mut calls = Vec::new();
        for n in 0..32_i64 {
            let orchestrator = orchestrator.clone();
            calls.push(tokio::spawn(async move {
                let record = orchestrator
                    .orchestrate(Request::new(format!("call-{n}"), json!({ "n": n })))
                    .await;
                (n, record)
            }));
        }

        for call in calls {
            let (n, record) = call.await.unwrap();
            assert_eq!(record.run_id, format!("call-{n}"));
            assert_eq!(record.results["echo"], json!(n));
            assert_eq!(record.results["double"], json!(n * 2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_advisory() {
        let orchestrator = build(vec![
            UnitSpec::from_async("watcher", |ctx: UnitContext, _record: RecordView| async move {
                ctx.cancelled().await;
                let reason = ctx.cancel_token().reason().unwrap_or_default();
                let out: UnitResult = Err(UnitError::Cancelled(reason));
                out
            }),
            UnitSpec::from_async("stubborn", |_ctx: UnitContext, _record: RecordView| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let out: UnitResult = Ok(json!("DONE"));
                out
            }),
            constant("after", "AFTER").with_dependency("watcher"),
        ]);

        let token = CancellationToken::with_deadline(Duration::from_millis(50));
        let record = orchestrator.orchestrate_with_cancel(request(), token).await;

        assert_eq!(
            record.warnings,
            vec!["cancelled: deadline of 50ms exceeded".to_string()]
        );
        assert_eq!(
            record.results,
            results(&[("stubborn", "DONE"), ("after", "AFTER")])
        );
    }

    #[tokio::test]
    async fn test_journal_receives_finished_record() {
        let journaler = Arc::new(CollectingJournaler::new());
        let orchestrator = OrchestratorBuilder::new()
            .event_sink(Arc::new(NoOpEventSink))
            .journaler(journaler.clone())
            .unit(constant("a", "A"))
            .unit(failing("b", "b failed").with_dependency("a"))
            .build()
            .unwrap();

        let record = orchestrator.orchestrate(request()).await;
        let journaled = journaler.wait_for(1, Duration::from_secs(5)).await;

        assert_eq!(journaled, vec![record]);
    }

    #[tokio::test]
    async fn test_journal_called_once_per_call() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut mock = MockJournaler::new();
        mock.expect_journal()
            .withf(|record| record.results.contains_key("a"))
            .times(2)
            .returning(move |record| {
                let _ = tx.send(record.run_id.clone());
                Ok(())
            });

        let orchestrator = Orchestrator::new(
            Arc::new(NoOpEventSink),
            Some(Arc::new(mock)),
            vec![constant("a", "A")],
        )
        .unwrap();

        orchestrator.orchestrate(Request::new("first", json!({}))).await;
        orchestrator.orchestrate(Request::new("second", json!({}))).await;

        let mut seen = BTreeSet::new();
        for _ in 0..2 {
            let id = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.insert(id);
        }
        assert_eq!(seen, BTreeSet::from(["first".to_string(), "second".to_string()]));
    }

    #[tokio::test]
    async fn test_journal_failure_is_only_logged() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = Orchestrator::new(
            sink.clone(),
            Some(Arc::new(FailingJournaler::new("disk full"))),
            vec![constant("a", "A")],
        )
        .unwrap();

        let record = orchestrator.orchestrate(request()).await;
        assert_eq!(record.results, results(&[("a", "A")]));

        let mut failures = Vec::new();
        for _ in 0..100 {
            failures = sink.events_of_type(event_types::JOURNAL_FAILED);
            if !failures.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].level, Level::ERROR);
        assert_eq!(
            failures[0].data.as_ref().unwrap()["error"],
            json!(JournalError::Rejected("disk full".into()).to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_journal_does_not_delay_return() {
        let journaler = Arc::new(SlowJournaler::new(Duration::from_secs(60)));
        let orchestrator = Orchestrator::new(
            Arc::new(NoOpEventSink),
            Some(journaler.clone()),
            vec![constant("a", "A")],
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        let record = orchestrator.orchestrate(request()).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(journaler.records().is_empty());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(journaler.records(), vec![record]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_leaves_handlers_running() {
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let journaler = Arc::new(CollectingJournaler::new());
        let orchestrator = Orchestrator::new(
            Arc::new(NoOpEventSink),
            Some(journaler.clone()),
            vec![UnitSpec::from_async("settle", move |_ctx: UnitContext, _record: RecordView| {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    flag.store(true, Ordering::SeqCst);
                    let out: UnitResult = Ok(json!("SETTLED"));
                    out
                }
            })],
        )
        .unwrap();

        let call = tokio::time::timeout(Duration::from_millis(50), orchestrator.orchestrate(request())).await;
        assert!(call.is_err());
        assert!(!completed.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(completed.load(Ordering::SeqCst));
        let journaled = journaler.records();
        assert_eq!(journaled.len(), 1);
        assert_eq!(journaled[0].results, results(&[("settle", "SETTLED")]));
    }

    #[tokio::test]
    async fn test_unit_without_policy_runs_exactly_once() {
        let flaky = Arc::new(FlakyHandler::always_failing("gateway down"));
        let spec = UnitSpec::new("payment", flaky.clone());
        assert!(spec.retry.is_none());
        let orchestrator = build(vec![spec, constant("notify", "SENT").with_dependency("payment")]);

        let record = orchestrator.orchestrate(request()).await;

        assert_eq!(flaky.calls(), 1);
        assert_eq!(record.warnings, vec!["gateway down".to_string()]);
        assert_eq!(record.results, results(&[("notify", "SENT")]));
    }

    /// Panics when asked to report that `unit` started.
    struct PanicOnStart {
        unit: &'static str,
    }

    impl EventSink for PanicOnStart {
        fn try_emit(&self, _level: Level, event_type: &str, data: Option<serde_json::Value>) {
            let unit = data.as_ref().and_then(|d| d["unit"].as_str().map(str::to_string));
            if event_type == event_types::UNIT_STARTED && unit.as_deref() == Some(self.unit) {
                panic!("sink failure");
            }
        }
    }

    #[tokio::test]
    async fn test_unwinding_unit_task_still_releases_dependents() {
        let orchestrator = Orchestrator::new(
            Arc::new(PanicOnStart { unit: "auth" }),
            None,
            vec![
                constant("auth", "AUTH"),
                constant("payment", "PAYMENT").with_dependency("auth"),
                constant("notify", "SENT").with_dependency("payment"),
            ],
        )
        .unwrap();

        let record = tokio::time::timeout(Duration::from_secs(5), orchestrator.orchestrate(request()))
            .await
            .unwrap();

        assert_eq!(
            record.results,
            results(&[("payment", "PAYMENT"), ("notify", "SENT")])
        );
        assert!(record.warnings.is_empty());
    }
}
