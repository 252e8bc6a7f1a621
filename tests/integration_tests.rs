//! Integration tests for the log funnel
//!
//! These tests verify:
//! - Console INFO / file ERROR routing end to end
//! - Longest-prefix routing across several producers
//! - Log injection prevention
//! - Failure isolation between sinks
//! - Ordered shutdown and double stop
//! - Rotating file output and JSON configuration

use log_funnel::prelude::*;
use log_funnel::sinks::SharedBuffer;
use log_funnel::{error, info, ErrorCategory};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn capture(name: &str, level: Severity, format: LineFormat) -> (Sink, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let sink = Sink::new(name, ConsoleSink::with_writer(buffer.clone()))
        .with_min_severity(level)
        .with_format(format);
    (sink, buffer)
}

#[test]
fn test_console_info_file_error_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let error_file = temp_dir.path().join("errors.log");

    let (console, console_buf) = capture("console", Severity::Info, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(console)
        .sink(
            "errors",
            SinkSpec::file(&error_file, FileMode::Truncate)
                .with_min_severity(Severity::Error)
                .with_format(LineFormat::Simple),
        )
        .route(Route::root(Severity::Trace, ["console", "errors"]))
        .start()
        .expect("Failed to start funnel");

    let worker = funnel
        .spawn_producer("worker-1", |producer| {
            producer.debug("app", "debug line").unwrap();
            producer.info("app", "info line").unwrap();
            producer.error("app", "error line").unwrap();
        })
        .unwrap();

    let stats = funnel.stop_after(vec![worker]).expect("Failed to stop");

    assert_eq!(
        console_buf.lines(),
        vec!["app INFO worker-1 info line", "app ERROR worker-1 error line"]
    );
    let content = fs::read_to_string(&error_file).expect("Failed to read log file");
    assert_eq!(content, "app ERROR worker-1 error line\n");
    assert_eq!(stats.events_received, 3);
    assert_eq!(stats.lines_delivered, 3);
}

#[test]
fn test_detailed_file_layout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let debug_file = temp_dir.path().join("debug.log");

    let mut funnel = Funnel::builder()
        .sink("debug", SinkSpec::file(&debug_file, FileMode::Truncate))
        .route(Route::root(Severity::Debug, ["debug"]))
        .start()
        .unwrap();

    let worker = funnel
        .spawn_producer("worker-7", |producer| {
            producer.warning("d.e.f", "disk low").unwrap();
        })
        .unwrap();
    funnel.stop_after(vec![worker]).unwrap();

    let content = fs::read_to_string(&debug_file).unwrap();
    let parts: Vec<&str> = content.trim_end().splitn(5, ' ').collect();
    assert_eq!(parts.len(), 5);
    assert!(parts[0].ends_with('Z'), "timestamp first: {}", parts[0]);
    assert_eq!(&parts[1..], &["worker-7", "d.e.f", "WARNING", "disk low"]);
}

#[test]
fn test_routing_by_origin_prefix() {
    let (abc, abc_buf) = capture("abc", Severity::Trace, LineFormat::Simple);
    let (def, def_buf) = capture("def", Severity::Trace, LineFormat::Simple);
    let (rest, rest_buf) = capture("rest", Severity::Trace, LineFormat::Simple);

    let mut funnel = Funnel::builder()
        .attach_sink(abc)
        .attach_sink(def)
        .attach_sink(rest)
        .route(Route::root(Severity::Trace, ["rest"]))
        .route(Route::new("a.b", Severity::Trace, ["abc"]))
        .route(Route::new("d", Severity::Trace, ["def"]))
        .start()
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            funnel
                .spawn_producer(format!("worker-{}", i), |_| {
                    info!("a.b.c", "to abc").unwrap();
                    info!("d.e.f", "to def").unwrap();
                    info!("x.y", "to rest").unwrap();
                })
                .unwrap()
        })
        .collect();

    funnel.stop_after(workers).unwrap();

    assert_eq!(abc_buf.lines().len(), 4);
    assert_eq!(def_buf.lines().len(), 4);
    assert_eq!(rest_buf.lines().len(), 4);
    assert!(abc_buf.lines().iter().all(|l| l.starts_with("a.b.c ")));
    assert!(def_buf.lines().iter().all(|l| l.starts_with("d.e.f ")));
}

#[test]
fn test_log_injection_prevention() {
    let (sink, buffer) = capture("console", Severity::Trace, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(sink)
        .route(Route::root(Severity::Trace, ["console"]))
        .start()
        .unwrap();

    let malicious = "User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation";
    funnel.producer("main").info("auth", malicious).unwrap();
    funnel
        .producer("main")
        .info("app\nCRITICAL forged", "origin injection")
        .unwrap();
    funnel
        .producer("evil\nCRITICAL x")
        .info("auth", "label injection")
        .unwrap();
    funnel.stop().unwrap();

    let lines = buffer.lines();
    assert_eq!(lines.len(), 3, "Each event should be a single line");
    assert!(lines[0].contains("\\n"));
    assert_eq!(lines[1], "app\\nCRITICAL forged INFO main origin injection");
    assert_eq!(lines[2], "auth INFO evil\\nCRITICAL x label injection");
}

#[test]
fn test_unmatched_origin_is_dropped_and_counted() {
    let (sink, buffer) = capture("console", Severity::Trace, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(sink)
        .route(Route::new("a", Severity::Trace, ["console"]))
        .start()
        .unwrap();

    let producer = funnel.producer("main");
    producer.error("b.c", "nobody routes this").unwrap();
    producer.error("a.z", "this one is routed").unwrap();

    let stats = funnel.stop().unwrap();
    assert_eq!(stats.unrouted, 1);
    assert_eq!(funnel.metrics().unrouted_events(), 1);
    assert_eq!(buffer.lines(), vec!["a.z ERROR main this one is routed"]);
}

#[test]
fn test_failed_sink_is_isolated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut broken = Sink::new(
        "broken",
        FileSink::append(temp_dir.path().join("broken.log")).unwrap(),
    );
    broken.close().unwrap();
    let (healthy, buffer) = capture("healthy", Severity::Trace, LineFormat::Simple);

    let mut funnel = Funnel::builder()
        .attach_sink(broken)
        .attach_sink(healthy)
        .route(Route::root(Severity::Trace, ["broken", "healthy"]))
        .start()
        .unwrap();

    let producer = funnel.producer("main");
    producer.info("a", "first").unwrap();
    producer.info("a", "second").unwrap();

    let stats = funnel.stop().unwrap();
    assert_eq!(stats.sink_failures, 2);
    assert_eq!(buffer.lines().len(), 2);
}

#[test]
fn test_double_stop_sends_one_sentinel() {
    let (sink, buffer) = capture("console", Severity::Trace, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(sink)
        .route(Route::root(Severity::Trace, ["console"]))
        .start()
        .unwrap();

    let worker = funnel
        .spawn_producer("worker-1", |p| p.info("a", "only").unwrap())
        .unwrap();

    let first = funnel.stop_after(vec![worker]).unwrap();
    let second = funnel.stop().unwrap();
    assert_eq!(first, second);
    assert_eq!(buffer.lines().len(), 1);
    assert!(!funnel.is_running());
}

#[test]
fn test_emit_after_stop_is_a_transport_error() {
    let (sink, _buffer) = capture("console", Severity::Trace, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(sink)
        .route(Route::root(Severity::Trace, ["console"]))
        .start()
        .unwrap();

    let producer = funnel.producer("late");
    funnel.stop().unwrap();

    let err = producer.info("a", "too late").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[test]
fn test_second_funnel_cannot_share_a_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("shared.log");

    let mut first = Funnel::builder()
        .sink("file", SinkSpec::file(&path, FileMode::Append))
        .route(Route::root(Severity::Trace, ["file"]))
        .start()
        .unwrap();

    #[cfg(all(feature = "file", unix))]
    {
        let second = Funnel::builder()
            .sink("file", SinkSpec::file(&path, FileMode::Append))
            .route(Route::root(Severity::Trace, ["file"]))
            .start();
        assert!(matches!(second, Err(LoggerError::StartFailed { .. })));
    }

    first.stop().unwrap();
}

#[test]
fn test_bounded_transport_with_block_policy_loses_nothing() {
    let (sink, buffer) = capture("console", Severity::Trace, LineFormat::Simple);
    let mut funnel = Funnel::builder()
        .attach_sink(sink)
        .route(Route::root(Severity::Trace, ["console"]))
        .capacity(4)
        .overflow_policy(OverflowPolicy::Block)
        .start()
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            funnel
                .spawn_producer(format!("worker-{}", i), |p| {
                    for n in 0..100 {
                        p.info("load", format!("{}", n)).unwrap();
                    }
                })
                .unwrap()
        })
        .collect();

    let stats = funnel.stop_after(workers).unwrap();
    assert_eq!(stats.events_received, 400);
    assert_eq!(buffer.lines().len(), 400);
    assert_eq!(funnel.metrics().dropped_count(), 0);
}

#[test]
fn test_rotating_file_sink_through_funnel() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("listener.log");

    let mut funnel = Funnel::builder()
        .sink(
            "listener",
            SinkSpec::rotating_file(
                &path,
                RotationPolicy::new()
                    .with_strategy(RotationStrategy::Size { max_bytes: 200 })
                    .with_max_backups(3),
            )
            .with_format(LineFormat::Simple),
        )
        .route(Route::root(Severity::Trace, ["listener"]))
        .start()
        .unwrap();

    let worker = funnel
        .spawn_producer("worker-1", |_| {
            for i in 0..40 {
                error!("a.b.c", "rotating entry {}", i).unwrap();
            }
        })
        .unwrap();
    funnel.stop_after(vec![worker]).unwrap();

    assert!(temp_dir.path().join("listener.log.1").exists());
    assert!(!temp_dir.path().join("listener.log.4").exists());
    let current = fs::read_to_string(&path).unwrap();
    assert!(current.trim_end().ends_with("rotating entry 39"));
}

#[test]
fn test_start_from_json_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("json.log");
    let json = format!(
        r#"{{
            "transport": {{"capacity": 64, "overflow": {{"policy": "block_with_timeout", "timeout": "250ms"}}}},
            "dispatcher": {{
                "routes": [{{"prefix": "a", "min_severity": "INFO", "sinks": ["json"]}}],
                "sinks": [["json", {{"kind": "file", "path": {:?}, "format": "json"}}]]
            }},
            "shutdown_timeout": "2s"
        }}"#,
        path.to_str().unwrap()
    );

    let config = FunnelConfig::from_json_str(&json).unwrap();
    assert_eq!(
        config.transport.overflow,
        OverflowPolicy::BlockWithTimeout(Duration::from_millis(250))
    );
    assert_eq!(config.shutdown_timeout, Duration::from_secs(2));

    let mut funnel = Funnel::start(config).unwrap();
    let producer = funnel.producer("json-test");
    producer.debug("a.b", "filtered").unwrap();
    producer.info("a.b", "kept").unwrap();
    funnel.stop().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(value["message"], "kept");
    assert_eq!(value["producer"], "json-test");
    assert_eq!(value["severity"], "INFO");
}
