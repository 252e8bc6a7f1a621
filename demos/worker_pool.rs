//! Ten workers, one listener.
//!
//! Each worker logs ten events with random severities to `a.b.c` or
//! `d.e.f`, sleeping a little between them. The dispatcher is the only
//! thread that writes: INFO and above to the console, everything from DEBUG
//! up to a detailed file, ERROR and above to an error file, and the whole
//! stream to a listener file that rotates at midnight.
//!
//! Run with `cargo run --example worker_pool [log-dir]`.

use log_funnel::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const WORKERS: usize = 10;
const EVENTS_PER_WORKER: usize = 10;

const LEVELS: [Severity; 5] = [
    Severity::Debug,
    Severity::Info,
    Severity::Warning,
    Severity::Error,
    Severity::Critical,
];
const ORIGINS: [&str; 2] = ["a.b.c", "d.e.f"];
const MESSAGES: [&str; 3] = ["Random message #1", "Random message #2", "Random message #3"];

fn main() -> log_funnel::Result<()> {
    let log_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));

    let mut funnel = Funnel::builder()
        .sink(
            "console",
            SinkSpec::console(ConsoleStream::Stderr)
                .with_min_severity(Severity::Info)
                .with_format(LineFormat::Simple),
        )
        .sink(
            "file",
            SinkSpec::file(log_dir.join("mplog.log"), FileMode::Truncate)
                .with_min_severity(Severity::Debug)
                .with_timestamp_format(TimestampFormat::Asctime),
        )
        .sink(
            "errors",
            SinkSpec::file(log_dir.join("mplog-errors.log"), FileMode::Truncate)
                .with_min_severity(Severity::Error)
                .with_timestamp_format(TimestampFormat::Asctime),
        )
        .sink(
            "listener",
            SinkSpec::rotating_file(
                log_dir.join("listener.log"),
                RotationPolicy::new().with_strategy(RotationStrategy::daily(0)),
            )
            .with_timestamp_format(TimestampFormat::Asctime),
        )
        .route(Route::root(
            Severity::Debug,
            ["console", "file", "errors", "listener"],
        ))
        .relabel(true)
        .label("listener")
        .start()?;

    let workers = (0..WORKERS)
        .map(|i| {
            funnel.spawn_producer(format!("worker-{}", i + 1), |producer| {
                println!("Worker started: {}", producer.label());
                let mut rng = rand::thread_rng();
                for _ in 0..EVENTS_PER_WORKER {
                    thread::sleep(Duration::from_millis(rng.gen_range(0..200)));
                    let origin = ORIGINS.choose(&mut rng).copied().unwrap_or("a.b.c");
                    let level = LEVELS.choose(&mut rng).copied().unwrap_or_default();
                    let message = MESSAGES.choose(&mut rng).copied().unwrap_or_default();
                    if let Err(e) = producer.emit(origin, level, message) {
                        eprintln!("{}: {}", producer.label(), e);
                    }
                }
                println!("Worker finished: {}", producer.label());
            })
        })
        .collect::<log_funnel::Result<Vec<_>>>()?;

    let stats = funnel.stop_after(workers)?;
    println!(
        "Dispatched {} events as {} lines ({} unrouted, {} sink failures)",
        stats.events_received, stats.lines_delivered, stats.unrouted, stats.sink_failures
    );
    Ok(())
}
