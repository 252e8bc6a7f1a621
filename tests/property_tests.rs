//! Property-based tests for log_funnel using proptest

use log_funnel::core::event::Message;
use log_funnel::core::transport::{transport, TransportConfig};
use log_funnel::prelude::*;
use log_funnel::sinks::SharedBuffer;
use log_funnel::{Dispatcher, FunnelMetrics, RouteTable};
use proptest::prelude::*;
use std::sync::Arc;

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Trace),
        Just(Severity::Debug),
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Critical),
    ]
}

/// Dot-separated names from a small alphabet so prefixes collide often
fn origin() -> impl Strategy<Value = String> {
    prop::collection::vec("[ab]{1,2}", 1..4).prop_map(|parts| parts.join("."))
}

// ============================================================================
// Severity Tests
// ============================================================================

proptest! {
    /// Test that Severity string conversions roundtrip correctly
    #[test]
    fn test_severity_str_roundtrip(level in severity()) {
        let parsed: Severity = level.as_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Test that Severity ordering follows the discriminant
    #[test]
    fn test_severity_ordering(a in severity(), b in severity()) {
        prop_assert_eq!(a <= b, (a as u8) <= (b as u8));
        prop_assert_eq!(a < b, (a as u8) < (b as u8));
    }
}

// ============================================================================
// Routing Tests
// ============================================================================

proptest! {
    /// The resolved route is a matching route of maximal prefix length,
    /// and the earliest registered among those
    #[test]
    fn test_longest_prefix_first_registered(
        prefixes in prop::collection::vec(prop_oneof![Just(String::new()), origin()], 1..6),
        target in origin(),
    ) {
        let table = RouteTable::new(
            prefixes
                .iter()
                .enumerate()
                .map(|(i, p)| Route::new(p.clone(), Severity::Trace, [format!("s{}", i)]))
                .collect(),
        );

        let matching: Vec<(usize, &String)> = prefixes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty() || *p == &target || target.starts_with(&format!("{}.", p)))
            .collect();

        match table.resolve(&target) {
            None => prop_assert!(matching.is_empty()),
            Some(route) => {
                let longest = matching.iter().map(|(_, p)| p.len()).max().unwrap();
                let (first, _) = matching.iter().find(|(_, p)| p.len() == longest).unwrap();
                prop_assert_eq!(&route.sinks, &vec![format!("s{}", first)]);
            }
        }
    }

    /// Resolution is a pure function of the origin
    #[test]
    fn test_resolution_is_deterministic(
        prefixes in prop::collection::vec(origin(), 1..6),
        target in origin(),
        level in severity(),
    ) {
        let table = RouteTable::new(
            prefixes
                .iter()
                .map(|p| Route::new(p.clone(), Severity::Info, [p.clone()]))
                .collect(),
        );
        prop_assert_eq!(table.sinks_for(&target, level), table.sinks_for(&target, level));
    }

    /// Below the threshold never delivers, at or above always does
    #[test]
    fn test_threshold_is_exact(route_min in severity(), sink_min in severity(), level in severity()) {
        let buffer = SharedBuffer::new();
        let sink = Sink::new("out", ConsoleSink::with_writer(buffer.clone()))
            .with_min_severity(sink_min);
        let mut dispatcher =
            Dispatcher::new(vec![Route::root(route_min, ["out"])], vec![sink]).unwrap();

        let delivered = dispatcher.dispatch(&Event::new("x", level, "m", "p"));
        let expected = level >= route_min && level >= sink_min;
        prop_assert_eq!(delivered == 1, expected);
        prop_assert_eq!(buffer.lines().len() == 1, expected);
    }
}

// ============================================================================
// Transport Tests
// ============================================================================

proptest! {
    /// Events from one sender arrive in send order, and everything sent
    /// before the sentinel arrives before it
    #[test]
    fn test_fifo_then_sentinel(messages in prop::collection::vec("[a-z ]{0,16}", 0..64)) {
        let (tx, rx) = transport(
            &TransportConfig::unbounded(),
            Arc::new(FunnelMetrics::new()),
            None,
        );
        for m in &messages {
            tx.send(Event::new("a", Severity::Info, m, "p")).unwrap();
        }
        tx.send_shutdown().unwrap();

        let mut received = Vec::new();
        loop {
            match rx.receive().unwrap() {
                Message::Event(e) => received.push(e.message().to_string()),
                Message::Shutdown => break,
            }
        }
        prop_assert_eq!(received, messages);
    }
}

// ============================================================================
// Format Tests
// ============================================================================

proptest! {
    /// Any origin, message and producer label render as exactly one line
    #[test]
    fn test_rendered_line_is_single_line(
        origin in "(?s).*",
        message in "(?s).*",
        label in "(?s).*",
        level in severity(),
    ) {
        let event = Event::new(origin, level, &message, label);
        for format in [LineFormat::Detailed, LineFormat::Simple, LineFormat::Json] {
            let line = format.format(&event, event.producer_label(), &TimestampFormat::default());
            prop_assert!(!line.contains('\n'));
            prop_assert!(!line.contains('\r'));
        }
    }
}
