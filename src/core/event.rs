//! Log event and transport message

use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

// Thread-local cache so each emission doesn't re-format the thread identity
thread_local! {
    static THREAD_LABEL_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Label for the calling thread: its name if it has one, else its id.
pub fn current_thread_label() -> String {
    THREAD_LABEL_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let thread = std::thread::current();
                match thread.name() {
                    Some(name) => name.to_string(),
                    None => format!("{:?}", thread.id()),
                }
            })
            .clone()
    })
}

/// One immutable log occurrence.
///
/// `timestamp` and `producer_label` are fixed when the event is built on the
/// producer side; nothing downstream can rewrite them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventFields")]
pub struct Event {
    origin: String,
    severity: Severity,
    message: String,
    timestamp: DateTime<Utc>,
    producer_label: String,
}

/// Wire shape of an [`Event`]; deserializing goes through [`Event::at`]
#[derive(Deserialize)]
struct EventFields {
    origin: String,
    severity: Severity,
    message: String,
    timestamp: DateTime<Utc>,
    producer_label: String,
}

impl From<EventFields> for Event {
    fn from(fields: EventFields) -> Self {
        Event::at(
            fields.origin,
            fields.severity,
            fields.message,
            fields.producer_label,
            fields.timestamp,
        )
    }
}

impl Event {
    /// Escape line breaks and tabs so an event always renders as one line
    fn sanitize(text: &str) -> String {
        text
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(
        origin: impl Into<String>,
        severity: Severity,
        message: impl AsRef<str>,
        producer_label: impl Into<String>,
    ) -> Self {
        Self::at(origin, severity, message, producer_label, Utc::now())
    }

    /// Build an event with an explicit capture time
    pub fn at(
        origin: impl Into<String>,
        severity: Severity,
        message: impl AsRef<str>,
        producer_label: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let origin: String = origin.into();
        let producer_label: String = producer_label.into();
        Self {
            origin: Self::sanitize(&origin),
            severity,
            message: Self::sanitize(message.as_ref()),
            timestamp,
            producer_label: Self::sanitize(&producer_label),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn producer_label(&self) -> &str {
        &self.producer_label
    }
}

/// Item carried by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Event(Event),
    /// No more events will arrive
    Shutdown,
}

impl Message {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Message::Shutdown)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::Event(event)
    }
}
