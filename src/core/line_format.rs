//! Line formats for sink output
//!
//! - Detailed: `<timestamp> <producer> <origin> <severity> <message>` (default)
//! - Simple: `<origin> <severity> <producer> <message>`
//! - Json: one JSON object per line
//! - Template: user string with `{timestamp}`, `{producer}`, `{origin}`,
//!   `{severity}` and `{message}` placeholders

use super::event::Event;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    #[default]
    Detailed,
    Simple,
    Json,
    Template(String),
}

impl LineFormat {
    /// Render `event` as one line without a trailing newline.
    ///
    /// `producer` is the display label, which may differ from the event's own
    /// label when the dispatcher annotates it.
    pub fn format(&self, event: &Event, producer: &str, timestamp_format: &TimestampFormat) -> String {
        match self {
            LineFormat::Detailed => format!(
                "{} {} {} {} {}",
                timestamp_format.format(&event.timestamp()),
                producer,
                event.origin(),
                event.severity(),
                event.message()
            ),
            LineFormat::Simple => format!(
                "{} {} {} {}",
                event.origin(),
                event.severity(),
                producer,
                event.message()
            ),
            LineFormat::Json => Self::format_json(event, producer, timestamp_format),
            LineFormat::Template(template) => {
                Self::format_template(template, event, producer, timestamp_format)
            }
        }
    }

    fn format_json(event: &Event, producer: &str, timestamp_format: &TimestampFormat) -> String {
        let timestamp = if timestamp_format.is_numeric() {
            // Numeric formats always render as integers
            timestamp_format
                .format(&event.timestamp())
                .parse::<i64>()
                .map(serde_json::Value::from)
                .unwrap_or_else(|_| serde_json::Value::String(timestamp_format.format(&event.timestamp())))
        } else {
            serde_json::Value::String(timestamp_format.format(&event.timestamp()))
        };

        serde_json::json!({
            "timestamp": timestamp,
            "producer": producer,
            "origin": event.origin(),
            "severity": event.severity().as_str(),
            "message": event.message(),
        })
        .to_string()
    }

    fn format_template(
        template: &str,
        event: &Event,
        producer: &str,
        timestamp_format: &TimestampFormat,
    ) -> String {
        let mut output = String::with_capacity(template.len() + event.message().len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                output.push_str(&rest[open..]);
                return output;
            };

            match &after[..close] {
                "timestamp" => output.push_str(&timestamp_format.format(&event.timestamp())),
                "producer" => output.push_str(producer),
                "origin" => output.push_str(event.origin()),
                "severity" => output.push_str(event.severity().as_str()),
                "message" => output.push_str(event.message()),
                // Unknown placeholders are kept verbatim
                other => {
                    output.push('{');
                    output.push_str(other);
                    output.push('}');
                }
            }
            rest = &after[close + 1..];
        }

        output.push_str(rest);
        output
    }
}
