// grimoire-collaborators/src/sinks.rs
// ============================================================================
// Module: Event and Display Sinks
// Description: Log-, channel-, and callback-based EventSink implementations,
//              plus a stdout DisplaySink.
// Purpose: Give `log_event`/`log_message`/`display_value` actions concrete
//          collaborators without baking any one observability backend into
//          the interpreter.
// Dependencies: grimoire-core, serde_json, std
// ============================================================================

//! ## Overview
//! `grimoire-core` never logs or prints on its own; every `log_event`,
//! `log_message`, and `display_value` action goes through [`EventSink`] and
//! [`DisplaySink`]. This module ships the same three sink shapes the
//! teacher's `decision-gate-broker::sink` module ships for delivery
//! receipts — log, channel, callback — adapted to a synchronous,
//! `std::sync::mpsc` world instead of Tokio, since Grimoire has no async
//! runtime anywhere in its dependency graph.

use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use grimoire_core::{DisplaySink, EventSink};
use serde_json::{Value, json};

// ============================================================================
// SECTION: Log sink
// ============================================================================

/// Writes one JSON record per event/message to a shared writer.
pub struct LogEventSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> LogEventSink<W> {
    /// Creates a log sink writing to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }
}

impl<W: Write + Send> EventSink for LogEventSink<W> {
    fn log_event(&self, event_type: &str, data: &Value) {
        let record = json!({"kind": "event", "event_type": event_type, "data": data});
        write_record(&self.writer, &record);
    }

    fn log_message(&self, message: &str) {
        let record = json!({"kind": "message", "message": message});
        write_record(&self.writer, &record);
    }
}

fn write_record<W: Write + Send>(writer: &Mutex<W>, record: &Value) {
    let Ok(mut guard) = writer.lock() else {
        return;
    };
    let _ = serde_json::to_writer(&mut *guard, record);
    let _ = guard.write_all(b"\n");
}

// ============================================================================
// SECTION: Channel sink
// ============================================================================

/// One record sent over a [`ChannelEventSink`].
#[derive(Debug, Clone)]
pub enum EventRecord {
    /// A `log_event` action's structured payload.
    Event {
        /// The event type name.
        event_type: String,
        /// The structured payload.
        data: Value,
    },
    /// A `log_message` action's rendered message.
    Message(String),
}

/// Sends event and message records through an `std::sync::mpsc` channel,
/// for a host that wants to observe a run from another thread.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: Sender<EventRecord>,
}

impl ChannelEventSink {
    /// Creates a channel sink over `sender`.
    #[must_use]
    pub fn new(sender: Sender<EventRecord>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn log_event(&self, event_type: &str, data: &Value) {
        let _ = self.sender.send(EventRecord::Event { event_type: event_type.to_string(), data: data.clone() });
    }

    fn log_message(&self, message: &str) {
        let _ = self.sender.send(EventRecord::Message(message.to_string()));
    }
}

// ============================================================================
// SECTION: Callback sink
// ============================================================================

type EventCallback = dyn Fn(&str, &Value) + Send + Sync;
type MessageCallback = dyn Fn(&str) + Send + Sync;

/// Invokes caller-supplied closures for events and messages.
#[derive(Clone)]
pub struct CallbackEventSink {
    on_event: Arc<EventCallback>,
    on_message: Arc<MessageCallback>,
}

impl CallbackEventSink {
    /// Creates a callback sink from an event handler and a message handler.
    pub fn new<E, M>(on_event: E, on_message: M) -> Self
    where
        E: Fn(&str, &Value) + Send + Sync + 'static,
        M: Fn(&str) + Send + Sync + 'static,
    {
        Self { on_event: Arc::new(on_event), on_message: Arc::new(on_message) }
    }
}

impl EventSink for CallbackEventSink {
    fn log_event(&self, event_type: &str, data: &Value) {
        (self.on_event)(event_type, data);
    }

    fn log_message(&self, message: &str) {
        (self.on_message)(message);
    }
}

// ============================================================================
// SECTION: Display sink
// ============================================================================

/// Writes displayed values to stdout, one JSON value per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDisplaySink;

impl DisplaySink for StdoutDisplaySink {
    fn display(&self, value: &Value) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let rendered = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "{rendered}");
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn log_sink_writes_one_line_per_record() {
        let buffer: Vec<u8> = Vec::new();
        let sink = LogEventSink::new(buffer);
        sink.log_event("dice_rolled", &json!({"total": 4}));
        sink.log_message("hello");
        let guard = sink.writer.lock().expect("mutex not poisoned");
        let text = String::from_utf8(guard.clone()).expect("valid utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("dice_rolled"));
        assert!(text.contains("hello"));
    }

    #[test]
    fn channel_sink_forwards_records() {
        let (sender, receiver) = channel();
        let sink = ChannelEventSink::new(sender);
        sink.log_event("choice_made", &json!({"id": "left"}));
        sink.log_message("picked left");
        match receiver.recv().expect("event record sent") {
            EventRecord::Event { event_type, .. } => assert_eq!(event_type, "choice_made"),
            EventRecord::Message(_) => panic!("expected an event record first"),
        }
        match receiver.recv().expect("message record sent") {
            EventRecord::Message(message) => assert_eq!(message, "picked left"),
            EventRecord::Event { .. } => panic!("expected a message record second"),
        }
    }

    #[test]
    fn callback_sink_invokes_the_right_handler() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let messages = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let messages_clone = Arc::clone(&messages);
        let sink = CallbackEventSink::new(
            move |event_type, _data| events_clone.lock().expect("not poisoned").push(event_type.to_string()),
            move |message| messages_clone.lock().expect("not poisoned").push(message.to_string()),
        );
        sink.log_event("table_rolled", &Value::Null);
        sink.log_message("rolled weather");
        assert_eq!(events.lock().expect("not poisoned").as_slice(), ["table_rolled"]);
        assert_eq!(messages.lock().expect("not poisoned").as_slice(), ["rolled weather"]);
    }
}
