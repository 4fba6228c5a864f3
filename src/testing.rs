//! Recording provider used by the unit tests.

use std::sync::{Arc, Mutex};

use crate::provider::{SpanHandle, TracingProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Attribute(&'static str, String),
    Error(String),
    Begin,
    End,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingProvider {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl TracingProvider for RecordingProvider {
    type Span = RecordingSpan;

    fn start_span(&self, name: &str) -> RecordingSpan {
        self.calls.lock().unwrap().push(Call::Start(name.to_string()));
        RecordingSpan {
            calls: self.calls.clone(),
        }
    }
}

pub struct RecordingSpan {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl SpanHandle for RecordingSpan {
    fn set_attribute(&mut self, key: &'static str, value: String) {
        self.calls.lock().unwrap().push(Call::Attribute(key, value));
    }

    fn set_error(&mut self, message: &str) {
        self.calls.lock().unwrap().push(Call::Error(message.to_string()));
    }

    fn begin(&mut self) {
        self.calls.lock().unwrap().push(Call::Begin);
    }

    fn end(self) {
        self.calls.lock().unwrap().push(Call::End);
    }
}
