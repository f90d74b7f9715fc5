use derive_more::Display;

/// Severity of a notification fanned out to whatever sinks the binary wires in.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
    Log,
}

/// A single outbound notification channel (Slack/Telegram/email/stdout — concrete fan-out sinks
/// are out of scope per spec §1; only this trait boundary lives in the core). Implementations
/// must not block the calling task for long; a slow sink should buffer internally.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Fans one notification out to every registered sink, swallowing nothing: a sink that panics
/// is a deployment bug, not something the scheduler should paper over.
#[derive(Default)]
pub struct SinkList(Vec<Box<dyn NotificationSink>>);

impl std::fmt::Debug for SinkList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkList").field("len", &self.0.len()).finish()
    }
}

impl SinkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn NotificationSink>) {
        self.0.push(sink);
    }

    pub fn notify_all(&self, level: NotifyLevel, message: &str) {
        for sink in &self.0 {
            sink.notify(level, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl NotificationSink for RecordingSink {
        fn notify(&self, level: NotifyLevel, message: &str) {
            self.0.lock().unwrap().push(format!("{level}: {message}"));
        }
    }

    #[test]
    fn fans_out_to_every_sink() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sinks = SinkList::new();
        sinks.push(Box::new(RecordingSink(log.clone())));
        sinks.push(Box::new(RecordingSink(log.clone())));

        sinks.notify_all(NotifyLevel::Info, "ladder placed 6 orders");

        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
