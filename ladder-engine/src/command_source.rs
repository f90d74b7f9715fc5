use async_trait::async_trait;

/// One command frame read from the chat transport: the raw text plus the identity of whoever
/// sent it. The
/// concrete transport (Telegram, Slack, stdin,...) is out of scope; only this consumed contract
/// is specified here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub text: String,
    pub sender: String,
}

impl CommandFrame {
    pub fn new(text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
        }
    }
}

/// A source of command frames, read one at a time by the command-intake task. Frames
/// never overlap: the task awaits `next_frame` to completion, dispatches it, and only then asks
/// for the next one.
#[async_trait]
pub trait CommandSource: Send {
    /// Returns `None` once the transport is permanently exhausted (eg/ stdin closed), which the
    /// scheduler treats as a request to begin shutdown.
    async fn next_frame(&mut self) -> Option<CommandFrame>;
}
