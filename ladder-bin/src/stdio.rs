use async_trait::async_trait;
use ladder_engine::{CommandFrame, CommandSource, NotificationSink, NotifyLevel};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

/// Reads one command frame per line from stdin, sender fixed to `"stdin"`.
pub struct StdinCommandSource {
    lines: tokio::io::Lines<BufReader<Stdin>>,
}

impl StdinCommandSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinCommandSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for StdinCommandSource {
    async fn next_frame(&mut self) -> Option<CommandFrame> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(error) => {
                    tracing::warn!(%error, "stdin command source read error");
                    return None;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(CommandFrame::new(trimmed.to_string(), "stdin"));
        }
    }
}

/// Prints every notification to stdout and mirrors it through `tracing` at a matching level.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&self, level: NotifyLevel, message: &str) {
        println!("[{level}] {message}");
        match level {
            NotifyLevel::Error => tracing::error!("{message}"),
            NotifyLevel::Warn => tracing::warn!("{message}"),
            NotifyLevel::Info | NotifyLevel::Log => tracing::info!("{message}"),
        }
    }
}
