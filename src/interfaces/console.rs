use crate::domain::message::StatusMessage;
use crate::domain::payment::HealthStatus;
use crate::error::Result;
use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;

/// Writes status messages to a text sink, one per line.
pub struct MessageWriter<W: Write> {
    writer: W,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_message(&mut self, message: &StatusMessage) -> Result<()> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Drains a message stream until the flow producing it ends.
    pub async fn follow(
        &mut self,
        messages: &mut UnboundedReceiver<StatusMessage>,
    ) -> Result<usize> {
        let mut written = 0;
        while let Some(message) = messages.recv().await {
            self.write_message(&message)?;
            written += 1;
        }
        Ok(written)
    }

    pub fn write_health(&mut self, health: &HealthStatus) -> Result<()> {
        let state = if health.success { "reachable" } else { "unreachable" };
        match &health.message {
            Some(message) => writeln!(self.writer, "backend {state}: {message}")?,
            None => writeln!(self.writer, "backend {state}")?,
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
