use std::path::Path;

use tokio::{
    io::AsyncWriteExt,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

use crate::errors;

#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    Progress(f64),
    Shutdown,
}

pub fn format_progress(progress: f64) -> String {
    format!("PROGRESS {progress:.1}")
}

/// Best-effort export of the current progress to a file other processes poll.
///
/// The file is only written if it already exists when the sink is spawned.
#[derive(Debug, Default)]
pub struct SignalSink {
    sender: Option<UnboundedSender<SignalMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl SignalSink {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn spawn(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::disabled();
        };

        if !path.exists() {
            log::info!(
                "Signal file {} does not exist, progress will not be signaled",
                path.display()
            );
            return Self::disabled();
        }

        let (sender, receiver) = unbounded_channel();
        let path = path.to_path_buf();
        let worker = tokio::spawn(async move {
            if let Err(error) = write_signals(&path, receiver).await {
                log::warn!("Signaling progress to {} failed: {}", path.display(), error);
            }
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues `progress` without waiting for the write.
    pub fn signal_progress(&self, progress: f64) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(SignalMessage::Progress(progress));
        }
    }

    /// Waits until every queued update is written and the file is closed.
    pub async fn shutdown(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(SignalMessage::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if let Err(error) = worker.await {
                log::warn!("Signal worker terminated abnormally: {}", error);
            }
        }
    }
}

async fn write_signals(
    path: &Path,
    mut receiver: UnboundedReceiver<SignalMessage>,
) -> errors::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;

    while let Some(message) = receiver.recv().await {
        match message {
            SignalMessage::Progress(progress) => {
                let line = format!("{}\n", format_progress(progress));
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            SignalMessage::Shutdown => break,
        }
    }

    file.shutdown().await?;
    Ok(())
}
