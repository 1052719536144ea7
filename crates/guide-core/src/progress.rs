//! Progress channel: ordered (percent, message) events for one request
//!
//! Percentages never decrease and exactly one terminal event is sent.
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Context,
    Persona,
    Fetching,
    Weather,
    Assembling,
    Validating,
    Completed,
    Failed,
}

impl ProgressStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStage::Completed | ProgressStage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub stage: ProgressStage,
    pub message: String,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Pushes progress events, clamping percentages to be monotonic
#[derive(Debug, Default)]
pub struct ProgressReporter {
    sender: Option<ProgressSender>,
    last_percent: AtomicU8,
    finished: AtomicBool,
}

impl ProgressReporter {
    pub fn new(sender: ProgressSender) -> Self {
        Self {
            sender: Some(sender),
            last_percent: AtomicU8::new(0),
            finished: AtomicBool::new(false),
        }
    }

    /// Reporter that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a reporter with its receiving end
    pub fn channel() -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn report(&self, percent: u8, stage: ProgressStage, message: impl Into<String>) {
        if stage.is_terminal() || self.finished.load(Ordering::SeqCst) {
            return;
        }
        // Terminal 100 is reserved for `complete`
        let percent = self.advance(percent.min(99));
        self.send(percent, stage, message.into());
    }

    pub fn complete(&self, message: impl Into<String>) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let percent = self.advance(100);
        self.send(percent, ProgressStage::Completed, message.into());
    }

    /// Terminal failure event; keeps the last percent reached
    pub fn fail(&self, message: impl Into<String>) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let percent = self.last_percent.load(Ordering::SeqCst);
        self.send(percent, ProgressStage::Failed, message.into());
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent.load(Ordering::SeqCst)
    }

    fn advance(&self, percent: u8) -> u8 {
        let previous = self.last_percent.fetch_max(percent, Ordering::SeqCst);
        previous.max(percent)
    }

    fn send(&self, percent: u8, stage: ProgressStage, message: String) {
        if let Some(sender) = &self.sender {
            // Receiver may have hung up; progress is best-effort
            let _ = sender.send(ProgressEvent {
                percent,
                stage,
                message,
            });
        }
    }
}
