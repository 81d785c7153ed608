//! Command sink: where the jog core hands machine commands off.
//!
//! Sending is fire-and-forget. The sink only reports failures it can see
//! synchronously (e.g. the transport is gone); acknowledgements and
//! controller errors come back through the machine state source.

use std::sync::Arc;

use jog_common::machine::MachineCommand;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Immediate send failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Receiving side dropped.
    #[error("command sink closed")]
    Closed,

    /// Sink refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Consumer of machine commands.
///
/// Implementations must not block; emission order is the order of calls.
pub trait CommandSink: Send {
    fn send(&mut self, command: MachineCommand) -> Result<(), SinkError>;
}

/// Sink backed by an unbounded channel to the communication layer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MachineCommand>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<MachineCommand>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiver the transport should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MachineCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl CommandSink for ChannelSink {
    fn send(&mut self, command: MachineCommand) -> Result<(), SinkError> {
        self.tx.send(command).map_err(|_| SinkError::Closed)
    }
}

/// Sink that records every command; clones share the log.
///
/// Used by UI echo panels and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    commands: Vec<MachineCommand>,
    reject: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn commands(&self) -> Vec<MachineCommand> {
        self.inner.lock().commands.clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<MachineCommand> {
        std::mem::take(&mut self.inner.lock().commands)
    }

    /// Make subsequent sends fail with `SinkError::Rejected`, the way a
    /// controller refuses commands it cannot queue.
    pub fn set_rejecting(&self, reject: bool) {
        self.inner.lock().reject = reject;
    }
}

impl CommandSink for RecordingSink {
    fn send(&mut self, command: MachineCommand) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if inner.reject {
            return Err(SinkError::Rejected(format!("{} refused", command.kind())));
        }
        inner.commands.push(command);
        Ok(())
    }
}
