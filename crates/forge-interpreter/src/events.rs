//! Run events and notifiers for observability.
//!
//! Events are emitted while a flow runs so consumers can follow progress,
//! collect warnings about broken references, or drive a status display.

use std::sync::{Mutex, PoisonError};

use forge_config::StepAction;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events emitted by the flow interpreter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FlowEvent {
  /// An animated run has started from step 0.
  RunStarted { run_id: String, total_steps: usize },

  /// A step is about to execute.
  StepStarted {
    run_id: String,
    index: usize,
    step_id: String,
    action: StepAction,
  },

  /// A step target did not resolve; the step was a no-op.
  UnresolvedReference {
    run_id: String,
    step_id: String,
    detail: String,
  },

  /// The run reached the end of the flow.
  RunCompleted { run_id: String },

  /// The run was cancelled by a reset before reaching the end.
  RunCancelled { run_id: String },

  /// The instant final render finished.
  FinalRendered,
}

/// Trait for receiving flow events.
///
/// The interpreter calls `notify` for each event; implementations decide
/// what to do with them.
pub trait FlowNotifier: Send + Sync {
  fn notify(&self, event: FlowEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FlowNotifier for NoopNotifier {
  fn notify(&self, _event: FlowEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Event volume is one per step, so an unbounded channel never grows far.
  sender: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<FlowEvent>) -> Self {
    Self { sender }
  }
}

impl FlowNotifier for ChannelNotifier {
  fn notify(&self, event: FlowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// A notifier that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  events: Mutex<Vec<FlowEvent>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<FlowEvent> {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl FlowNotifier for RecordingNotifier {
  fn notify(&self, event: FlowEvent) {
    self
      .events
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(event);
  }
}
