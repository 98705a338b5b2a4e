//! Engine lifecycle events
//!
//! Capture workers run on dedicated blocking threads while the application
//! runs on tokio. Lifecycle notifications cross that boundary over an
//! async-channel pair: the blocking side sends, the async side receives.
//! Events are advisory; senders never block on a full channel.

use crate::discovery::CaptureInterface;
use async_channel::{Receiver, Sender, bounded};

/// Notifications from the engine's worker threads
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A capture worker came up and its pipeline is producing
    WorkerStarted { interface: CaptureInterface },

    /// First packet attributed to this device key on this interface
    DeviceObserved {
        key: String,
        name: String,
        interface: CaptureInterface,
    },

    /// The capture/decode pipeline exited (or never started); the worker
    /// produces nothing further for this interface
    PipelineExited { interface: CaptureInterface },
}

/// Create the event channel between worker threads and the application
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    bounded(256)
}
