//! usbflow capture engine
//!
//! Concurrent capture-ingestion and aggregation for per-port USB bandwidth.
//! One worker per capture interface drives the external capture+decode
//! pipeline into a locked buffer, a periodic pass prunes stale packets and
//! recomputes sliding-window throughput, and the monitor exposes a merged
//! read view across all buffers to renderers.

pub mod buffer;
pub mod config;
pub mod discovery;
mod engine;
pub mod events;
pub mod monitor;
pub mod parse;
pub mod resolver;
pub mod sched;
pub mod source;

pub use buffer::{Buffer, CommunicationRecord, DeviceRecord, PacketEvent};
pub use config::{CaptureSettings, DEFAULT_FREQUENCY_SECS, EngineConfig, WindowCell};
pub use discovery::CaptureInterface;
pub use engine::Engine;
pub use events::EngineEvent;
pub use monitor::Monitor;
pub use resolver::{DeviceResolver, ResolvedDevice, RusbEnumerator, UsbDeviceInfo, UsbEnumerator};
