//! Engine supervisor
//!
//! Wires discovery, the resolver, the monitor, the capture workers and the
//! compute loop together, and owns their shutdown.

use crate::config::{EngineConfig, WindowCell};
use crate::discovery;
use crate::events::{self, EngineEvent};
use crate::monitor::Monitor;
use crate::resolver::{DeviceResolver, RusbEnumerator, UsbEnumerator};
use crate::sched;
use crate::source::{self, PipelineHandle};
use async_channel::{Receiver, Sender};
use common::{Error, Result, Shutdown};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{error, info};

/// A running monitoring session: one capture worker per discovered interface
/// plus the periodic compute task.
pub struct Engine {
    monitor: Arc<Monitor>,
    events: Receiver<EngineEvent>,
    /// Keeps the event channel open even after every worker has exited, so
    /// consumers see a quiet channel rather than a closed one
    _event_tx: Sender<EngineEvent>,
    shutdown: Shutdown,
    pipelines: Arc<Mutex<Vec<PipelineHandle>>>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Discover capture interfaces and start monitoring them, resolving
    /// device identities through libusb.
    pub fn start(config: EngineConfig) -> Result<Self> {
        let enumerator = RusbEnumerator::new().map_err(|e| Error::Usb(e.to_string()))?;
        Self::start_with_enumerator(config, Box::new(enumerator))
    }

    /// Start monitoring with a caller-supplied enumeration backend
    pub fn start_with_enumerator(
        config: EngineConfig,
        enumerator: Box<dyn UsbEnumerator>,
    ) -> Result<Self> {
        let interfaces = discovery::list_interfaces(&config.capture.capture_cmd)?;
        if interfaces.is_empty() {
            return Err(Error::Capture(
                "no capture interfaces found; is the capture driver installed?".to_string(),
            ));
        }
        info!("monitoring {} capture interface(s)", interfaces.len());

        let window = Arc::new(WindowCell::new(config.frequency_secs));
        let monitor = Arc::new(Monitor::new(window.clone()));
        let resolver = Arc::new(DeviceResolver::new(enumerator));
        let shutdown = Shutdown::new();
        let pipelines = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, event_rx) = events::event_channel();

        let mut workers = Vec::with_capacity(interfaces.len() + 1);
        for interface in interfaces {
            let buffer = monitor.new_buffer();
            workers.push(source::spawn_capture_worker(
                interface,
                config.capture.clone(),
                buffer,
                resolver.clone(),
                event_tx.clone(),
                shutdown.clone(),
                pipelines.clone(),
            ));
        }

        let compute_monitor = monitor.clone();
        workers.push(sched::spawn_fixed_delay(
            "compute",
            window,
            shutdown.clone(),
            move || compute_monitor.compute(),
        ));

        Ok(Self {
            monitor,
            events: event_rx,
            _event_tx: event_tx,
            shutdown,
            pipelines,
            workers,
        })
    }

    /// Aggregated state for renderers
    pub fn monitor(&self) -> Arc<Monitor> {
        self.monitor.clone()
    }

    /// Lifecycle notifications from the worker threads
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events.clone()
    }

    /// Shared window cell; mutations take effect on the next compute cycle
    pub fn window(&self) -> Arc<WindowCell> {
        self.monitor.window().clone()
    }

    /// Stop all workers: trigger the signal, kill the child pipelines to
    /// unblock their readers, then join every thread.
    pub fn shutdown(mut self) {
        self.shutdown.trigger();

        {
            let mut pipelines = self
                .pipelines
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for pipeline in pipelines.iter_mut() {
                pipeline.kill();
            }
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("engine worker thread panicked");
            }
        }

        info!("engine stopped");
    }
}
