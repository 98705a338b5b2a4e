//! Capture workers
//!
//! One worker per interface drives the external capture tool into the decode
//! tool and turns the decode stream into packets published to the worker's
//! buffer. Workers block on the stream for the process lifetime; shutdown
//! kills the child processes, which unblocks the read.
//!
//! The pipeline is not restarted when it dies. The worker reports
//! `PipelineExited` and returns, and the operator decides whether to relaunch
//! the process; retrying here would mask a broken capture setup behind stale
//! data.

use crate::buffer::{Buffer, PacketEvent};
use crate::config::CaptureSettings;
use crate::discovery::CaptureInterface;
use crate::events::EngineEvent;
use crate::parse::parse_record;
use crate::resolver::DeviceResolver;
use async_channel::Sender;
use common::{Error, Result, Shutdown};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Child processes of one capture pipeline, kept so shutdown can kill them
pub struct PipelineHandle {
    capture: Child,
    decode: Child,
}

impl PipelineHandle {
    /// Kill both children and reap them. Unblocks the worker's stream read.
    pub fn kill(&mut self) {
        // Capture side first, so the decode side sees EOF instead of writing
        // into a broken pipe
        if let Err(e) = self.capture.kill() {
            debug!("failed to kill capture process: {}", e);
        }
        if let Err(e) = self.decode.kill() {
            debug!("failed to kill decode process: {}", e);
        }
        let _ = self.capture.wait();
        let _ = self.decode.wait();
    }
}

/// Spawn the capture tool piped into the decode tool for one interface.
///
/// The decode tool is configured for line-buffered text output, no name
/// resolution, a display filter restricting to USB traffic, and exactly the
/// three extracted fields the record parser expects.
fn spawn_pipeline(
    settings: &CaptureSettings,
    interface: &CaptureInterface,
) -> Result<(PipelineHandle, ChildStdout)> {
    let mut capture = Command::new(&settings.capture_cmd)
        .arg("-d")
        .arg(&interface.value)
        .args(["-o", "-", "-A"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Capture(format!("failed to spawn {}: {}", settings.capture_cmd, e)))?;

    let raw = capture
        .stdout
        .take()
        .ok_or_else(|| Error::Capture("capture stdout was not piped".to_string()))?;

    let mut decode = match Command::new(&settings.decode_cmd)
        .args(["-i", "-", "-l", "-n", "-Y", "usb", "-T", "fields"])
        .args(["-e", "usb.addr", "-e", "frame.time_epoch", "-e", "usb.data_len"])
        .stdin(Stdio::from(raw))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(decode) => decode,
        Err(e) => {
            let _ = capture.kill();
            let _ = capture.wait();
            return Err(Error::Capture(format!(
                "failed to spawn {}: {}",
                settings.decode_cmd, e
            )));
        }
    };

    let lines = decode
        .stdout
        .take()
        .ok_or_else(|| Error::Capture("decode stdout was not piped".to_string()))?;

    Ok((PipelineHandle { capture, decode }, lines))
}

/// Spawn the dedicated worker thread for one interface
pub fn spawn_capture_worker(
    interface: CaptureInterface,
    settings: CaptureSettings,
    buffer: Arc<Buffer>,
    resolver: Arc<DeviceResolver>,
    events: Sender<EngineEvent>,
    shutdown: Shutdown,
    pipelines: Arc<Mutex<Vec<PipelineHandle>>>,
) -> JoinHandle<()> {
    let name = format!("capture-{}", interface.display);
    std::thread::Builder::new()
        .name(name)
        .spawn(move || {
            run_capture(
                interface, &settings, &buffer, &resolver, &events, &shutdown, &pipelines,
            );
        })
        .expect("Failed to spawn capture worker thread")
}

fn run_capture(
    interface: CaptureInterface,
    settings: &CaptureSettings,
    buffer: &Buffer,
    resolver: &DeviceResolver,
    events: &Sender<EngineEvent>,
    shutdown: &Shutdown,
    pipelines: &Mutex<Vec<PipelineHandle>>,
) {
    let (pipeline, stream) = match spawn_pipeline(settings, &interface) {
        Ok(spawned) => spawned,
        Err(e) => {
            warn!("capture pipeline for {} failed to start: {}", interface.display, e);
            notify(events, EngineEvent::PipelineExited { interface });
            return;
        }
    };

    pipelines
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(pipeline);

    info!("capture worker started for {}", interface.display);
    notify(
        events,
        EngineEvent::WorkerStarted {
            interface: interface.clone(),
        },
    );

    ingest_stream(
        BufReader::new(stream),
        &interface,
        buffer,
        resolver,
        events,
        shutdown,
    );

    if !shutdown.is_triggered() {
        warn!(
            "capture pipeline for {} exited; no further packets from this interface",
            interface.display
        );
    }
    notify(events, EngineEvent::PipelineExited { interface });
}

/// Drain the decode stream into the buffer until EOF or shutdown.
///
/// A line that fails to parse is logged and skipped; ingestion never stops on
/// one bad line. Identity resolution happens before the buffer lock is taken,
/// so the lock is never held across the enumeration boundary.
fn ingest_stream<R: BufRead>(
    reader: R,
    interface: &CaptureInterface,
    buffer: &Buffer,
    resolver: &DeviceResolver,
    events: &Sender<EngineEvent>,
    shutdown: &Shutdown,
) {
    for line in reader.lines() {
        if shutdown.is_triggered() {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("decode stream read error: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let record = match parse_record(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed capture line: {}", e);
                continue;
            }
        };

        let resolved = resolver.resolve(&record.device);
        let first_seen = buffer.record_packet(
            &record.device,
            &resolved.display_name,
            &resolved.port_label,
            interface,
            &record.direction,
            PacketEvent {
                timestamp: record.timestamp,
                size_bytes: record.size_bytes,
            },
        );

        if first_seen {
            notify(
                events,
                EngineEvent::DeviceObserved {
                    key: record.device,
                    name: resolved.display_name,
                    interface: interface.clone(),
                },
            );
        }
    }
}

/// Best-effort event delivery: a slow or absent consumer drops notifications
/// rather than blocking ingestion.
fn notify(events: &Sender<EngineEvent>, event: EngineEvent) {
    if let Err(e) = events.try_send(event) {
        debug!("dropping engine event: {}", e);
    }
}
