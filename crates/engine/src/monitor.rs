//! Buffer registry, merged read view, and the sliding-window compute pass

use crate::buffer::{Buffer, DeviceRecord};
use crate::config::WindowCell;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Owns the ordered set of per-interface buffers and derives throughput.
///
/// The merged view is a read-through overlay, never a copy held in sync:
/// lookups scan buffers from most-recently-added to least-recently-added and
/// the first match wins, so a device key present in several buffers resolves
/// to the newest buffer's full record.
pub struct Monitor {
    buffers: Mutex<Vec<Arc<Buffer>>>,
    window: Arc<WindowCell>,
}

impl Monitor {
    pub fn new(window: Arc<WindowCell>) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            window,
        }
    }

    /// Shared window cell governing pruning and the compute period
    pub fn window(&self) -> &Arc<WindowCell> {
        &self.window
    }

    /// Create and register a buffer. Called once per interface at startup;
    /// this is the sole mutation of the buffer list. Buffers are never
    /// removed, only cleared.
    pub fn new_buffer(&self) -> Arc<Buffer> {
        let buffer = Arc::new(Buffer::new());
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer.clone());
        buffer
    }

    /// Registered buffers, oldest first. The registry lock is released before
    /// any buffer lock is taken.
    fn buffers(&self) -> Vec<Arc<Buffer>> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merged-view lookup for one device key
    pub fn lookup(&self, key: &str) -> Option<DeviceRecord> {
        for buffer in self.buffers().iter().rev() {
            if let Some(record) = buffer.lock().get(key) {
                return Some(record.clone());
            }
        }
        None
    }

    /// Ordered union of every buffer's devices. On key collision the
    /// most-recently-added buffer's record replaces the older one whole.
    pub fn snapshot(&self) -> BTreeMap<String, DeviceRecord> {
        let mut merged = BTreeMap::new();
        // Oldest first, so later buffers overwrite on collision
        for buffer in self.buffers() {
            for (key, record) in buffer.lock().iter() {
                merged.insert(key.clone(), record.clone());
            }
        }
        merged
    }

    /// Prune stale packets and recompute per-direction throughput, one buffer
    /// lock at a time. This is the only place speed is derived.
    pub fn compute(&self) {
        self.compute_at(epoch_now());
    }

    /// Compute pass against an explicit wall-clock instant, epoch seconds
    pub fn compute_at(&self, now: f64) {
        let window = self.window.get();
        let horizon = now - window;

        for buffer in self.buffers() {
            let mut data = buffer.lock();
            for record in data.values_mut() {
                for communication in record.communications.values_mut() {
                    communication.packets.retain(|p| p.timestamp >= horizon);
                    let total: u64 = communication.packets.iter().map(|p| p.size_bytes).sum();
                    communication.speed_bits_per_sec = (total * 8) as f64;
                }
            }
        }

        trace!(window, "compute pass finished");
    }

    /// Empty every buffer's device map in place; the buffers themselves stay
    /// registered.
    pub fn clear(&self) {
        for buffer in self.buffers() {
            buffer.clear();
        }
    }
}

/// Wall-clock epoch seconds, the time base of the decode stream's timestamps
pub fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PacketEvent;
    use crate::discovery::CaptureInterface;

    fn interface(display: &str) -> CaptureInterface {
        CaptureInterface {
            display: display.to_string(),
            value: display.to_string(),
        }
    }

    fn push(buffer: &Buffer, key: &str, direction: &str, timestamp: f64, size_bytes: u64) {
        buffer.record_packet(
            key,
            "dev",
            "Port 1",
            &interface("test"),
            direction,
            PacketEvent {
                timestamp,
                size_bytes,
            },
        );
    }

    #[test]
    fn test_compute_retains_window_and_derives_speed() {
        let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
        let buffer = monitor.new_buffer();

        push(&buffer, "1.3.0", "out", 0.0, 100);
        push(&buffer, "1.3.0", "out", 0.5, 200);
        push(&buffer, "1.3.0", "out", 0.95, 50);

        monitor.compute_at(1.5);

        let record = monitor.lookup("1.3.0").unwrap();
        let communication = &record.communications["out"];
        // 0.0 fell out of [0.5, 1.5]; 200 + 50 bytes remain
        assert_eq!(communication.packets.len(), 2);
        assert_eq!(communication.speed_bits_per_sec, 2000.0);
    }

    #[test]
    fn test_compute_is_idempotent_at_fixed_now() {
        let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
        let buffer = monitor.new_buffer();

        push(&buffer, "1.3.0", "out", 0.4, 100);
        push(&buffer, "1.3.0", "out", 0.9, 200);

        monitor.compute_at(1.0);
        let first = monitor.lookup("1.3.0").unwrap();

        monitor.compute_at(1.0);
        let second = monitor.lookup("1.3.0").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_pruning_is_monotonic() {
        let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
        let buffer = monitor.new_buffer();

        push(&buffer, "1.3.0", "out", 0.0, 100);
        monitor.compute_at(1.5);
        assert!(
            monitor.lookup("1.3.0").unwrap().communications["out"]
                .packets
                .is_empty()
        );

        // An earlier-looking pass cannot resurrect a pruned packet
        monitor.compute_at(0.5);
        assert!(
            monitor.lookup("1.3.0").unwrap().communications["out"]
                .packets
                .is_empty()
        );
    }

    #[test]
    fn test_merged_view_shadows_newest_first() {
        let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
        let older = monitor.new_buffer();
        let newer = monitor.new_buffer();

        push(&older, "shared", "out", 1.0, 100);
        push(&older, "only-older", "out", 1.0, 10);
        push(&newer, "shared", "in", 1.0, 200);
        push(&newer, "only-newer", "out", 1.0, 20);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.len(), 3);

        // The colliding key resolves to the most-recently-added buffer's
        // record as a whole: no merging of sub-fields
        let shared = monitor.lookup("shared").unwrap();
        assert!(shared.communications.contains_key("in"));
        assert!(!shared.communications.contains_key("out"));
        assert_eq!(snapshot["shared"], shared);
    }

    #[test]
    fn test_clear_keeps_buffers_registered() {
        let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
        let buffer = monitor.new_buffer();

        push(&buffer, "1.3.0", "out", 1.0, 100);
        monitor.clear();
        assert!(monitor.snapshot().is_empty());

        // The cleared buffer still feeds the merged view
        push(&buffer, "1.4.0", "out", 2.0, 50);
        assert!(monitor.lookup("1.4.0").is_some());
    }

    #[test]
    fn test_window_change_applies_to_next_pass() {
        let window = Arc::new(WindowCell::new(1.0));
        let monitor = Monitor::new(window.clone());
        let buffer = monitor.new_buffer();

        push(&buffer, "1.3.0", "out", 0.0, 100);
        window.set(10.0);
        monitor.compute_at(5.0);

        let record = monitor.lookup("1.3.0").unwrap();
        assert_eq!(record.communications["out"].packets.len(), 1);
        assert_eq!(record.communications["out"].speed_bits_per_sec, 800.0);
    }
}
