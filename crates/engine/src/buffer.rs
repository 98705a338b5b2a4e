//! Per-interface aggregation buffers
//!
//! Each capture interface owns one Buffer: a device map guarded by a single
//! mutex. The owning capture worker appends under the lock, the periodic
//! compute pass prunes and recomputes under the same lock, and consumers read
//! cloned snapshots. Records are built fully populated before they are
//! published into the map, so a snapshot never carries a half-constructed
//! entry.

use crate::discovery::CaptureInterface;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One observed packet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketEvent {
    /// Capture timestamp, epoch seconds
    pub timestamp: f64,
    /// Payload length in bytes
    pub size_bytes: u64,
}

/// Traffic state for one direction label of one device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunicationRecord {
    /// Packets observed inside the current window, oldest first
    pub packets: Vec<PacketEvent>,
    /// Derived by the compute pass only; stays 0 between creation and the
    /// first pass
    pub speed_bits_per_sec: f64,
}

/// All traffic state for one resolved device within one buffer
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub name: String,
    pub port_label: String,
    pub interface: CaptureInterface,
    /// Direction label (e.g. "in"/"out") to traffic state
    pub communications: HashMap<String, CommunicationRecord>,
}

impl DeviceRecord {
    fn new(name: &str, port_label: &str, interface: &CaptureInterface) -> Self {
        Self {
            name: name.to_string(),
            port_label: port_label.to_string(),
            interface: interface.clone(),
            communications: HashMap::new(),
        }
    }
}

/// Device map for one capture interface, guarded by one lock
#[derive(Debug, Default)]
pub struct Buffer {
    data: Mutex<HashMap<String, DeviceRecord>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the device map. A poisoned lock still holds structurally valid
    /// data, so poisoning is recovered rather than propagated.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, DeviceRecord>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one packet, creating the device and direction entries on first
    /// sight. Returns true when this was the first packet for `key` in this
    /// buffer.
    pub fn record_packet(
        &self,
        key: &str,
        name: &str,
        port_label: &str,
        interface: &CaptureInterface,
        direction: &str,
        event: PacketEvent,
    ) -> bool {
        let mut data = self.lock();
        let first_seen = !data.contains_key(key);

        let record = data
            .entry(key.to_string())
            .or_insert_with(|| DeviceRecord::new(name, port_label, interface));
        record
            .communications
            .entry(direction.to_string())
            .or_default()
            .packets
            .push(event);

        first_seen
    }

    /// Cloned view of the device map
    pub fn snapshot(&self) -> HashMap<String, DeviceRecord> {
        self.lock().clone()
    }

    /// Empty the device map in place
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface() -> CaptureInterface {
        CaptureInterface {
            display: "USBPcap1".to_string(),
            value: "1".to_string(),
        }
    }

    fn event(timestamp: f64, size_bytes: u64) -> PacketEvent {
        PacketEvent {
            timestamp,
            size_bytes,
        }
    }

    #[test]
    fn test_record_packet_creates_entries_once() {
        let buffer = Buffer::new();
        let iface = interface();

        assert!(buffer.record_packet("1.3.0", "Disk", "Port 1", &iface, "out", event(1.0, 100)));
        assert!(!buffer.record_packet("1.3.0", "Disk", "Port 1", &iface, "out", event(1.5, 50)));
        assert!(!buffer.record_packet("1.3.0", "Disk", "Port 1", &iface, "in", event(2.0, 25)));

        let snapshot = buffer.snapshot();
        let record = &snapshot["1.3.0"];
        assert_eq!(record.name, "Disk");
        assert_eq!(record.port_label, "Port 1");
        assert_eq!(record.interface, iface);
        assert_eq!(record.communications["out"].packets.len(), 2);
        assert_eq!(record.communications["in"].packets.len(), 1);
    }

    #[test]
    fn test_new_communication_starts_with_zero_speed() {
        let buffer = Buffer::new();
        buffer.record_packet("1.3.0", "Disk", "Port 1", &interface(), "out", event(1.0, 100));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot["1.3.0"].communications["out"].speed_bits_per_sec, 0.0);
    }

    #[test]
    fn test_clear_empties_in_place() {
        let buffer = Buffer::new();
        buffer.record_packet("1.3.0", "Disk", "Port 1", &interface(), "out", event(1.0, 100));

        buffer.clear();
        assert!(buffer.snapshot().is_empty());
    }
}
