//! Integration tests for the aggregation core
//!
//! Exercises the full ingest-to-compute path the way a capture worker drives
//! it: decode lines parsed into records, identities resolved through the
//! enumeration seam, packets published under the buffer lock, throughput
//! derived by compute passes.

use engine::parse::parse_record;
use engine::{
    Buffer, CaptureInterface, DeviceResolver, Monitor, PacketEvent, UsbDeviceInfo, UsbEnumerator,
    WindowCell,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FakeEnumerator {
    devices: Vec<UsbDeviceInfo>,
    snapshots: Arc<AtomicUsize>,
}

impl UsbEnumerator for FakeEnumerator {
    fn snapshot(&self) -> Vec<UsbDeviceInfo> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        self.devices.clone()
    }
}

fn resolver() -> DeviceResolver {
    DeviceResolver::new(Box::new(FakeEnumerator {
        devices: Vec::new(),
        snapshots: Arc::new(AtomicUsize::new(0)),
    }))
}

fn interface(display: &str, value: &str) -> CaptureInterface {
    CaptureInterface {
        display: display.to_string(),
        value: value.to_string(),
    }
}

/// Feed one decode line through parse + resolve + append, as ingestion does
fn ingest_line(buffer: &Buffer, resolver: &DeviceResolver, iface: &CaptureInterface, line: &str) {
    let record = parse_record(line).expect("well-formed line");
    let resolved = resolver.resolve(&record.device);
    buffer.record_packet(
        &record.device,
        &resolved.display_name,
        &resolved.port_label,
        iface,
        &record.direction,
        PacketEvent {
            timestamp: record.timestamp,
            size_bytes: record.size_bytes,
        },
    );
}

#[test]
fn end_to_end_window_scenario() {
    let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
    let buffer = monitor.new_buffer();
    let resolver = resolver();
    let iface = interface("Foo", "1");

    ingest_line(&buffer, &resolver, &iface, "1-2,host\t0.0\t100");
    ingest_line(&buffer, &resolver, &iface, "1-2,host\t0.5\t200");

    monitor.compute_at(1.0);
    let record = monitor.lookup("1-2").expect("device present");
    assert_eq!(record.interface, iface);
    let communication = &record.communications["out"];
    assert_eq!(communication.speed_bits_per_sec, 2400.0);
    assert_eq!(communication.packets.len(), 2);

    // With no new packets, a later pass drains the window entirely
    monitor.compute_at(2.5);
    let record = monitor.lookup("1-2").expect("device still present");
    let communication = &record.communications["out"];
    assert_eq!(communication.speed_bits_per_sec, 0.0);
    assert!(communication.packets.is_empty());
}

#[test]
fn recompute_matches_filtered_subset() {
    let monitor = Monitor::new(Arc::new(WindowCell::new(2.0)));
    let buffer = monitor.new_buffer();
    let iface = interface("Foo", "1");

    let timestamps_and_sizes = [(0.0, 10), (1.0, 20), (2.0, 40), (3.0, 80), (3.9, 160)];
    for (timestamp, size_bytes) in timestamps_and_sizes {
        buffer.record_packet(
            "1.3.0",
            "dev",
            "Port 1",
            &iface,
            "out",
            PacketEvent {
                timestamp,
                size_bytes,
            },
        );
    }

    let now = 4.0;
    monitor.compute_at(now);

    let expected: Vec<_> = timestamps_and_sizes
        .iter()
        .filter(|(timestamp, _)| *timestamp >= now - 2.0)
        .collect();
    let expected_speed: u64 = expected.iter().map(|(_, size)| size * 8).sum();

    let record = monitor.lookup("1.3.0").unwrap();
    let communication = &record.communications["out"];
    assert_eq!(communication.packets.len(), expected.len());
    assert_eq!(communication.speed_bits_per_sec, expected_speed as f64);

    // Same instant, no new events: identical result
    monitor.compute_at(now);
    let again = monitor.lookup("1.3.0").unwrap();
    assert_eq!(again.communications["out"], record.communications["out"]);
}

#[test]
fn pruned_events_never_reappear() {
    let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
    let buffer = monitor.new_buffer();
    let iface = interface("Foo", "1");

    buffer.record_packet(
        "1.3.0",
        "dev",
        "Port 1",
        &iface,
        "out",
        PacketEvent {
            timestamp: 0.0,
            size_bytes: 100,
        },
    );

    monitor.compute_at(2.0);
    for now in [2.5, 3.0, 1.0] {
        monitor.compute_at(now);
        assert!(
            monitor.lookup("1.3.0").unwrap().communications["out"]
                .packets
                .is_empty()
        );
    }
}

#[test]
fn merged_view_unions_and_shadows() {
    let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
    let resolver = resolver();

    let buffers: Vec<_> = (0..3).map(|_| monitor.new_buffer()).collect();
    let interfaces: Vec<_> = (0..3)
        .map(|i| interface(&format!("cap{}", i), &i.to_string()))
        .collect();

    for (i, buffer) in buffers.iter().enumerate() {
        let line = format!("{}-1,host\t1.0\t100", i);
        ingest_line(buffer, &resolver, &interfaces[i], &line);
        ingest_line(buffer, &resolver, &interfaces[i], "9-9,host\t1.0\t100");
    }

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.len(), 4); // three distinct keys plus the collision

    // The colliding key belongs to the most recently created buffer
    assert_eq!(snapshot["9-9"].interface, interfaces[2]);
    assert_eq!(monitor.lookup("9-9").unwrap().interface, interfaces[2]);
}

#[test]
fn resolver_backend_runs_once_per_address_across_buffers() {
    let snapshots = Arc::new(AtomicUsize::new(0));
    let resolver = DeviceResolver::new(Box::new(FakeEnumerator {
        devices: Vec::new(),
        snapshots: snapshots.clone(),
    }));

    let monitor = Monitor::new(Arc::new(WindowCell::new(1.0)));
    let first = monitor.new_buffer();
    let second = monitor.new_buffer();
    let iface = interface("Foo", "1");

    for _ in 0..5 {
        ingest_line(&first, &resolver, &iface, "1.3.0,host\t1.0\t10");
        ingest_line(&second, &resolver, &iface, "host,1.3.0\t1.0\t10");
    }

    assert_eq!(snapshots.load(Ordering::SeqCst), 1);
}
