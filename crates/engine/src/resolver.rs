//! Device identity resolution
//!
//! Translates the raw bus/device addresses the decode stream reports into a
//! stable physical-port label and display name. Every answer is cached for
//! the process lifetime, so the enumeration backend runs at most once per
//! distinct address. Enumeration goes through a trait seam; production uses
//! libusb via rusb, tests substitute their own listing.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Snapshot of one attached device, as reported by the enumeration backend
#[derive(Debug, Clone)]
pub struct UsbDeviceInfo {
    pub bus_number: u8,
    pub device_address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Port-number chain from the root hub down to the device; empty for a
    /// root hub itself
    pub port_chain: Vec<u8>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// USB enumeration boundary
pub trait UsbEnumerator: Send + Sync {
    /// List all currently attached devices. Expected to be expensive; the
    /// resolver calls it at most once per distinct address.
    fn snapshot(&self) -> Vec<UsbDeviceInfo>;
}

/// Resolved identity for one observed device address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    /// Physical port path label, e.g. "Port 1 > 3"
    pub port_label: String,
    /// Human-readable device name
    pub display_name: String,
}

impl ResolvedDevice {
    /// Placeholder for devices that disappeared before resolution, keyed by
    /// their raw address so distinct devices stay distinguishable.
    fn unknown(address: &str) -> Self {
        Self {
            port_label: format!("Device {} (unknown port)", address),
            display_name: "Unknown device".to_string(),
        }
    }
}

/// Memoizing resolver over the enumeration boundary.
///
/// The cache is append-only and unbounded: the set of addresses observed in
/// one monitoring session is small and the entries are two short strings, so
/// growth is accepted rather than evicted.
pub struct DeviceResolver {
    enumerator: Box<dyn UsbEnumerator>,
    cache: Mutex<HashMap<String, ResolvedDevice>>,
}

impl DeviceResolver {
    pub fn new(enumerator: Box<dyn UsbEnumerator>) -> Self {
        Self {
            enumerator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve an address of the form `bus.device[.endpoint]`.
    ///
    /// The first call per address queries the enumeration backend; every
    /// later call returns the cached answer. The cache lock is held across
    /// the query, which keeps the backend at one query per address even under
    /// concurrent resolution; this is the resolver's own lock, never a buffer
    /// lock.
    pub fn resolve(&self, address: &str) -> ResolvedDevice {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(address) {
            return hit.clone();
        }

        let resolved = self.resolve_uncached(address);
        cache.insert(address.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, address: &str) -> ResolvedDevice {
        let Some((bus, device)) = parse_address(address) else {
            warn!("unparsable device address {:?}", address);
            return ResolvedDevice::unknown(address);
        };

        for info in self.enumerator.snapshot() {
            if info.bus_number == bus && info.device_address == device {
                return ResolvedDevice {
                    port_label: port_label(&info.port_chain),
                    display_name: display_name(&info),
                };
            }
        }

        // Unplugged between capture and resolution
        debug!("device {} not found during enumeration", address);
        ResolvedDevice::unknown(address)
    }
}

/// Extract `(bus, device)` from a `bus.device[.endpoint]` address token
fn parse_address(address: &str) -> Option<(u8, u8)> {
    let mut parts = address.split('.');
    let bus = parts.next()?.parse().ok()?;
    let device = parts.next()?.parse().ok()?;
    Some((bus, device))
}

/// Physical port path label. A root hub has no port number and maps to "0".
fn port_label(chain: &[u8]) -> String {
    if chain.is_empty() {
        return "Port 0".to_string();
    }

    let path: Vec<String> = chain.iter().map(u8::to_string).collect();
    format!("Port {}", path.join(" > "))
}

/// Pretty name from string descriptors, falling back to the numeric IDs when
/// either descriptor is unavailable.
fn display_name(info: &UsbDeviceInfo) -> String {
    match (&info.manufacturer, &info.product) {
        (Some(manufacturer), Some(product)) => {
            format!("[{}] {}", manufacturer.trim(), product.trim())
        }
        _ => format!("Device {:04x}:{:04x}", info.vendor_id, info.product_id),
    }
}

/// Production enumerator over libusb
pub struct RusbEnumerator {
    context: rusb::Context,
}

impl RusbEnumerator {
    pub fn new() -> Result<Self, rusb::Error> {
        Ok(Self {
            context: rusb::Context::new()?,
        })
    }
}

impl UsbEnumerator for RusbEnumerator {
    fn snapshot(&self) -> Vec<UsbDeviceInfo> {
        let devices = match rusb::UsbContext::devices(&self.context) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("USB enumeration failed: {}", e);
                return Vec::new();
            }
        };

        devices
            .iter()
            .filter_map(|device| describe_device(&device))
            .collect()
    }
}

fn describe_device(device: &rusb::Device<rusb::Context>) -> Option<UsbDeviceInfo> {
    let descriptor = device.device_descriptor().ok()?;

    // Descriptor string reads need the device opened; any failure along the
    // way degrades to None and the numeric-ID fallback.
    let strings = device
        .open()
        .ok()
        .map(|handle| read_strings(&descriptor, &handle));
    let (manufacturer, product) = strings.unwrap_or((None, None));

    Some(UsbDeviceInfo {
        bus_number: device.bus_number(),
        device_address: device.address(),
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        port_chain: device.port_numbers().unwrap_or_default(),
        manufacturer,
        product,
    })
}

fn read_strings(
    descriptor: &rusb::DeviceDescriptor,
    handle: &rusb::DeviceHandle<rusb::Context>,
) -> (Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product)
}
