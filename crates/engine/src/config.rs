//! Engine runtime configuration

use std::sync::atomic::{AtomicU64, Ordering};

/// Default sliding-window width and compute period, in seconds
pub const DEFAULT_FREQUENCY_SECS: f64 = 1.0;

/// Smallest window the cell will accept, in seconds
const MIN_FREQUENCY_SECS: f64 = 0.1;

/// Process-shared window width, stored as f64 bits in an atomic cell.
///
/// One value governs both the sliding-window width and the compute period.
/// It is mutable at runtime; readers pick up a new value on their next cycle.
#[derive(Debug)]
pub struct WindowCell(AtomicU64);

impl WindowCell {
    pub fn new(secs: f64) -> Self {
        Self(AtomicU64::new(clamp(secs).to_bits()))
    }

    /// Current window width in seconds
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Change the window width. Values below the floor are clamped so the
    /// compute loop can never spin.
    pub fn set(&self, secs: f64) {
        self.0.store(clamp(secs).to_bits(), Ordering::Relaxed);
    }
}

impl Default for WindowCell {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_SECS)
    }
}

fn clamp(secs: f64) -> f64 {
    // NaN compares false against everything, so it falls to the floor too
    if secs >= MIN_FREQUENCY_SECS {
        secs
    } else {
        MIN_FREQUENCY_SECS
    }
}

/// External tool invocations for the capture+decode pipeline
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Capture tool executable (USBPcapCMD)
    pub capture_cmd: String,
    /// Decode tool executable (tshark)
    pub decode_cmd: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            capture_cmd: "C:/Program Files/USBPcap/USBPcapCMD.exe".to_string(),
            decode_cmd: "C:/Program Files/Wireshark/tshark.exe".to_string(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub capture: CaptureSettings,
    /// Initial window width and compute period, seconds
    pub frequency_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capture: CaptureSettings::default(),
            frequency_secs: DEFAULT_FREQUENCY_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_cell_roundtrip() {
        let cell = WindowCell::new(1.0);
        assert_eq!(cell.get(), 1.0);

        cell.set(2.5);
        assert_eq!(cell.get(), 2.5);
    }

    #[test]
    fn test_window_cell_clamps_low_values() {
        let cell = WindowCell::new(0.0);
        assert_eq!(cell.get(), 0.1);

        cell.set(-3.0);
        assert_eq!(cell.get(), 0.1);

        cell.set(f64::NAN);
        assert_eq!(cell.get(), 0.1);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(WindowCell::default().get(), DEFAULT_FREQUENCY_SECS);
        assert_eq!(
            EngineConfig::default().frequency_secs,
            DEFAULT_FREQUENCY_SECS
        );
    }
}
