//! Capture interface discovery
//!
//! Drives the capture tool's extcap interface-listing mode and parses its
//! brace-delimited output into interface descriptors.

use common::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// A capture-capable channel reported by the capture tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInterface {
    /// Human-readable label
    pub display: String,
    /// Driver-level selector handed back to the capture tool
    pub value: String,
}

/// List the capture interfaces the capture tool currently exposes
pub fn list_interfaces(capture_cmd: &str) -> Result<Vec<CaptureInterface>> {
    let output = Command::new(capture_cmd)
        .arg("--extcap-interfaces")
        .output()
        .map_err(|e| Error::Capture(format!("failed to run {}: {}", capture_cmd, e)))?;

    if !output.status.success() {
        return Err(Error::Capture(format!(
            "{} --extcap-interfaces exited with {}",
            capture_cmd, output.status
        )));
    }

    Ok(parse_interface_listing(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

/// Parse the one-interface-per-line `{key=value}` listing.
///
/// Lines without both a `display` and a `value` pair (version banners, hub
/// control lines) are skipped.
pub fn parse_interface_listing(listing: &str) -> Vec<CaptureInterface> {
    let pair = Regex::new(r"\{(.*?)=(.*?)\}").expect("hard-coded regex");

    listing
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }

            let mut fields: HashMap<String, String> = HashMap::new();
            for capture in pair.captures_iter(line) {
                fields.insert(capture[1].to_string(), capture[2].to_string());
            }

            match (fields.remove("display"), fields.remove("value")) {
                (Some(display), Some(value)) => Some(CaptureInterface { display, value }),
                _ => {
                    debug!("skipping non-interface listing line: {}", line);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typical_listing() {
        let listing = "extcap {version=1.5.4.0}{help=https://desowin.org/usbpcap}\n\
                       interface {value=\\\\.\\USBPcap1}{display=USBPcap1}\n\
                       interface {value=\\\\.\\USBPcap2}{display=USBPcap2}\n";

        let interfaces = parse_interface_listing(listing);
        assert_eq!(
            interfaces,
            vec![
                CaptureInterface {
                    display: "USBPcap1".to_string(),
                    value: "\\\\.\\USBPcap1".to_string(),
                },
                CaptureInterface {
                    display: "USBPcap2".to_string(),
                    value: "\\\\.\\USBPcap2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_incomplete_lines() {
        let listing = "interface {value=1}\n{display=orphan}\n\n";
        assert!(parse_interface_listing(listing).is_empty());
    }

    #[test]
    fn test_parse_ignores_extra_pairs() {
        let listing = "interface {value=1}{display=Foo}{extra=ignored}";
        let interfaces = parse_interface_listing(listing);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].display, "Foo");
        assert_eq!(interfaces[0].value, "1");
    }
}
