//! Integration tests for configuration parsing
//!
//! Tests the TOML configuration surface the binary accepts: a minimal
//! document, a fully-specified document, and documents relying on defaults.

mod app_config {

    const MINIMAL_CONFIG: &str = r#"
[monitor]
frequency_secs = 1.0
log_level = "info"
"#;

    const FULL_CONFIG: &str = r#"
[monitor]
frequency_secs = 0.5
log_level = "debug"

[capture]
capture_cmd = "C:/Program Files/USBPcap/USBPcapCMD.exe"
decode_cmd = "C:/Program Files/Wireshark/tshark.exe"
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config: toml::Value = toml::from_str(MINIMAL_CONFIG).unwrap();

        let monitor = config.get("monitor").unwrap();
        assert_eq!(monitor.get("frequency_secs").unwrap().as_float().unwrap(), 1.0);
        assert_eq!(monitor.get("log_level").unwrap().as_str().unwrap(), "info");

        assert!(config.get("capture").is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: toml::Value = toml::from_str(FULL_CONFIG).unwrap();

        let monitor = config.get("monitor").unwrap();
        assert_eq!(monitor.get("frequency_secs").unwrap().as_float().unwrap(), 0.5);
        assert_eq!(monitor.get("log_level").unwrap().as_str().unwrap(), "debug");

        let capture = config.get("capture").unwrap();
        assert!(
            capture
                .get("capture_cmd")
                .unwrap()
                .as_str()
                .unwrap()
                .contains("USBPcapCMD")
        );
        assert!(
            capture
                .get("decode_cmd")
                .unwrap()
                .as_str()
                .unwrap()
                .contains("tshark")
        );
    }

    #[test]
    fn test_empty_document_is_valid_toml() {
        let config: toml::Value = toml::from_str("").unwrap();
        assert!(config.get("monitor").is_none());
    }
}
