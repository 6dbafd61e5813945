//! Hardware integration tests.
//!
//! These tests require an actual serial device and are ignored by default.
//! Set `TEST_PORT` (and optionally `TEST_BAUD`, `TEST_LOOPBACK=1`) and run with:
//! cargo test --test hardware_tests -- --ignored

mod common;

use common::{id, wait_for};
use shared_comport::port::device_exists;
use shared_comport::{PortOptions, Registry, SerialSettings};
use std::env;
use std::time::Duration;

/// Test port configuration from environment.
struct TestPortConfig {
    port_name: String,
    baud_rate: u32,
    loopback_enabled: bool,
}

impl TestPortConfig {
    fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9600);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(Self {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }

    fn options(&self) -> PortOptions {
        PortOptions::default().with_serial(SerialSettings {
            baud_rate: self.baud_rate,
            ..SerialSettings::default()
        })
    }
}

macro_rules! require_port {
    () => {
        match TestPortConfig::from_env() {
            Some(config) => config,
            None => {
                eprintln!("TEST_PORT not set, skipping");
                return;
            }
        }
    };
}

#[test]
#[ignore = "requires serial hardware"]
fn test_real_port_opens_and_shares() {
    let config = require_port!();
    assert!(device_exists(&config.port_name), "{} not present", config.port_name);

    let registry = Registry::new();
    let a = registry.acquire(&id(&config.port_name), &config.options());
    let b = registry.acquire(&id(&config.port_name), &config.options());

    assert!(a.ready());
    assert!(a.shares_port_with(&b));
    assert!(a.reset_input_buffer());
    assert!(a.reset_output_buffer());
}

#[test]
#[ignore = "requires serial hardware with TX wired to RX"]
fn test_real_port_loopback() {
    let config = require_port!();
    if !config.loopback_enabled {
        eprintln!("TEST_LOOPBACK not set, skipping");
        return;
    }

    let registry = Registry::new();
    let port = registry.acquire(&id(&config.port_name), &config.options());
    port.reset_input_buffer();
    assert_eq!(port.write(b"loopback\r\n"), 10);

    let mut received = Vec::new();
    wait_for(Duration::from_secs(2), || {
        received.extend(port.read_available(64));
        (received.len() >= 10).then_some(())
    });
    assert_eq!(received, b"loopback\r\n".to_vec());
}
