//! Shared test utilities for shared port tests.
//!
//! This module provides common test infrastructure including:
//! - Emulated device options with short suspension windows
//! - A local TCP gateway stub that echoes or records traffic
//! - Polling helpers for time-dependent assertions

#![allow(dead_code)]

use shared_comport::port::{EmulatedDevice, PortOptions};
use shared_comport::PortId;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Suspension window used by time-dependent tests.
pub const SHORT_DELAY: Duration = Duration::from_millis(100);

pub fn id(raw: &str) -> PortId {
    PortId::parse(raw).expect("valid identifier")
}

/// Options building transports that share `device`'s state.
pub fn emulated_options(device: &EmulatedDevice) -> PortOptions {
    PortOptions::default()
        .with_emulator(device.factory())
        .with_suspend_delay(SHORT_DELAY)
}

/// Sleep past the end of a suspension window.
pub fn wait_out_suspension() {
    thread::sleep(SHORT_DELAY + Duration::from_millis(30));
}

/// Poll `f` until it returns `Some` or `timeout` elapses.
pub fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = f() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Single-connection TCP peer standing in for a serial-to-Ethernet gateway.
pub struct GatewayStub {
    pub addr: SocketAddr,
    received: mpsc::Receiver<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
}

impl GatewayStub {
    /// Accept one connection and echo everything back.
    pub fn echo() -> Self {
        Self::spawn(|mut stream, tx| {
            let mut buf = [0u8; 256];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let _ = tx.send(buf[..n].to_vec());
                        if stream.write_all(&buf[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Accept one connection, send `greeting` and hang up.
    pub fn send_and_close(greeting: &'static [u8]) -> Self {
        Self::spawn(move |mut stream, _tx| {
            let _ = stream.write_all(greeting);
            thread::sleep(Duration::from_millis(50));
        })
    }

    /// Hang up on the first connection, then echo on the second.
    pub fn hang_up_then_echo() -> Self {
        Self::spawn_on_second(|mut stream, tx| {
            let mut buf = [0u8; 256];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let _ = tx.send(buf[..n].to_vec());
                        if stream.write_all(&buf[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn spawn_on_second(
        handler: impl FnOnce(TcpStream, mpsc::Sender<Vec<u8>>) + Send + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let (tx, received) = mpsc::channel();
        let worker = thread::spawn(move || {
            if let Ok((first, _)) = listener.accept() {
                drop(first);
            }
            if let Ok((stream, _)) = listener.accept() {
                handler(stream, tx);
            }
        });
        Self {
            addr,
            received,
            worker: Some(worker),
        }
    }

    fn spawn(
        handler: impl FnOnce(TcpStream, mpsc::Sender<Vec<u8>>) + Send + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let (tx, received) = mpsc::channel();
        let worker = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                handler(stream, tx);
            }
        });
        Self {
            addr,
            received,
            worker: Some(worker),
        }
    }

    /// Identifier of this stub as a gateway port.
    pub fn port_id(&self) -> PortId {
        id(&format!("127.0.0.1:{}", self.addr.port()))
    }

    /// Bytes the stub has received so far, waiting up to `timeout` for the first chunk.
    pub fn received(&self, timeout: Duration) -> Vec<u8> {
        let mut data = Vec::new();
        if let Ok(chunk) = self.received.recv_timeout(timeout) {
            data.extend(chunk);
        }
        while let Ok(chunk) = self.received.try_recv() {
            data.extend(chunk);
        }
        data
    }

    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
