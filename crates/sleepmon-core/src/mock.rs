//! In-memory stand-ins for the platform capabilities, shared by the tests.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::net::Ipv4Addr;

use embedded_io::{ErrorKind, ErrorType, Read, Write};
use rand_core::{CryptoRng, RngCore};

use crate::network::{
    CaptivePortal, NetworkName, PortalEndpoint, PortalView, ProvisioningSession, RadioError, RelayConnector,
    RelayError, VisibleNetworks, WifiRadio,
};
use crate::storage::{BlockStore, MemoryBlockStore, StorageError};

/// A medium that is never there. Counts every call made against it.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub calls: usize,
}

impl BlockStore for FailingStore {
    fn size(&mut self) -> Result<u32, StorageError> {
        self.calls += 1;
        Err(StorageError::Unavailable)
    }

    fn read_at(&mut self, _offset: u32, _buf: &mut [u8]) -> Result<usize, StorageError> {
        self.calls += 1;
        Err(StorageError::Unavailable)
    }

    fn write_at(&mut self, _offset: u32, _data: &[u8]) -> Result<(), StorageError> {
        self.calls += 1;
        Err(StorageError::Unavailable)
    }
}

/// Memory store that counts reads through a handle shared with the test
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryBlockStore,
    reads: Rc<Cell<usize>>,
}

impl CountingStore {
    pub fn reads(&self) -> Rc<Cell<usize>> {
        self.reads.clone()
    }
}

impl BlockStore for CountingStore {
    fn size(&mut self) -> Result<u32, StorageError> {
        self.inner.size()
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        self.inner.write_at(offset, data)
    }
}

/// Deterministic "entropy": yields 0, 1, 2, ... wrapping at 255.
#[derive(Debug, Default)]
pub struct CountingEntropy {
    next: u8,
}

impl CountingEntropy {
    pub fn starting_at(next: u8) -> Self {
        Self { next }
    }
}

impl RngCore for CountingEntropy {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.next;
            self.next = self.next.wrapping_add(1);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for CountingEntropy {}

/// Radio that accepts exactly one SSID/password pair
#[derive(Debug, Default)]
pub struct MockRadio {
    ssid: Vec<u8>,
    password: Vec<u8>,
    networks: Vec<&'static str>,
    fail_access_point: bool,
    fail_scan: bool,
    joined: bool,
    pub joins: usize,
    pub ap_starts: usize,
    pub ap_stops: usize,
    pub last_hostname: Option<String>,
}

impl MockRadio {
    pub fn accepting(ssid: &[u8], password: &[u8]) -> Self {
        Self {
            ssid: ssid.to_vec(),
            password: password.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_networks(mut self, networks: &[&'static str]) -> Self {
        self.networks = networks.to_vec();
        self
    }

    pub fn failing_access_point(mut self) -> Self {
        self.fail_access_point = true;
        self
    }

    pub fn failing_scan(mut self) -> Self {
        self.fail_scan = true;
        self
    }
}

impl WifiRadio for MockRadio {
    fn join(&mut self, ssid: &[u8], password: &[u8], hostname: &str) -> Result<(), RadioError> {
        self.joins += 1;
        self.last_hostname = Some(hostname.to_string());
        self.joined = ssid == self.ssid.as_slice() && password == self.password.as_slice();

        if self.joined {
            Ok(())
        } else {
            Err(RadioError::AssociationFailed)
        }
    }

    fn scan(&mut self, found: &mut VisibleNetworks) -> Result<(), RadioError> {
        if self.fail_scan {
            return Err(RadioError::ScanFailed);
        }
        for name in &self.networks {
            let mut network = NetworkName::new();
            let _ = network.push_str(name);
            let _ = found.push(network);
        }
        Ok(())
    }

    fn start_access_point(&mut self, _ssid: &str, _address: Ipv4Addr) -> Result<(), RadioError> {
        if self.fail_access_point {
            return Err(RadioError::AccessPointStart);
        }
        self.ap_starts += 1;
        Ok(())
    }

    fn stop_access_point(&mut self) {
        self.ap_stops += 1;
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.joined.then(|| Ipv4Addr::new(10, 0, 0, 42))
    }
}

/// Portal that hands out one queued form submission per poll
#[derive(Debug, Default)]
pub struct MockPortal {
    fail: bool,
    queued: VecDeque<Vec<(String, String)>>,
    pub starts: usize,
    pub endpoint: Option<PortalEndpoint>,
    pub last_pin: String,
}

impl MockPortal {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submit(&mut self, fields: &[(&str, &str)]) {
        let form = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.queued.push_back(form);
    }
}

impl CaptivePortal for MockPortal {
    fn start(&mut self, endpoint: PortalEndpoint) -> Result<(), RadioError> {
        if self.fail {
            return Err(RadioError::PortalStart);
        }
        self.starts += 1;
        self.endpoint = Some(endpoint);
        Ok(())
    }

    fn poll(&mut self, view: &PortalView<'_>, session: &mut ProvisioningSession) {
        self.last_pin = view.pin.to_string();
        if let Some(form) = self.queued.pop_front() {
            session.apply_form(form.iter().map(|(name, value)| (name.as_str(), value.as_str())));
        }
    }
}

/// Relay transport replaying a canned response
#[derive(Debug)]
pub struct MockConnector {
    reachable: bool,
    response: Vec<u8>,
    chunk: usize,
    sent: Rc<RefCell<Vec<u8>>>,
    pub connected_to: Option<String>,
}

impl MockConnector {
    pub fn answering(response: &[u8]) -> Self {
        Self {
            reachable: true,
            response: response.to_vec(),
            chunk: usize::MAX,
            sent: Rc::default(),
            connected_to: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::answering(&[])
        }
    }

    /// Deliver the response at most `chunk` bytes per read.
    pub fn chunked(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Everything written to any connection so far
    pub fn sent(&self) -> Vec<u8> {
        self.sent.borrow().clone()
    }
}

impl RelayConnector for MockConnector {
    type Connection = MockConnection;

    fn connect(&mut self, host: &str, port: u16) -> Result<MockConnection, RelayError> {
        if !self.reachable {
            return Err(RelayError::Connect);
        }
        self.connected_to = Some(format!("{}:{}", host, port));

        Ok(MockConnection {
            response: self.response.clone(),
            position: 0,
            chunk: self.chunk,
            sent: Rc::clone(&self.sent),
        })
    }
}

pub struct MockConnection {
    response: Vec<u8>,
    position: usize,
    chunk: usize,
    sent: Rc<RefCell<Vec<u8>>>,
}

impl ErrorType for MockConnection {
    type Error = ErrorKind;
}

impl Read for MockConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let remaining = &self.response[self.position..];
        let count = remaining.len().min(buf.len()).min(self.chunk);
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}

impl Write for MockConnection {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.sent.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}
