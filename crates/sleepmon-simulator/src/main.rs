//! Desktop simulator for the sleepmon sensor node.
//!
//! Runs the real provisioning state machine, sensor log and export path from
//! sleepmon-core against host stand-ins: files in a data directory instead of
//! the SD card, a scripted radio and portal, and a loopback relay.
//!
//! # Environment
//!
//! | Variable                 | Effect                                        |
//! |--------------------------|-----------------------------------------------|
//! | `SLEEPMON_DATA_DIR`      | Where `logging.db` and `settings.txt` live     |
//! | `SLEEPMON_SAMPLES`       | Samples to record before exporting (default 30) |
//! | `SLEEPMON_RELAY_OFFLINE` | Set to `1` to make the relay unreachable       |
//! | `RUST_LOG`               | Log filter, e.g. `info` or `sleepmon_core=debug` |
//!
//! Run it twice against the same data directory to see stored credentials
//! and an existing sensor table picked up.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read as _, Seek, SeekFrom, Write as _};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use rand::rngs::OsRng;

use sleepmon_core::config::DeviceConfig;
use sleepmon_core::network::{
    CaptivePortal, NetworkName, PortalEndpoint, PortalView, ProvisioningSession, ProvisioningState, Provisioner,
    RadioError, RelayConnector, RelayError, VisibleNetworks, WifiRadio,
};
use sleepmon_core::sampling::Sampler;
use sleepmon_core::sensors::{EventBuilder, RawReading, SensorError, SensorSource};
use sleepmon_core::storage::{
    BlockStore, LOG_FILE_NAME, QueryStringSink, SETTINGS_FILE_NAME, SensorEvent, SensorLog,
    SettingsStore, StorageError, export_range,
};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Home network the scripted user eventually enters correctly.
const HOME_SSID: &str = "HomeNet";
const HOME_PASSWORD: &str = "correct horse";

/// Portal polls between scripted form submissions, standing in for a user
/// reading the page and typing.
const POLLS_PER_SUBMISSION: u32 = 3;

/// Upper bound on provisioning steps before giving up.
const MAX_PROVISIONING_POLLS: u32 = 200;

const DEFAULT_SAMPLES: u32 = 30;

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// One file in the data directory, standing in for a file on the SD card.
struct FileBlockStore {
    path: PathBuf,
}

impl FileBlockStore {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn io_error(&self, e: io::Error) -> StorageError {
        error!("{}: {:?}", self.path.display(), e);
        StorageError::Io
    }
}

impl BlockStore for FileBlockStore {
    fn size(&mut self) -> Result<u32, StorageError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() as u32),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError> {
        if offset > self.size()? {
            return Err(StorageError::InvalidOffset(offset));
        }

        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        file.seek(SeekFrom::Start(offset as u64))
            .map_err(|e| self.io_error(e))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(filled)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        if offset > self.size()? {
            return Err(StorageError::InvalidOffset(offset));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.seek(SeekFrom::Start(offset as u64))
            .map_err(|e| self.io_error(e))?;
        file.write_all(data).map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))
    }
}

// ---------------------------------------------------------------------------
// Radio, portal and relay stand-ins
// ---------------------------------------------------------------------------

struct SimulatedRadio {
    nearby: Vec<&'static str>,
    joined: bool,
}

impl SimulatedRadio {
    fn new() -> Self {
        Self {
            nearby: vec![HOME_SSID, "Neighbour-5G", "CoffeeShop"],
            joined: false,
        }
    }
}

impl WifiRadio for SimulatedRadio {
    fn join(&mut self, ssid: &[u8], password: &[u8], hostname: &str) -> Result<(), RadioError> {
        info!(
            "[radio] joining {:?} as {}",
            String::from_utf8_lossy(ssid),
            hostname
        );
        self.joined = ssid == HOME_SSID.as_bytes() && password == HOME_PASSWORD.as_bytes();

        if self.joined {
            Ok(())
        } else {
            Err(RadioError::AssociationFailed)
        }
    }

    fn scan(&mut self, found: &mut VisibleNetworks) -> Result<(), RadioError> {
        for name in &self.nearby {
            let mut network = NetworkName::new();
            if network.push_str(name).is_ok() && found.push(network).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn start_access_point(&mut self, ssid: &str, address: Ipv4Addr) -> Result<(), RadioError> {
        info!("[radio] access point {} up at {}", ssid, address);
        Ok(())
    }

    fn stop_access_point(&mut self) {
        info!("[radio] access point down");
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.joined.then_some(Ipv4Addr::new(192, 168, 0, 57))
    }
}

/// Plays a user who first mistypes the password, then gets it right.
struct ScriptedPortal {
    forms: VecDeque<[(&'static str, &'static str); 2]>,
    polls: u32,
    shown: bool,
}

impl ScriptedPortal {
    fn new() -> Self {
        let forms = VecDeque::from([
            [("ssid", HOME_SSID), ("pw", "correct h0rse")],
            [("ssid", HOME_SSID), ("pw", HOME_PASSWORD)],
        ]);

        Self {
            forms,
            polls: 0,
            shown: false,
        }
    }
}

impl CaptivePortal for ScriptedPortal {
    fn start(&mut self, endpoint: PortalEndpoint) -> Result<(), RadioError> {
        info!(
            "[portal] DNS on {}:{}, HTTP on {}:{}",
            endpoint.address, endpoint.dns_port, endpoint.address, endpoint.http_port
        );
        Ok(())
    }

    fn poll(&mut self, view: &PortalView<'_>, session: &mut ProvisioningSession) {
        if !self.shown {
            let names: Vec<&str> = view.networks.iter().map(|n| n.as_str()).collect();
            info!(
                "[portal] GET / on {}: PIN {}, networks {:?}",
                view.access_point_ssid, view.pin, names
            );
            self.shown = true;
        }

        self.polls += 1;
        if self.polls % POLLS_PER_SUBMISSION != 0 {
            return;
        }

        if let Some(form) = self.forms.pop_front() {
            info!("[portal] POST /connect ssid={}", form[0].1);
            session.apply_form(form);
            self.shown = false;
        }
    }
}

struct SimulatedRelay {
    offline: bool,
}

impl RelayConnector for SimulatedRelay {
    type Connection = LoopbackConnection;

    fn connect(&mut self, host: &str, port: u16) -> Result<LoopbackConnection, RelayError> {
        if self.offline {
            warn!("[relay] {}:{} unreachable", host, port);
            return Err(RelayError::Connect);
        }

        Ok(LoopbackConnection {
            request: Vec::new(),
            response: b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}".to_vec(),
            position: 0,
        })
    }
}

/// Relay connection that answers once the request is flushed.
struct LoopbackConnection {
    request: Vec<u8>,
    response: Vec<u8>,
    position: usize,
}

impl embedded_io::ErrorType for LoopbackConnection {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for LoopbackConnection {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.request.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let request = String::from_utf8_lossy(&self.request);
        if let Some(line) = request.lines().next() {
            info!("[relay] {}", line);
        }
        Ok(())
    }
}

impl embedded_io::Read for LoopbackConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.response[self.position..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Mock sensors
// ---------------------------------------------------------------------------

/// Synthetic bedroom: slow temperature and humidity swings, a noisy
/// microphone and a light level following a fake day.
struct MockSensors {
    builder: EventBuilder,
    timestamp: u32,
    interval_secs: u32,
    step: u32,
}

impl MockSensors {
    fn new(start: u32, interval_secs: u32) -> Self {
        Self {
            builder: EventBuilder::new(),
            timestamp: start,
            interval_secs,
            step: 0,
        }
    }
}

impl SensorSource for MockSensors {
    fn read(&mut self) -> Result<SensorEvent, SensorError> {
        let t = self.step as f64;
        self.step += 1;
        self.timestamp += self.interval_secs;

        // Microphone is polled every 100 ms between samples on the device.
        for i in 0..10u32 {
            let wobble = ((t * 10.0 + i as f64) / 3.0).sin();
            self.builder
                .sample_microphone((500.0 + 200.0 * wobble * (t / 7.0).cos()) as u16);
        }

        let raw = RawReading {
            timestamp: self.timestamp,
            celsius: (21.0 + 2.0 * (t / 15.0).sin()) as i16,
            humidity: (45.0 + 8.0 * (t / 11.0).cos()) as i16,
            light_adc: (512.0 + 500.0 * (t / 20.0).sin()) as u16,
        };

        Ok(self.builder.finish(raw))
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1")
}

fn now_epoch() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

fn provision(config: DeviceConfig<'_>, data_dir: &Path) -> Result<ProvisioningState, ExitCode> {
    let settings = SettingsStore::new(FileBlockStore::new(data_dir.join(SETTINGS_FILE_NAME)));
    let relay = SimulatedRelay {
        offline: env_flag("SLEEPMON_RELAY_OFFLINE"),
    };

    let mut provisioner = Provisioner::new(
        config,
        SimulatedRadio::new(),
        ScriptedPortal::new(),
        relay,
        settings,
        OsRng,
    );

    let mut polls = 0;
    let state = provisioner
        .run_until(|_| {
            polls += 1;
            polls < MAX_PROVISIONING_POLLS
        })
        .map_err(|e| {
            error!("Provisioning failed: {}", e);
            ExitCode::FAILURE
        })?;

    match provisioner.registration() {
        Some(Ok(response)) => info!("Relay registration answered {:?}", response.status),
        Some(Err(e)) => warn!("Relay registration failed: {}", e),
        None => {}
    }
    info!(
        "Pair in the app with PIN {}",
        String::from_utf8_lossy(provisioner.settings().pin())
    );

    Ok(state)
}

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting sleepmon simulator");

    let data_dir = std::env::var("SLEEPMON_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("sleepmon-data"));
    if let Err(e) = fs::create_dir_all(&data_dir) {
        error!("Cannot create {}: {}", data_dir.display(), e);
        return ExitCode::FAILURE;
    }
    info!("Data directory: {}", data_dir.display());

    let config = DeviceConfig::default();

    // --- Provisioning ---------------------------------------------------
    match provision(config, &data_dir) {
        Ok(ProvisioningState::Connected) => info!("Network ready"),
        Ok(state) => warn!("Provisioning stopped in {:?}, logging offline", state),
        Err(code) => return code,
    }

    // --- Sampling -------------------------------------------------------
    let samples = std::env::var("SLEEPMON_SAMPLES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SAMPLES);

    let mut log = SensorLog::new(
        FileBlockStore::new(data_dir.join(LOG_FILE_NAME)),
        config.log_config(),
    );
    match log.initialize() {
        Ok(opened) => info!("Sensor log {:?} with {} records", opened, log.count()),
        Err(e) => error!("Sensor log unavailable, samples will be lost: {}", e),
    }

    let start = now_epoch();
    let mut sampler = Sampler::new(MockSensors::new(start, config.sample_interval_secs));
    for _ in 0..samples {
        // Failures are already logged by the sampler.
        let _ = sampler.record(&mut log);
    }
    info!(
        "Recorded {} samples ({} lost), table holds {}",
        samples,
        sampler.lost_events(),
        log.count()
    );

    // --- Export ---------------------------------------------------------
    let end = start.saturating_add(samples.saturating_mul(config.sample_interval_secs));
    let mut sink = QueryStringSink::new(String::new());
    match export_range(&mut log, start, end, 1, &mut sink) {
        Ok(summary) => {
            info!(
                "Exported {} records in {} batches",
                summary.records, summary.batches
            );
            println!("{}", sink.into_inner());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
